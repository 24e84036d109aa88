//! Read-side JSON API: link issuing, per-link feeds, filtered event
//! queries, aggregate statistics.

pub mod handlers;
pub mod routes;

pub use routes::create_api_router;
