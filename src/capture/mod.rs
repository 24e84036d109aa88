//! Event ingestion endpoints: tracked-link pixel hits and catch-all
//! path captures. Persistence failures never fail the client response.

pub mod handlers;
pub mod routes;

pub use routes::create_capture_router;
