use axum::{routing::get, Router};
use std::sync::Arc;

use crate::geo::GeoLookup;
use crate::notify::Notifier;
use crate::store::EventStore;

use super::handlers::{capture_path, track_link, CaptureState};

pub fn create_capture_router(
    store: Arc<dyn EventStore>,
    geo: Arc<dyn GeoLookup>,
    notifier: Arc<dyn Notifier>,
) -> Router {
    let state = Arc::new(CaptureState {
        store,
        geo,
        notifier,
    });

    Router::new()
        .route("/t/{code}", get(track_link))
        .route("/p/{*path}", get(capture_path))
        .with_state(state)
}
