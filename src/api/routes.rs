use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::query::QueryEngine;
use crate::store::EventStore;

use super::handlers::{
    create_link, get_stats, health_check, link_events, list_events, list_links, AppState,
};

pub fn create_api_router(store: Arc<dyn EventStore>) -> Router {
    let state = Arc::new(AppState {
        queries: QueryEngine::new(Arc::clone(&store)),
        store,
    });

    Router::new()
        .route("/health", get(health_check))
        .route("/api/links", post(create_link).get(list_links))
        .route("/api/links/{code}/events", get(link_events))
        .route("/api/events", get(list_events))
        .route("/api/stats", get(get_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
