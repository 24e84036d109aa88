use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::links;
use crate::models::{AccessEvent, LogStats, TrackingLink};
use crate::query::QueryEngine;
use crate::store::{EventStore, StoreError};

pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub queries: QueryEngine,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct CreateLinkRequest {
    pub label: String,
}

#[derive(Serialize)]
pub struct LinkFeedResponse {
    pub code: String,
    pub total: usize,
    pub events: Vec<AccessEvent>,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub ip: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

const MAX_LIMIT: usize = 100;

/// Issue a new tracking link
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<TrackingLink>), (StatusCode, Json<ErrorResponse>)> {
    if payload.label.is_empty() || payload.label.len() > 50 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Label must be 1-50 characters".to_string(),
            }),
        ));
    }

    match links::issue(state.store.as_ref(), &payload.label).await {
        Ok(link) => Ok((StatusCode::CREATED, Json(link))),
        Err(StoreError::CodeSpaceExhausted) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to generate unique short code".to_string(),
            }),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to create link: {}", e),
            }),
        )),
    }
}

/// List issued links, newest first
pub async fn list_links(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TrackingLink>>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.list_links().await {
        Ok(links) => Ok(Json(links)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to list links: {}", e),
            }),
        )),
    }
}

/// The event feed captured against one issued code
pub async fn link_events(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<LinkFeedResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.get_link(&code).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Link not found".to_string(),
                }),
            ))
        }
        Err(e) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to get link: {}", e),
                }),
            ))
        }
    }

    match state.store.events_for_code(&code).await {
        Ok(events) => Ok(Json(LinkFeedResponse {
            code,
            total: events.len(),
            events,
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to read events: {}", e),
            }),
        )),
    }
}

/// Filtered event queries: by IP, city or country (first match wins),
/// otherwise the most recent events. `limit` caps every variant.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<Vec<AccessEvent>>, (StatusCode, Json<ErrorResponse>)> {
    let limit = params.limit.min(MAX_LIMIT);

    let result = if let Some(ip) = params.ip.as_deref() {
        state.queries.by_ip(ip).await
    } else if let Some(city) = params.city.as_deref() {
        state.queries.by_city(city).await
    } else if let Some(country) = params.country.as_deref() {
        state.queries.by_country(country).await
    } else {
        state.queries.last_n(limit).await
    };

    match result {
        Ok(events) => Ok(Json(crate::query::last_n(&events, limit))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to query events: {}", e),
            }),
        )),
    }
}

/// Aggregate statistics over the full record set
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LogStats>, (StatusCode, Json<ErrorResponse>)> {
    match state.queries.stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to compute statistics: {}", e),
            }),
        )),
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
