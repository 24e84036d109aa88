use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::geo::GeoLookup;
use crate::models::AccessEvent;
use crate::notify::Notifier;
use crate::store::EventStore;

/// 1x1 transparent GIF served for tracked-link hits.
const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub struct CaptureState {
    pub store: Arc<dyn EventStore>,
    pub geo: Arc<dyn GeoLookup>,
    pub notifier: Arc<dyn Notifier>,
}

/// Resolve the client IP: first entry of `X-Forwarded-For` when present,
/// else the socket address, else the `"unknown"` sentinel.
pub fn client_ip(headers: &HeaderMap, addr: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("Unknown")
        .to_string()
}

fn referer(headers: &HeaderMap) -> String {
    headers
        .get(header::REFERER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("Direct")
        .to_string()
}

/// Persist and announce a capture. Failures are logged; the caller still
/// answers the originating client.
async fn record(state: &CaptureState, event: AccessEvent) {
    match state.store.append(event).await {
        Ok(stored) => {
            info!(
                ip = %stored.ip,
                city = stored.geo.city.as_deref().unwrap_or("N/A"),
                country = stored.geo.country.as_deref().unwrap_or("N/A"),
                "access captured"
            );
            if !state.notifier.notify(&stored).await {
                warn!(ip = %stored.ip, "notification delivery failed");
            }
        }
        Err(err) => {
            error!(error = %err, "failed to persist access event");
        }
    }
}

/// Tracked-link hit: record an event against the code and answer with an
/// invisible pixel. Unissued codes are rejected without recording.
pub async fn track_link(
    State(state): State<Arc<CaptureState>>,
    Path(code): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match state.store.get_link(&code).await {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "unknown tracking code").into_response(),
        Err(err) => {
            error!(error = %err, "failed to look up tracking code");
            return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
        }
    }

    let ip = client_ip(&headers, Some(addr));
    let geo = state.geo.lookup(&ip).await;
    let event = AccessEvent::for_code(ip, user_agent(&headers), referer(&headers), code, geo);
    record(&state, event).await;

    ([(header::CONTENT_TYPE, "image/gif")], PIXEL_GIF).into_response()
}

/// Catch-all capture: record whatever path was hit and answer
/// 204 No Content, whether or not persistence succeeded.
pub async fn capture_path(
    State(state): State<Arc<CaptureState>>,
    Path(path): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> StatusCode {
    let ip = client_ip(&headers, Some(addr));
    let geo = state.geo.lookup(&ip).await;
    let event = AccessEvent::for_path(ip, user_agent(&headers), referer(&headers), path, geo);
    record(&state, event).await;

    StatusCode::NO_CONTENT
}
