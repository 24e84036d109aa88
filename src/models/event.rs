use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geolocation metadata attached to an access event.
///
/// All fields come from a single lookup or the whole struct is empty;
/// fields from different lookups are never mixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub org: Option<String>,
    pub postal: Option<String>,
}

impl GeoInfo {
    pub fn is_empty(&self) -> bool {
        *self == GeoInfo::default()
    }
}

/// One captured access record.
///
/// `timestamp` is stamped by the store at append time when absent and is
/// immutable afterwards. `ip` carries the `"unknown"` sentinel when the
/// client address could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub ip: String,
    #[serde(default = "unknown_agent")]
    pub ua: String,
    #[serde(default = "direct_referer")]
    pub referer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(flatten)]
    pub geo: GeoInfo,
}

fn unknown_agent() -> String {
    "Unknown".to_string()
}

fn direct_referer() -> String {
    "Direct".to_string()
}

impl AccessEvent {
    /// Build an event for an arbitrary captured path.
    pub fn for_path(ip: String, ua: String, referer: String, path: String, geo: GeoInfo) -> Self {
        Self {
            timestamp: None,
            ip,
            ua,
            referer,
            path: Some(path),
            code: None,
            geo,
        }
    }

    /// Build an event scoped to an issued tracking link.
    pub fn for_code(ip: String, ua: String, referer: String, code: String, geo: GeoInfo) -> Self {
        Self {
            timestamp: None,
            ip,
            ua,
            referer,
            path: None,
            code: Some(code),
            geo,
        }
    }
}

/// An issued tracking link. Events reference it through `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingLink {
    pub code: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate view over the full record set, recomputed on every query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStats {
    pub total: usize,
    pub unique_ips: usize,
    pub unique_cities: usize,
    pub unique_countries: usize,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}
