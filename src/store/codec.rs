//! Event record encodings.
//!
//! Three encodings share one field set:
//! - the line encoding: one JSON object per line, appended incrementally;
//! - the document encoding: the whole record set as a single JSON array,
//!   rewritten on every append;
//! - the relational row, with geolocation embedded as a JSON blob column.
//!
//! Decoding is tolerant: a malformed line or geo blob is logged and
//! skipped without failing the surrounding read.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::{AccessEvent, GeoInfo};

/// Encode one event as a single log line (no trailing newline).
pub fn encode_line(event: &AccessEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

/// Decode one log line.
pub fn decode_line(line: &str) -> serde_json::Result<AccessEvent> {
    serde_json::from_str(line.trim())
}

/// Decode a full line-encoded log.
///
/// Malformed lines are logged and skipped; one corrupt record never
/// discards the rest of the log.
pub fn decode_line_log(content: &str) -> Vec<AccessEvent> {
    let mut events = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match decode_line(line) {
            Ok(event) => events.push(event),
            Err(err) => {
                let preview: String = line.chars().take(50).collect();
                warn!(error = %err, line = %preview, "skipping malformed log line");
            }
        }
    }
    events
}

/// Encode the full record set as one JSON array document.
pub fn encode_document(events: &[AccessEvent]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(events)
}

/// Decode a JSON array document.
pub fn decode_document(content: &str) -> serde_json::Result<Vec<AccessEvent>> {
    serde_json::from_str(content)
}

/// One event as stored in the relational `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub code: Option<String>,
    pub ip: String,
    pub ua: String,
    pub referer: String,
    pub path: Option<String>,
    pub geo: Option<String>,
    pub ts: String,
}

impl EventRow {
    /// Convert a row back into an event.
    ///
    /// An unparseable geo blob degrades to empty geolocation rather than
    /// failing the row; an unparseable timestamp is dropped the same way.
    pub fn into_event(self) -> AccessEvent {
        let geo = match self.geo.as_deref() {
            None | Some("") => GeoInfo::default(),
            Some(blob) => serde_json::from_str(blob).unwrap_or_else(|err| {
                warn!(id = self.id, error = %err, "unreadable geo blob, treating as empty");
                GeoInfo::default()
            }),
        };

        let timestamp = match DateTime::parse_from_rfc3339(&self.ts) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(err) => {
                warn!(id = self.id, error = %err, "unreadable timestamp on stored event");
                None
            }
        };

        AccessEvent {
            timestamp,
            ip: self.ip,
            ua: self.ua,
            referer: self.referer,
            path: self.path,
            code: self.code,
            geo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event() -> AccessEvent {
        AccessEvent {
            timestamp: Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap()),
            ip: "203.0.113.9".to_string(),
            ua: "curl/8.0".to_string(),
            referer: "Direct".to_string(),
            path: Some("promo/summer".to_string()),
            code: None,
            geo: GeoInfo {
                city: Some("São Paulo".to_string()),
                region: Some("São Paulo".to_string()),
                country: Some("Brazil".to_string()),
                lat: Some(-23.55),
                lon: Some(-46.63),
                org: Some("Example Telecom".to_string()),
                postal: Some("01000".to_string()),
            },
        }
    }

    #[test]
    fn line_round_trip() {
        let event = sample_event();
        let line = encode_line(&event).unwrap();
        assert_eq!(decode_line(&line).unwrap(), event);
    }

    #[test]
    fn line_round_trip_empty_geo() {
        let event = AccessEvent {
            timestamp: Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()),
            ip: "unknown".to_string(),
            ua: "Unknown".to_string(),
            referer: "Direct".to_string(),
            path: None,
            code: Some("aB3xQ9".to_string()),
            geo: GeoInfo::default(),
        };
        let line = encode_line(&event).unwrap();
        assert_eq!(decode_line(&line).unwrap(), event);
    }

    #[test]
    fn corrupt_line_is_skipped_not_fatal() {
        let good = encode_line(&sample_event()).unwrap();
        let log = format!("{good}\nnot json at all\n{good}\n");
        let events = decode_line_log(&log);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let good = encode_line(&sample_event()).unwrap();
        let log = format!("\n{good}\n\n");
        assert_eq!(decode_line_log(&log).len(), 1);
    }

    #[test]
    fn document_round_trip() {
        let events = vec![sample_event(), sample_event()];
        let doc = encode_document(&events).unwrap();
        assert_eq!(decode_document(&doc).unwrap(), events);
    }

    #[test]
    fn empty_document_round_trip() {
        let doc = encode_document(&[]).unwrap();
        assert!(decode_document(&doc).unwrap().is_empty());
    }

    #[test]
    fn row_with_bad_geo_blob_degrades_to_empty() {
        let row = EventRow {
            id: 7,
            code: Some("aB3xQ9".to_string()),
            ip: "203.0.113.9".to_string(),
            ua: "curl/8.0".to_string(),
            referer: "Direct".to_string(),
            path: None,
            geo: Some("{broken".to_string()),
            ts: "2025-06-01T12:30:00+00:00".to_string(),
        };
        let event = row.into_event();
        assert!(event.geo.is_empty());
        assert_eq!(event.ip, "203.0.113.9");
        assert!(event.timestamp.is_some());
    }

    #[test]
    fn row_round_trips_geo_blob() {
        let source = sample_event();
        let row = EventRow {
            id: 1,
            code: None,
            ip: source.ip.clone(),
            ua: source.ua.clone(),
            referer: source.referer.clone(),
            path: source.path.clone(),
            geo: Some(serde_json::to_string(&source.geo).unwrap()),
            ts: source.timestamp.unwrap().to_rfc3339(),
        };
        assert_eq!(row.into_event(), source);
    }
}
