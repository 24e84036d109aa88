//! Read-side queries over the full record set.
//!
//! Every operation re-reads the store and scans it in full; nothing is
//! indexed or cached. That keeps readers trivially consistent with the
//! append-only log at the low volume this service is built for.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;

use crate::models::{AccessEvent, LogStats};
use crate::store::EventStore;

/// Events whose IP matches exactly.
pub fn by_ip(events: &[AccessEvent], ip: &str) -> Vec<AccessEvent> {
    events.iter().filter(|e| e.ip == ip).cloned().collect()
}

/// Events whose city contains the query, case-insensitively.
/// An event without a city never matches.
pub fn by_city(events: &[AccessEvent], query: &str) -> Vec<AccessEvent> {
    let query = query.to_lowercase();
    events
        .iter()
        .filter(|e| {
            e.geo
                .city
                .as_ref()
                .is_some_and(|city| city.to_lowercase().contains(&query))
        })
        .cloned()
        .collect()
}

/// Events whose country contains the query, case-insensitively.
pub fn by_country(events: &[AccessEvent], query: &str) -> Vec<AccessEvent> {
    let query = query.to_lowercase();
    events
        .iter()
        .filter(|e| {
            e.geo
                .country
                .as_ref()
                .is_some_and(|country| country.to_lowercase().contains(&query))
        })
        .cloned()
        .collect()
}

/// The last `n` events in arrival order; all of them when fewer exist.
pub fn last_n(events: &[AccessEvent], n: usize) -> Vec<AccessEvent> {
    let start = events.len().saturating_sub(n);
    events[start..].to_vec()
}

/// Aggregate statistics over the full record set.
///
/// First/last timestamps follow arrival order, not timestamp value.
pub fn stats(events: &[AccessEvent]) -> LogStats {
    let ips: HashSet<&str> = events.iter().map(|e| e.ip.as_str()).collect();
    let cities: HashSet<&str> = events
        .iter()
        .filter_map(|e| e.geo.city.as_deref())
        .collect();
    let countries: HashSet<&str> = events
        .iter()
        .filter_map(|e| e.geo.country.as_deref())
        .collect();

    LogStats {
        total: events.len(),
        unique_ips: ips.len(),
        unique_cities: cities.len(),
        unique_countries: countries.len(),
        first_seen: events.first().and_then(|e| e.timestamp),
        last_seen: events.last().and_then(|e| e.timestamp),
    }
}

/// Query façade over a store: reads the full record set, then delegates
/// to the scan functions above. Read-only and safe to call concurrently
/// with appends; readers see a snapshot.
pub struct QueryEngine {
    store: Arc<dyn EventStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn by_ip(&self, ip: &str) -> Result<Vec<AccessEvent>> {
        Ok(by_ip(&self.store.read_all().await?, ip))
    }

    pub async fn by_city(&self, query: &str) -> Result<Vec<AccessEvent>> {
        Ok(by_city(&self.store.read_all().await?, query))
    }

    pub async fn by_country(&self, query: &str) -> Result<Vec<AccessEvent>> {
        Ok(by_country(&self.store.read_all().await?, query))
    }

    pub async fn last_n(&self, n: usize) -> Result<Vec<AccessEvent>> {
        Ok(last_n(&self.store.read_all().await?, n))
    }

    pub async fn stats(&self) -> Result<LogStats> {
        Ok(stats(&self.store.read_all().await?))
    }
}
