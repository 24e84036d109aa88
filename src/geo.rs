//! IP geolocation lookup.
//!
//! Lookup happens at the ingestion boundary and the result rides along on
//! the event; the store itself never blocks on network I/O. Any failure —
//! transport, timeout, non-success status, unreadable body — degrades to
//! an empty result instead of failing the capture.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::models::GeoInfo;

const LOOKUP_FIELDS: &str = "status,message,country,regionName,city,zip,lat,lon,org,query";

#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Resolve an IP to geolocation metadata, empty on any failure.
    async fn lookup(&self, ip: &str) -> GeoInfo;
}

/// Lookup disabled; every IP resolves to an empty result.
pub struct NoopGeoLookup;

#[async_trait]
impl GeoLookup for NoopGeoLookup {
    async fn lookup(&self, _ip: &str) -> GeoInfo {
        GeoInfo::default()
    }
}

/// Client for the ip-api.com JSON endpoint.
pub struct IpApiClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    city: Option<String>,
    zip: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    org: Option<String>,
}

impl IpApiResponse {
    fn into_geo(self) -> GeoInfo {
        GeoInfo {
            city: self.city,
            region: self.region_name,
            country: self.country,
            lat: self.lat,
            lon: self.lon,
            org: self.org,
            postal: self.zip,
        }
    }
}

impl IpApiClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeoLookup for IpApiClient {
    async fn lookup(&self, ip: &str) -> GeoInfo {
        let url = format!("{}/{}", self.endpoint, ip);
        let response = self
            .client
            .get(&url)
            .query(&[("fields", LOOKUP_FIELDS)])
            .send()
            .await;

        let parsed: IpApiResponse = match response {
            Ok(resp) => match resp.json().await {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(ip, error = %err, "geolocation response unreadable");
                    return GeoInfo::default();
                }
            },
            Err(err) => {
                warn!(ip, error = %err, "geolocation request failed");
                return GeoInfo::default();
            }
        };

        if parsed.status != "success" {
            warn!(
                ip,
                message = parsed.message.as_deref().unwrap_or("unknown"),
                "geolocation lookup did not succeed"
            );
            return GeoInfo::default();
        }

        parsed.into_geo()
    }
}
