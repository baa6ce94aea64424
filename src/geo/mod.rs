//! Geolocation lookups.
//!
//! Queries ipinfo.io first and falls back to ip-api.com. Both provider
//! shapes are normalized into `GeoInfo`. Geolocation is best-effort: when
//! both providers fail the lookup yields `None`.

mod providers;

use crate::config::settings::GeoSettings;
use crate::error::{Error, Result};
pub use providers::{IpApiResponse, IpInfoResponse};
use serde::{Deserialize, Serialize};

/// Normalized geolocation fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GeoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Two-letter country code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Network operator, usually `AS<number> <name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    /// IANA time zone name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl GeoInfo {
    /// Check if no field is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.city.is_none()
            && self.region.is_none()
            && self.country.is_none()
            && self.org.is_none()
            && self.timezone.is_none()
    }
}

/// Two-provider geolocation client.
#[derive(Debug, Clone)]
pub struct GeoClient {
    http: reqwest::Client,
    settings: GeoSettings,
}

impl GeoClient {
    /// Create a client for the configured providers.
    #[must_use]
    pub fn new(http: reqwest::Client, settings: GeoSettings) -> Self {
        Self { http, settings }
    }

    /// Look up `ip`, falling back to the secondary provider on any failure.
    pub async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        match self.lookup_primary(ip).await {
            Ok(info) => return Some(info),
            Err(e) => tracing::warn!("Primary geolocation for {ip} failed: {e}"),
        }

        match self.lookup_secondary(ip).await {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!("Secondary geolocation for {ip} failed: {e}");
                None
            }
        }
    }

    async fn lookup_primary(&self, ip: &str) -> Result<GeoInfo> {
        let url = format!("{}/{ip}/json", self.settings.primary_url.trim_end_matches('/'));
        let mut request = self.http.get(&url);
        if let Some(token) = &self.settings.primary_token {
            request = request.query(&[("token", token)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::network(format!(
                "ipinfo answered HTTP {}",
                response.status()
            )));
        }

        let body: IpInfoResponse = response.json().await?;
        body.into_geo()
    }

    async fn lookup_secondary(&self, ip: &str) -> Result<GeoInfo> {
        let url = format!(
            "{}/json/{ip}",
            self.settings.secondary_url.trim_end_matches('/')
        );

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::network(format!(
                "ip-api answered HTTP {}",
                response.status()
            )));
        }

        let body: IpApiResponse = response.json().await?;
        body.into_geo()
    }
}
