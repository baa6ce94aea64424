//! Typed client for the ipcheck HTTP API.

use super::fingerprint::user_agent;
use crate::dns::{DnssecAlgorithm, DnssecCondition, DnssecProbeResult};
use crate::error::{Error, Result};
use crate::net::IpVersion;
use crate::server::types::{DnssecResponse, ErrorResponse, FingerprintResponse, IpResponse};
use reqwest::header;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Client for a running `ipcheck serve`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    /// Create a client for the service at `base` (e.g. `http://127.0.0.1:8080`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()?;
        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Service base URL.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Caller's address of one family.
    ///
    /// A `success: false` body is returned as-is; only transport failures
    /// and rejected requests are errors.
    pub async fn ip(&self, version: IpVersion) -> Result<IpResponse> {
        let version = u8::from(version).to_string();
        self.get("/api/ip", &[("version", version.as_str())]).await
    }

    /// Metadata for an explicit address.
    pub async fn lookup(&self, ip: &str) -> Result<IpResponse> {
        self.get("/api/ip", &[("ip", ip)]).await
    }

    /// Run one DNSSEC probe on the service.
    pub async fn dnssec(
        &self,
        algorithm: DnssecAlgorithm,
        condition: DnssecCondition,
    ) -> Result<DnssecProbeResult> {
        let response: DnssecResponse = self
            .get(
                "/api/dnssec",
                &[("algorithm", algorithm.as_str()), ("test", condition.as_str())],
            )
            .await?;
        Ok(response.into())
    }

    /// Request headers as the service saw them.
    pub async fn fingerprint(&self) -> Result<FingerprintResponse> {
        self.get("/api/fingerprint", &[]).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{path}", self.base);
        tracing::debug!("GET {url} {query:?}");

        let response = self
            .http
            .get(&url)
            .query(query)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map_or_else(|_| format!("{path} returned {status}"), |e| e.error);
            return Err(if status.is_client_error() {
                Error::invalid_input(message)
            } else {
                Error::network(message)
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
