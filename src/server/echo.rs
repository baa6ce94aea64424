//! Public IP echo services.
//!
//! Each configured URL is reachable over a single address family, so a
//! successful answer doubles as proof of connectivity for that family.

use crate::config::settings::EchoSettings;
use crate::error::{Error, Result};
use crate::net::IpVersion;
use serde::Deserialize;
use std::net::IpAddr;

#[derive(Debug, Deserialize)]
struct EchoResponse {
    ip: String,
}

/// IP echo client.
#[derive(Debug, Clone)]
pub struct EchoClient {
    http: reqwest::Client,
    settings: EchoSettings,
}

impl EchoClient {
    #[must_use]
    pub fn new(http: reqwest::Client, settings: EchoSettings) -> Self {
        Self { http, settings }
    }

    /// Ask the echo service for our public address of one family.
    ///
    /// # Errors
    ///
    /// Returns a network error when the service is unreachable, answers
    /// with something that is not an address, or answers with the other
    /// family.
    pub async fn public_ip(&self, version: IpVersion) -> Result<IpAddr> {
        let url = match version {
            IpVersion::V4 => &self.settings.ipv4_url,
            IpVersion::V6 => &self.settings.ipv6_url,
        };

        let response = self
            .http
            .get(url)
            .query(&[("format", "json")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::network(format!(
                "{url} answered HTTP {}",
                response.status()
            )));
        }

        let body: EchoResponse = response.json().await?;
        let ip: IpAddr = body
            .ip
            .trim()
            .parse()
            .map_err(|_| Error::network(format!("{url} returned '{}'", body.ip)))?;

        if !version.matches(&ip) {
            return Err(Error::network(format!(
                "{url} returned {} address {ip}",
                IpVersion::of(&ip)
            )));
        }

        tracing::debug!("Echo service reports {version} address {ip}");
        Ok(ip)
    }
}
