//! Runtime settings.
//!
//! Every upstream endpoint the service talks to is configurable so that
//! deployments can swap providers and tests can point at local mocks.

use crate::dns::TestCatalog;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default address the HTTP service binds to.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Default base URL the client uses to reach the service.
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct Settings {
    /// Socket address for `ipcheck serve`
    pub listen: String,
    /// Service base URL for `ipcheck check`
    pub server: String,
    /// Geolocation providers
    pub geo: GeoSettings,
    /// DNS-over-HTTPS endpoints
    pub doh: DohSettings,
    /// Public IP echo services
    pub echo: EchoSettings,
    /// STUN servers used for candidate gathering (`host:port`)
    pub stun_servers: Vec<String>,
    /// Self-hosted DNSSEC test zone; the public test domains are used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dnssec_test_zone: Option<String>,
    /// Upstream request timeout in seconds
    pub timeout_secs: u64,
    /// Candidate gathering ceiling in seconds
    pub ice_timeout_secs: u64,
}

/// Geolocation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeoSettings {
    /// ipinfo.io-compatible base URL
    pub primary_url: String,
    /// Optional ipinfo.io access token
    pub primary_token: Option<String>,
    /// ip-api.com-compatible base URL
    pub secondary_url: String,
}

/// DNS-over-HTTPS settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DohSettings {
    /// JSON API endpoint used for PTR lookups
    pub ptr_url: String,
    /// JSON API endpoint used for DNSSEC probes (must validate)
    pub dnssec_url: String,
}

/// IP echo service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EchoSettings {
    /// Reachable only over IPv4
    pub ipv4_url: String,
    /// Reachable only over IPv6
    pub ipv6_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            server: DEFAULT_SERVER.to_string(),
            geo: GeoSettings::default(),
            doh: DohSettings::default(),
            echo: EchoSettings::default(),
            stun_servers: vec![
                "stun.l.google.com:19302".to_string(),
                "stun.cloudflare.com:3478".to_string(),
            ],
            dnssec_test_zone: None,
            timeout_secs: 10,
            ice_timeout_secs: 5,
        }
    }
}

impl Default for GeoSettings {
    fn default() -> Self {
        Self {
            primary_url: "https://ipinfo.io".to_string(),
            primary_token: None,
            secondary_url: "http://ip-api.com".to_string(),
        }
    }
}

impl Default for DohSettings {
    fn default() -> Self {
        Self {
            ptr_url: "https://cloudflare-dns.com/dns-query".to_string(),
            dnssec_url: "https://cloudflare-dns.com/dns-query".to_string(),
        }
    }
}

impl Default for EchoSettings {
    fn default() -> Self {
        Self {
            ipv4_url: "https://api.ipify.org".to_string(),
            ipv6_url: "https://api6.ipify.org".to_string(),
        }
    }
}

impl Settings {
    /// Upstream request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Candidate gathering ceiling.
    #[must_use]
    pub fn ice_timeout(&self) -> Duration {
        Duration::from_secs(self.ice_timeout_secs.max(1))
    }

    /// DNSSEC test catalog for these settings.
    #[must_use]
    pub fn dnssec_catalog(&self) -> TestCatalog {
        self.dnssec_test_zone
            .as_deref()
            .filter(|zone| !zone.trim_matches('.').is_empty())
            .map_or_else(TestCatalog::well_known, TestCatalog::for_zone)
    }

    /// Build the shared HTTP client for upstream providers.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn http_client(&self) -> crate::error::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout())
            .user_agent(concat!("ipcheck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.listen, DEFAULT_LISTEN);
        assert_eq!(settings.ice_timeout(), Duration::from_secs(5));
        assert_eq!(settings.geo.primary_url, "https://ipinfo.io");
        assert!(settings.geo.primary_token.is_none());
        assert!(settings.dnssec_test_zone.is_none());
    }

    #[test]
    fn test_dnssec_catalog_selection() {
        use crate::dns::{DnssecAlgorithm, DnssecCondition};
        let primary = |settings: &Settings| {
            settings
                .dnssec_catalog()
                .entry(DnssecAlgorithm::Ed25519, DnssecCondition::Missing)
                .map(|e| e.primary.clone())
        };

        assert_eq!(
            primary(&Settings::default()).as_deref(),
            Some("unsigned.extended-dns-errors.com")
        );

        let zoned = Settings {
            dnssec_test_zone: Some("zone.test".to_string()),
            ..Settings::default()
        };
        assert_eq!(primary(&zoned).as_deref(), Some("missing.alg15.zone.test"));

        let blank = Settings {
            dnssec_test_zone: Some(".".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            primary(&blank).as_deref(),
            Some("unsigned.extended-dns-errors.com")
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{"listen": "0.0.0.0:9000", "doh": {"ptr_url": "http://localhost/dns"}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.listen, "0.0.0.0:9000");
        assert_eq!(settings.doh.ptr_url, "http://localhost/dns");
        assert_eq!(
            settings.doh.dnssec_url,
            "https://cloudflare-dns.com/dns-query"
        );
        assert_eq!(settings.timeout_secs, 10);
    }

    #[test]
    fn test_zero_timeouts_are_clamped() {
        let settings = Settings {
            timeout_secs: 0,
            ice_timeout_secs: 0,
            ..Settings::default()
        };
        assert_eq!(settings.timeout(), Duration::from_secs(1));
        assert_eq!(settings.ice_timeout(), Duration::from_secs(1));
    }
}
