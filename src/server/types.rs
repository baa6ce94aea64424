//! JSON bodies of the HTTP API.
//!
//! Shared by the handlers and by the client, which deserializes them.

use crate::dns::{DnssecAlgorithm, DnssecCondition, DnssecProbeResult};
use crate::geo::GeoInfo;
use crate::lookup::AddressRecord;
use crate::net::IpVersion;
use serde::{Deserialize, Serialize};

/// `GET /api/ip` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<IpVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(flatten)]
    pub geo: GeoInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IpResponse {
    /// Successful lookup.
    #[must_use]
    pub fn found(record: AddressRecord) -> Self {
        Self {
            success: true,
            ip: Some(record.ip),
            version: Some(record.version),
            hostname: record.hostname,
            geo: record.geo,
            error: None,
        }
    }

    /// Lookup that produced no address.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            ip: None,
            version: None,
            hostname: None,
            geo: GeoInfo::default(),
            error: Some(error.into()),
        }
    }

    /// The address record, if the lookup succeeded.
    #[must_use]
    pub fn into_record(self) -> Option<AddressRecord> {
        if !self.success {
            return None;
        }
        let ip = self.ip?;
        let version = self.version.or_else(|| {
            ip.parse::<std::net::IpAddr>()
                .ok()
                .map(|addr| IpVersion::of(&addr))
        })?;
        Some(AddressRecord {
            ip,
            version,
            hostname: self.hostname,
            geo: self.geo,
        })
    }
}

/// `GET /api/dnssec` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DnssecResponse {
    pub success: bool,
    pub domain: String,
    pub algorithm: DnssecAlgorithm,
    pub test_type: DnssecCondition,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<DnssecProbeResult> for DnssecResponse {
    fn from(r: DnssecProbeResult) -> Self {
        Self {
            success: true,
            domain: r.domain,
            algorithm: r.algorithm,
            test_type: r.condition,
            passed: r.passed,
            error: r.error,
        }
    }
}

impl From<DnssecResponse> for DnssecProbeResult {
    fn from(r: DnssecResponse) -> Self {
        Self {
            domain: r.domain,
            algorithm: r.algorithm,
            condition: r.test_type,
            passed: r.passed,
            error: r.error,
        }
    }
}

/// Error body for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// `GET /api/fingerprint` body: what the request headers reveal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_not_track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sec_ch_ua: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sec_ch_ua_platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sec_ch_ua_mobile: Option<String>,
}

/// `GET /api/health` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
