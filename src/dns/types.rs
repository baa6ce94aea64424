//! DNS types and data structures.
//!
//! This module provides the DNS JSON API response shape, the DNSSEC
//! test dimensions (algorithm × condition) and probe results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::proto::rr::RecordType;

use crate::error::{Error, Result};

/// Response from a DNS-over-HTTPS JSON endpoint.
///
/// Field names follow the `application/dns-json` format served by
/// Cloudflare and Google.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DohResponse {
    /// DNS RCODE
    pub status: u16,
    /// Truncated
    #[serde(rename = "TC", default)]
    pub truncated: bool,
    /// Recursion desired
    #[serde(rename = "RD", default)]
    pub recursion_desired: bool,
    /// Recursion available
    #[serde(rename = "RA", default)]
    pub recursion_available: bool,
    /// Authenticated data: the resolver validated the answer
    #[serde(rename = "AD", default)]
    pub authenticated_data: bool,
    /// Checking disabled
    #[serde(rename = "CD", default)]
    pub checking_disabled: bool,
    #[serde(default)]
    pub question: Vec<DohQuestion>,
    #[serde(default)]
    pub answer: Vec<DohAnswer>,
}

impl DohResponse {
    /// Typed view of the status code.
    #[must_use]
    pub fn response_code(&self) -> ResponseCode {
        self.status.into()
    }

    /// Whether the resolver answered NOERROR.
    #[must_use]
    pub fn is_noerror(&self) -> bool {
        self.response_code() == ResponseCode::NoError
    }

    /// Whether the resolver answered SERVFAIL.
    #[must_use]
    pub fn is_servfail(&self) -> bool {
        self.response_code() == ResponseCode::ServFail
    }

    /// Answers of one record type, in response order.
    pub fn answers_of(&self, record_type: RecordType) -> impl Iterator<Item = &DohAnswer> {
        let wanted = u16::from(record_type);
        self.answer.iter().filter(move |a| a.record_type == wanted)
    }
}

/// Question section entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DohQuestion {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
}

/// Answer section entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DohAnswer {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
    #[serde(rename = "TTL", default)]
    pub ttl: u32,
    pub data: String,
}

/// DNSSEC signing algorithm under test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DnssecAlgorithm {
    /// ECDSA P-256 with SHA-256 (algorithm 13)
    Ecdsa256,
    /// ECDSA P-384 with SHA-384 (algorithm 14)
    Ecdsa384,
    /// Ed25519 (algorithm 15)
    Ed25519,
}

impl DnssecAlgorithm {
    /// All algorithms in display order.
    pub const ALL: [Self; 3] = [Self::Ecdsa256, Self::Ecdsa384, Self::Ed25519];

    /// IANA DNSSEC algorithm number.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Ecdsa256 => 13,
            Self::Ecdsa384 => 14,
            Self::Ed25519 => 15,
        }
    }

    /// Wire name used in query parameters.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ecdsa256 => "ecdsa256",
            Self::Ecdsa384 => "ecdsa384",
            Self::Ed25519 => "ed25519",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ecdsa256 => "ECDSA P-256",
            Self::Ecdsa384 => "ECDSA P-384",
            Self::Ed25519 => "Ed25519",
        }
    }
}

impl FromStr for DnssecAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ecdsa256" | "p256" => Ok(Self::Ecdsa256),
            "ecdsa384" | "p384" => Ok(Self::Ecdsa384),
            "ed25519" => Ok(Self::Ed25519),
            _ => Err(Error::invalid_input(format!(
                "Unknown algorithm: {s}. Valid options are: ecdsa256, ecdsa384, ed25519"
            ))),
        }
    }
}

impl fmt::Display for DnssecAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Signature condition a test domain exercises.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DnssecCondition {
    /// Correctly signed; a validating resolver must answer
    Valid,
    /// Bad signature; a validating resolver must SERVFAIL
    Invalid,
    /// Signature past its expiration; a validating resolver must SERVFAIL
    Expired,
    /// Unsigned zone; any resolver must answer
    Missing,
}

impl DnssecCondition {
    /// All conditions in display order.
    pub const ALL: [Self; 4] = [Self::Valid, Self::Invalid, Self::Expired, Self::Missing];

    /// Wire name used in query parameters.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Expired => "expired",
            Self::Missing => "missing",
        }
    }
}

impl FromStr for DnssecCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "valid" => Ok(Self::Valid),
            "invalid" => Ok(Self::Invalid),
            "expired" => Ok(Self::Expired),
            "missing" => Ok(Self::Missing),
            _ => Err(Error::invalid_input(format!(
                "Unknown test: {s}. Valid options are: valid, invalid, expired, missing"
            ))),
        }
    }
}

impl fmt::Display for DnssecCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Every (algorithm, condition) cell in probing order: algorithm-major,
/// condition-minor.
pub fn all_cells() -> impl Iterator<Item = (DnssecAlgorithm, DnssecCondition)> {
    DnssecAlgorithm::ALL
        .into_iter()
        .flat_map(|alg| DnssecCondition::ALL.into_iter().map(move |cond| (alg, cond)))
}

/// Outcome of one DNSSEC probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnssecProbeResult {
    /// Domain that was actually queried
    pub domain: String,
    pub algorithm: DnssecAlgorithm,
    pub condition: DnssecCondition,
    /// Whether the resolver behaved as a validating resolver should
    pub passed: bool,
    /// Failure explanation (validation or network)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DnssecProbeResult {
    /// Create a passing result.
    pub fn pass(
        domain: impl Into<String>,
        algorithm: DnssecAlgorithm,
        condition: DnssecCondition,
    ) -> Self {
        Self {
            domain: domain.into(),
            algorithm,
            condition,
            passed: true,
            error: None,
        }
    }

    /// Create a failed result.
    pub fn failure(
        domain: impl Into<String>,
        algorithm: DnssecAlgorithm,
        condition: DnssecCondition,
        error: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            algorithm,
            condition,
            passed: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregated DNSSEC results.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DnssecSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// True iff at least one cell ran and every cell passed
    pub validates: bool,
}

impl DnssecSummary {
    /// Summarize a set of probe results.
    #[must_use]
    pub fn from_results(results: &[DnssecProbeResult]) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total,
            passed,
            failed: total - passed,
            validates: total > 0 && passed == total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doh_response_parse() {
        let json = r#"{
            "Status": 0, "TC": false, "RD": true, "RA": true, "AD": true, "CD": false,
            "Question": [{"name": "8.8.8.8.in-addr.arpa", "type": 12}],
            "Answer": [{"name": "8.8.8.8.in-addr.arpa", "type": 12, "TTL": 3600, "data": "dns.google."}]
        }"#;
        let response: DohResponse = serde_json::from_str(json).unwrap();
        assert!(response.is_noerror());
        assert!(response.authenticated_data);
        assert_eq!(response.answers_of(RecordType::PTR).count(), 1);
        assert_eq!(response.answers_of(RecordType::A).count(), 0);
    }

    #[test]
    fn test_doh_response_minimal() {
        let response: DohResponse = serde_json::from_str(r#"{"Status": 2}"#).unwrap();
        assert!(response.is_servfail());
        assert!(response.answer.is_empty());
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!(
            "ecdsa256".parse::<DnssecAlgorithm>().unwrap(),
            DnssecAlgorithm::Ecdsa256
        );
        assert_eq!(
            "ED25519".parse::<DnssecAlgorithm>().unwrap(),
            DnssecAlgorithm::Ed25519
        );
        assert!("rsa".parse::<DnssecAlgorithm>().is_err());
        assert_eq!(DnssecAlgorithm::Ecdsa384.number(), 14);
    }

    #[test]
    fn test_condition_parse() {
        assert_eq!(
            "missing".parse::<DnssecCondition>().unwrap(),
            DnssecCondition::Missing
        );
        assert!("broken".parse::<DnssecCondition>().is_err());
        assert_eq!(DnssecCondition::Expired.to_string(), "expired");
    }

    #[test]
    fn test_summary() {
        let a = DnssecAlgorithm::Ecdsa256;
        let results = vec![
            DnssecProbeResult::pass("a", a, DnssecCondition::Valid),
            DnssecProbeResult::failure("b", a, DnssecCondition::Invalid, "x"),
        ];
        let summary = DnssecSummary::from_results(&results);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.validates);

        assert!(!DnssecSummary::from_results(&[]).validates);
        assert!(DnssecSummary::from_results(&results[..1]).validates);
    }
}
