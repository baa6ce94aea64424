//! Progressive results of one check run.
//!
//! Tasks report through [`Update`] messages; [`ResultsState::apply`] is the
//! only way state changes, so every view renders from the same snapshot.

use super::fingerprint::Fingerprint;
use super::ice::CandidateReport;
use crate::dns::{all_cells, DnssecAlgorithm, DnssecCondition, DnssecProbeResult, DnssecSummary};
use crate::lookup::AddressRecord;
use crate::net::IpVersion;
use crate::server::types::FingerprintResponse;
use serde::Serialize;
use std::net::IpAddr;

/// Placeholder for a slot whose task has not answered yet.
pub const MSG_PENDING: &str = "Pending…";

/// Placeholder when no ICE candidates could be gathered.
pub const MSG_WEBRTC_UNSUPPORTED: &str = "WebRTC not supported";

/// Independent tasks of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Ip,
    WebRtc,
    Dnssec,
}

impl Task {
    pub const ALL: [Self; 3] = [Self::Ip, Self::WebRtc, Self::Dnssec];
}

/// One observable cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum Slot<T> {
    Pending,
    Ready(T),
    /// Explanatory placeholder text
    Failed(String),
}

impl<T> Slot<T> {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Text to show instead of a value.
    #[must_use]
    pub fn placeholder(&self) -> Option<&str> {
        match self {
            Self::Pending => Some(MSG_PENDING),
            Self::Ready(_) => None,
            Self::Failed(msg) => Some(msg.as_str()),
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Pending
    }
}

/// One DNSSEC table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnssecCell {
    pub algorithm: DnssecAlgorithm,
    pub condition: DnssecCondition,
    pub result: Slot<DnssecProbeResult>,
}

/// A task's report.
#[derive(Debug, Clone)]
pub enum Update {
    /// Server-side detection for one family
    Address {
        version: IpVersion,
        result: Result<AddressRecord, String>,
    },
    /// ICE gathering finished
    WebRtc(Result<CandidateReport, String>),
    /// One DNSSEC probe finished
    Dnssec {
        algorithm: DnssecAlgorithm,
        condition: DnssecCondition,
        result: Result<DnssecProbeResult, String>,
    },
    Fingerprint(Fingerprint),
    /// Request headers as the server saw them
    Headers(FingerprintResponse),
    /// A task has sent everything it will send
    Finished(Task),
}

/// Snapshot of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsState {
    pub ipv4: Slot<AddressRecord>,
    pub ipv6: Slot<AddressRecord>,
    pub webrtc: Slot<CandidateReport>,
    pub dnssec: Vec<DnssecCell>,
    pub fingerprint: Slot<Fingerprint>,
    pub headers: Slot<FingerprintResponse>,
    #[serde(skip)]
    finished: Vec<Task>,
}

impl ResultsState {
    /// Everything pending, DNSSEC cells in probing order.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ipv4: Slot::Pending,
            ipv6: Slot::Pending,
            webrtc: Slot::Pending,
            dnssec: all_cells()
                .map(|(algorithm, condition)| DnssecCell {
                    algorithm,
                    condition,
                    result: Slot::Pending,
                })
                .collect(),
            fingerprint: Slot::Pending,
            headers: Slot::Pending,
            finished: Vec::new(),
        }
    }

    /// Fold one update into the state.
    pub fn apply(&mut self, update: Update) {
        match update {
            Update::Address { version, result } => {
                let slot = match version {
                    IpVersion::V4 => &mut self.ipv4,
                    IpVersion::V6 => &mut self.ipv6,
                };
                *slot = into_slot(result);
            }
            Update::WebRtc(result) => self.webrtc = into_slot(result),
            Update::Dnssec {
                algorithm,
                condition,
                result,
            } => {
                if let Some(cell) = self
                    .dnssec
                    .iter_mut()
                    .find(|c| c.algorithm == algorithm && c.condition == condition)
                {
                    cell.result = into_slot(result);
                }
            }
            Update::Fingerprint(fp) => self.fingerprint = Slot::Ready(fp),
            Update::Headers(headers) => self.headers = Slot::Ready(headers),
            Update::Finished(task) => {
                if !self.finished.contains(&task) {
                    self.finished.push(task);
                }
            }
        }
    }

    /// Whether every task has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        Task::ALL.iter().all(|t| self.finished.contains(t))
    }

    /// Resolved DNSSEC cells.
    #[must_use]
    pub fn dnssec_done(&self) -> usize {
        self.dnssec.iter().filter(|c| !c.result.is_pending()).count()
    }

    /// Probe results that came back, in probing order.
    #[must_use]
    pub fn dnssec_results(&self) -> Vec<DnssecProbeResult> {
        self.dnssec
            .iter()
            .filter_map(|c| c.result.ready().cloned())
            .collect()
    }

    /// The resolver validates DNSSEC: every cell ran and passed.
    ///
    /// Pending or failed cells make this false.
    #[must_use]
    pub fn dnssec_validates(&self) -> bool {
        !self.dnssec.is_empty()
            && self
                .dnssec
                .iter()
                .all(|c| c.result.ready().is_some_and(|r| r.passed))
    }

    /// Pass/fail counts over the cells that came back.
    #[must_use]
    pub fn dnssec_summary(&self) -> DnssecSummary {
        let mut summary = DnssecSummary::from_results(&self.dnssec_results());
        summary.validates = self.dnssec_validates();
        summary
    }

    /// Public ICE addresses the server-side detection did not report.
    #[must_use]
    pub fn additional_addresses(&self) -> Vec<IpAddr> {
        let Some(report) = self.webrtc.ready() else {
            return Vec::new();
        };
        let known: Vec<IpAddr> = [&self.ipv4, &self.ipv6]
            .into_iter()
            .filter_map(|slot| slot.ready())
            .filter_map(|record| record.ip.parse().ok())
            .collect();
        report.additional(&known)
    }
}

impl Default for ResultsState {
    fn default() -> Self {
        Self::new()
    }
}

fn into_slot<T>(result: Result<T, String>) -> Slot<T> {
    match result {
        Ok(value) => Slot::Ready(value),
        Err(msg) => Slot::Failed(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ip: &str) -> AddressRecord {
        AddressRecord::bare(ip.parse().unwrap())
    }

    fn pass(algorithm: DnssecAlgorithm, condition: DnssecCondition) -> Update {
        Update::Dnssec {
            algorithm,
            condition,
            result: Ok(DnssecProbeResult::pass("d", algorithm, condition)),
        }
    }

    #[test]
    fn test_new_is_all_pending() {
        let state = ResultsState::new();
        assert_eq!(state.dnssec.len(), 12);
        assert_eq!(state.dnssec[0].algorithm, DnssecAlgorithm::Ecdsa256);
        assert_eq!(state.dnssec[0].condition, DnssecCondition::Valid);
        assert_eq!(state.dnssec[11].algorithm, DnssecAlgorithm::Ed25519);
        assert_eq!(state.ipv4.placeholder(), Some(MSG_PENDING));
        assert!(!state.is_complete());
        assert!(!state.dnssec_validates());
    }

    #[test]
    fn test_address_updates() {
        let mut state = ResultsState::new();
        state.apply(Update::Address {
            version: IpVersion::V4,
            result: Ok(record("203.0.113.9")),
        });
        state.apply(Update::Address {
            version: IpVersion::V6,
            result: Err(IpVersion::V6.no_connectivity_message().to_string()),
        });

        assert_eq!(state.ipv4.ready().unwrap().ip, "203.0.113.9");
        assert_eq!(state.ipv6.placeholder(), Some("No IPv6 connectivity"));
    }

    #[test]
    fn test_dnssec_validates_only_when_every_cell_passed() {
        let mut state = ResultsState::new();
        for (alg, cond) in all_cells() {
            state.apply(pass(alg, cond));
        }
        assert!(state.dnssec_validates());
        assert_eq!(state.dnssec_done(), 12);

        state.apply(Update::Dnssec {
            algorithm: DnssecAlgorithm::Ed25519,
            condition: DnssecCondition::Expired,
            result: Ok(DnssecProbeResult::failure(
                "d",
                DnssecAlgorithm::Ed25519,
                DnssecCondition::Expired,
                "resolver accepted invalid signature",
            )),
        });
        assert!(!state.dnssec_validates());
        let summary = state.dnssec_summary();
        assert_eq!((summary.total, summary.passed, summary.failed), (12, 11, 1));
    }

    #[test]
    fn test_dnssec_request_failure_blocks_validation() {
        let mut state = ResultsState::new();
        for (alg, cond) in all_cells().skip(1) {
            state.apply(pass(alg, cond));
        }
        state.apply(Update::Dnssec {
            algorithm: DnssecAlgorithm::Ecdsa256,
            condition: DnssecCondition::Valid,
            result: Err("Network error: connection refused".to_string()),
        });
        assert_eq!(state.dnssec_done(), 12);
        assert!(!state.dnssec_validates());
    }

    #[test]
    fn test_additional_addresses() {
        let mut state = ResultsState::new();
        let report = CandidateReport {
            public: vec!["203.0.113.9".parse().unwrap(), "2001:db8::5".parse().unwrap()],
            ..CandidateReport::default()
        };
        state.apply(Update::WebRtc(Ok(report)));
        assert_eq!(state.additional_addresses().len(), 2);

        state.apply(Update::Address {
            version: IpVersion::V4,
            result: Ok(record("203.0.113.9")),
        });
        assert_eq!(
            state.additional_addresses(),
            vec!["2001:db8::5".parse::<IpAddr>().unwrap()]
        );

        state.apply(Update::WebRtc(Err(MSG_WEBRTC_UNSUPPORTED.to_string())));
        assert!(state.additional_addresses().is_empty());
        assert_eq!(state.webrtc.placeholder(), Some("WebRTC not supported"));
    }

    #[test]
    fn test_completion() {
        let mut state = ResultsState::new();
        state.apply(Update::Finished(Task::Ip));
        state.apply(Update::Finished(Task::Ip));
        state.apply(Update::Finished(Task::WebRtc));
        assert!(!state.is_complete());
        state.apply(Update::Finished(Task::Dnssec));
        assert!(state.is_complete());
    }
}
