//! Runs the three independent check tasks.
//!
//! Address detection, candidate harvesting and DNSSEC probing run
//! concurrently on the current task; each reports through the update
//! channel as soon as it has something. DNSSEC cells are probed one after
//! another so results arrive in table order.

use super::api::ApiClient;
use super::fingerprint::Fingerprint;
use super::ice::{gather_with_timeout, CandidateReport, CandidateSource};
use super::state::{Task, Update, MSG_WEBRTC_UNSUPPORTED};
use crate::dns::all_cells;
use crate::net::IpVersion;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// One configured check run.
#[derive(Debug, Clone)]
pub struct Orchestrator<S> {
    api: ApiClient,
    source: Option<S>,
    ice_timeout: Duration,
}

impl<S> Orchestrator<S>
where
    S: CandidateSource + Send + Sync + 'static,
{
    /// `source: None` means candidate gathering is unavailable.
    #[must_use]
    pub fn new(api: ApiClient, source: Option<S>, ice_timeout: Duration) -> Self {
        Self {
            api,
            source,
            ice_timeout,
        }
    }

    /// Run everything once, sending updates to `tx`.
    ///
    /// Returns after every task sent its `Finished` update. A closed
    /// channel is not an error; remaining results are simply dropped.
    pub async fn run(&self, tx: &UnboundedSender<Update>) {
        let _ = tx.send(Update::Fingerprint(Fingerprint::collect()));

        tokio::join!(
            self.detect_addresses(tx),
            self.harvest_candidates(tx),
            self.probe_dnssec(tx),
        );
        tracing::debug!("Check run complete");
    }

    /// Run on a background task.
    pub fn spawn(self: Arc<Self>, tx: UnboundedSender<Update>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(&tx).await })
    }

    async fn detect_addresses(&self, tx: &UnboundedSender<Update>) {
        let family = |version: IpVersion| async move {
            let result = match self.api.ip(version).await {
                Ok(response) if response.success => response
                    .into_record()
                    .ok_or_else(|| "Malformed response".to_string()),
                Ok(response) => Err(response
                    .error
                    .unwrap_or_else(|| version.no_connectivity_message().to_string())),
                Err(e) => {
                    tracing::warn!("{version} detection failed: {e}");
                    Err(e.to_string())
                }
            };
            let _ = tx.send(Update::Address { version, result });
        };

        let headers = async {
            match self.api.fingerprint().await {
                Ok(headers) => {
                    let _ = tx.send(Update::Headers(headers));
                }
                Err(e) => tracing::debug!("Header fingerprint unavailable: {e}"),
            }
        };

        tokio::join!(family(IpVersion::V4), family(IpVersion::V6), headers);
        let _ = tx.send(Update::Finished(Task::Ip));
    }

    async fn harvest_candidates(&self, tx: &UnboundedSender<Update>) {
        let result = match &self.source {
            None => Err(MSG_WEBRTC_UNSUPPORTED.to_string()),
            Some(source) => match gather_with_timeout(source, self.ice_timeout).await {
                Ok(candidates) => Ok(CandidateReport::from_candidates(&candidates)),
                Err(e) => {
                    tracing::debug!("Candidate gathering failed: {e}");
                    Err(MSG_WEBRTC_UNSUPPORTED.to_string())
                }
            },
        };
        let _ = tx.send(Update::WebRtc(result));
        let _ = tx.send(Update::Finished(Task::WebRtc));
    }

    async fn probe_dnssec(&self, tx: &UnboundedSender<Update>) {
        for (algorithm, condition) in all_cells() {
            let result = self
                .api
                .dnssec(algorithm, condition)
                .await
                .map_err(|e| e.to_string());
            if tx
                .send(Update::Dnssec {
                    algorithm,
                    condition,
                    result,
                })
                .is_err()
            {
                return;
            }
        }
        let _ = tx.send(Update::Finished(Task::Dnssec));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::state::ResultsState;
    use crate::error::{Error, Result};
    use serde_json::json;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedLines(Vec<String>);

    impl CandidateSource for FixedLines {
        async fn gather(&self, tx: mpsc::UnboundedSender<String>) -> Result<()> {
            for line in &self.0 {
                let _ = tx.send(line.clone());
            }
            Ok(())
        }
    }

    struct NoUdp;

    impl CandidateSource for NoUdp {
        async fn gather(&self, _tx: mpsc::UnboundedSender<String>) -> Result<()> {
            Err(Error::network("sockets unavailable"))
        }
    }

    async fn mock_service() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ip"))
            .and(query_param("version", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "ip": "203.0.113.9", "version": 4, "hostname": "host.example"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/ip"))
            .and(query_param("version", "6"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "error": "No IPv6 connectivity"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/fingerprint"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"userAgent": "ipcheck"})))
            .mount(&server)
            .await;
        server
    }

    async fn mount_dnssec(server: &MockServer, passed: bool) {
        for (algorithm, condition) in all_cells() {
            Mock::given(method("GET"))
                .and(path("/api/dnssec"))
                .and(query_param("algorithm", algorithm.as_str()))
                .and(query_param("test", condition.as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "success": true,
                    "domain": format!("{condition}.alg{}.example", algorithm.number()),
                    "algorithm": algorithm.as_str(),
                    "testType": condition.as_str(),
                    "passed": passed
                })))
                .mount(server)
                .await;
        }
    }

    async fn run_to_state<S>(orchestrator: Orchestrator<S>) -> (ResultsState, Vec<Update>)
    where
        S: CandidateSource + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        orchestrator.run(&tx).await;
        drop(tx);

        let mut state = ResultsState::new();
        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update.clone());
            state.apply(update);
        }
        (state, updates)
    }

    #[tokio::test]
    async fn test_full_run() {
        let server = mock_service().await;
        mount_dnssec(&server, true).await;
        let api = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let source = FixedLines(vec![
            "candidate:1 1 udp 2122260223 192.168.1.20 50000 typ host".to_string(),
            "candidate:2 1 udp 1686052607 203.0.113.9 40000 typ srflx".to_string(),
            "candidate:3 1 udp 1686052863 2001:db8::7 40002 typ srflx".to_string(),
        ]);

        let (state, updates) =
            run_to_state(Orchestrator::new(api, Some(source), Duration::from_secs(5))).await;

        assert!(state.is_complete());
        assert_eq!(state.ipv4.ready().unwrap().hostname.as_deref(), Some("host.example"));
        assert_eq!(state.ipv6.placeholder(), Some("No IPv6 connectivity"));
        assert!(state.dnssec_validates());
        assert_eq!(
            state.additional_addresses(),
            vec!["2001:db8::7".parse::<std::net::IpAddr>().unwrap()]
        );
        assert!(state.fingerprint.ready().is_some());
        assert_eq!(
            state.headers.ready().unwrap().user_agent.as_deref(),
            Some("ipcheck")
        );

        // DNSSEC updates arrive in table order
        let order: Vec<_> = updates
            .iter()
            .filter_map(|u| match u {
                Update::Dnssec {
                    algorithm,
                    condition,
                    ..
                } => Some((*algorithm, *condition)),
                _ => None,
            })
            .collect();
        assert_eq!(order, all_cells().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_degraded_run() {
        let server = mock_service().await;
        mount_dnssec(&server, false).await;
        let api = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();

        let (state, _) =
            run_to_state(Orchestrator::new(api, Some(NoUdp), Duration::from_secs(5))).await;
        assert!(state.is_complete());
        assert_eq!(state.webrtc.placeholder(), Some(MSG_WEBRTC_UNSUPPORTED));
        assert!(!state.dnssec_validates());
        assert_eq!(state.dnssec_done(), 12);
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Nothing listens on the discard port
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let (state, _) =
            run_to_state(Orchestrator::<NoUdp>::new(api, None, Duration::from_secs(1))).await;

        assert!(state.is_complete());
        assert!(matches!(state.ipv4, crate::client::state::Slot::Failed(_)));
        assert_eq!(state.webrtc.placeholder(), Some(MSG_WEBRTC_UNSUPPORTED));
        assert!(!state.dnssec_validates());
        assert!(state.headers.is_pending());
    }
}
