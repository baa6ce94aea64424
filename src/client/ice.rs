//! ICE candidate harvesting.
//!
//! Candidates arrive as SDP `candidate:` attribute lines from a
//! [`CandidateSource`]. [`gather_with_timeout`] collects them under a hard
//! ceiling and [`CandidateReport`] turns them into the public and private
//! addresses they leak.

use super::stun;
use crate::error::{Error, Result};
use crate::net::{is_mdns_placeholder, is_private};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Per-server wait for a STUN binding response.
const STUN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Candidate type from the `typ` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    /// Local interface address
    Host,
    /// Server-reflexive: the address a STUN server saw
    Srflx,
    /// Peer-reflexive
    Prflx,
    /// TURN relay
    Relay,
}

impl FromStr for CandidateKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "host" => Ok(Self::Host),
            "srflx" => Ok(Self::Srflx),
            "prflx" => Ok(Self::Prflx),
            "relay" => Ok(Self::Relay),
            _ => Err(Error::parse(format!("Unknown candidate type: {s}"))),
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Host => "host",
            Self::Srflx => "srflx",
            Self::Prflx => "prflx",
            Self::Relay => "relay",
        };
        f.write_str(s)
    }
}

/// One parsed ICE candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub foundation: String,
    pub component: u16,
    pub protocol: String,
    pub priority: u32,
    /// Connection address; an IP literal or an mDNS `.local` name
    pub address: String,
    pub port: u16,
    pub kind: CandidateKind,
}

impl IceCandidate {
    /// The address as an IP, unless it is an mDNS placeholder.
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        if is_mdns_placeholder(&self.address) {
            return None;
        }
        self.address.parse().ok()
    }
}

/// Parse an SDP candidate line.
///
/// Accepts `candidate:...` with or without the `a=` prefix:
/// `candidate:<foundation> <component> <protocol> <priority> <address> <port> typ <kind> ...`
#[must_use]
pub fn parse_candidate(line: &str) -> Option<IceCandidate> {
    let line = line.trim();
    let line = line.strip_prefix("a=").unwrap_or(line);
    let rest = line.strip_prefix("candidate:")?;

    let mut fields = rest.split_whitespace();
    let foundation = fields.next()?.to_string();
    let component = fields.next()?.parse().ok()?;
    let protocol = fields.next()?.to_ascii_lowercase();
    let priority = fields.next()?.parse().ok()?;
    let address = fields.next()?.to_string();
    let port = fields.next()?.parse().ok()?;
    if fields.next()? != "typ" {
        return None;
    }
    let kind = fields.next()?.parse().ok()?;

    Some(IceCandidate {
        foundation,
        component,
        protocol,
        priority,
        address,
        port,
        kind,
    })
}

/// Addresses leaked by a set of candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateReport {
    /// Publicly routable addresses, sorted, deduplicated
    pub public: Vec<IpAddr>,
    /// Private, link-local and loopback addresses, sorted, deduplicated
    pub private: Vec<IpAddr>,
    /// Candidates hidden behind mDNS names
    pub mdns_hidden: usize,
    /// Candidate lines that parsed
    pub candidates: usize,
}

impl CandidateReport {
    /// Classify candidates, dropping mDNS placeholders and duplicates.
    #[must_use]
    pub fn from_candidates(candidates: &[IceCandidate]) -> Self {
        let mut public = BTreeSet::new();
        let mut private = BTreeSet::new();
        let mut mdns_hidden = 0;

        for candidate in candidates {
            if is_mdns_placeholder(&candidate.address) {
                mdns_hidden += 1;
                continue;
            }
            let Some(ip) = candidate.ip() else {
                tracing::debug!("Skipping unparsable candidate address {}", candidate.address);
                continue;
            };
            if is_private(&ip) {
                private.insert(ip);
            } else {
                public.insert(ip);
            }
        }

        Self {
            public: public.into_iter().collect(),
            private: private.into_iter().collect(),
            mdns_hidden,
            candidates: candidates.len(),
        }
    }

    /// Public addresses not among `known`.
    ///
    /// Addresses the server already reported are not news; whatever is
    /// left is what ICE leaked on its own.
    #[must_use]
    pub fn additional(&self, known: &[IpAddr]) -> Vec<IpAddr> {
        self.public
            .iter()
            .filter(|ip| !known.contains(ip))
            .copied()
            .collect()
    }
}

/// Something that emits ICE candidate lines.
///
/// Implementations send each `candidate:` line as soon as it is known and
/// return once gathering is complete.
pub trait CandidateSource {
    /// Gather candidates into `tx`.
    fn gather(&self, tx: mpsc::UnboundedSender<String>) -> impl Future<Output = Result<()>> + Send;
}

/// Collect candidates from `source`, giving up after `limit`.
///
/// Whatever arrived before the ceiling is kept. An error from the source is
/// only reported when it produced nothing at all.
pub async fn gather_with_timeout<S>(source: &S, limit: Duration) -> Result<Vec<IceCandidate>>
where
    S: CandidateSource + ?Sized,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let outcome = tokio::time::timeout(limit, source.gather(tx)).await;

    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }

    match outcome {
        Ok(Err(e)) if lines.is_empty() => return Err(e),
        Ok(Err(e)) => tracing::debug!("Candidate gathering ended early: {e}"),
        Err(_) => tracing::debug!("Candidate gathering hit the {limit:?} ceiling"),
        Ok(Ok(())) => {}
    }

    let candidates: Vec<_> = lines.iter().filter_map(|l| parse_candidate(l)).collect();
    tracing::debug!(lines = lines.len(), parsed = candidates.len(), "ICE gathering done");
    Ok(candidates)
}

/// Host and server-reflexive candidates from plain UDP sockets.
///
/// For each address family one socket is connected towards the first STUN
/// server that resolves in that family. Its local address is the host
/// candidate; the mapped address of a binding response is the srflx
/// candidate.
#[derive(Debug, Clone)]
pub struct StunGatherer {
    servers: Vec<String>,
}

impl StunGatherer {
    /// Create a gatherer over `host:port` STUN servers, tried in order.
    #[must_use]
    pub fn new(servers: Vec<String>) -> Self {
        Self { servers }
    }

    async fn gather_family(&self, want_v6: bool, tx: &mpsc::UnboundedSender<String>) -> Result<()> {
        let family = if want_v6 { "IPv6" } else { "IPv4" };
        let mut last_error = Error::network(format!("No {family} STUN server"));

        for server in &self.servers {
            let target = match resolve(server, want_v6).await {
                Ok(addr) => addr,
                Err(e) => {
                    last_error = e;
                    continue;
                }
            };
            match query(target, tx).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!("STUN {server} ({family}) failed: {e}");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

impl CandidateSource for StunGatherer {
    async fn gather(&self, tx: mpsc::UnboundedSender<String>) -> Result<()> {
        let (v4, v6) = tokio::join!(self.gather_family(false, &tx), self.gather_family(true, &tx));
        match (v4, v6) {
            (Err(e), Err(_)) => Err(e),
            _ => Ok(()),
        }
    }
}

async fn resolve(server: &str, want_v6: bool) -> Result<SocketAddr> {
    tokio::net::lookup_host(server)
        .await?
        .find(|addr| addr.is_ipv6() == want_v6)
        .ok_or_else(|| Error::network(format!("{server} has no matching address")))
}

/// Emit host and srflx lines for one STUN exchange.
async fn query(target: SocketAddr, tx: &mpsc::UnboundedSender<String>) -> Result<()> {
    let bind: SocketAddr = if target.is_ipv6() {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    } else {
        (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind).await?;
    socket.connect(target).await?;
    let local = socket.local_addr()?;

    let host_priority = if local.is_ipv6() { 2_122_262_783 } else { 2_122_260_223 };
    let _ = tx.send(format!(
        "candidate:{} 1 udp {host_priority} {} {} typ host generation 0",
        foundation("host", local.ip()),
        local.ip(),
        local.port()
    ));

    let (request, txn_id) = stun::binding_request();
    socket.send(&request).await?;

    let mut buf = [0u8; 1024];
    let mapped = tokio::time::timeout(STUN_ATTEMPT_TIMEOUT, async {
        loop {
            let len = socket.recv(&mut buf).await?;
            if let Some(mapped) = stun::parse_binding_response(&buf[..len], &txn_id) {
                return Ok::<_, Error>(mapped);
            }
        }
    })
    .await
    .map_err(|_| Error::Timeout)??;

    let _ = tx.send(format!(
        "candidate:{} 1 udp 1686052607 {} {} typ srflx raddr {} rport {} generation 0",
        foundation("srflx", mapped.ip()),
        mapped.ip(),
        mapped.port(),
        local.ip(),
        local.port()
    ));
    Ok(())
}

/// Stable foundation per (type, base address), as ICE agents derive it.
fn foundation(kind: &str, ip: IpAddr) -> u32 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    (kind, ip).hash(&mut hasher);
    hasher.finish() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lines(Vec<&'static str>);

    impl CandidateSource for Lines {
        async fn gather(&self, tx: mpsc::UnboundedSender<String>) -> Result<()> {
            for line in &self.0 {
                let _ = tx.send((*line).to_string());
            }
            Ok(())
        }
    }

    /// Sends one line, then never completes.
    struct Stalls;

    impl CandidateSource for Stalls {
        async fn gather(&self, tx: mpsc::UnboundedSender<String>) -> Result<()> {
            let _ = tx.send("candidate:1 1 udp 1686052607 203.0.113.7 40000 typ srflx".to_string());
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct Unsupported;

    impl CandidateSource for Unsupported {
        async fn gather(&self, _tx: mpsc::UnboundedSender<String>) -> Result<()> {
            Err(Error::network("no UDP"))
        }
    }

    #[test]
    fn test_parse_candidate() {
        let c = parse_candidate(
            "a=candidate:842163049 1 udp 1677729535 203.0.113.5 54321 typ srflx raddr 0.0.0.0 rport 0 generation 0",
        )
        .unwrap();
        assert_eq!(c.foundation, "842163049");
        assert_eq!(c.component, 1);
        assert_eq!(c.protocol, "udp");
        assert_eq!(c.priority, 1_677_729_535);
        assert_eq!(c.address, "203.0.113.5");
        assert_eq!(c.port, 54321);
        assert_eq!(c.kind, CandidateKind::Srflx);

        let mdns = parse_candidate(
            "candidate:1 1 UDP 2122252543 3f1c0b0e-1234-4b3a-9d2e-aa55aa55aa55.local 61000 typ host",
        )
        .unwrap();
        assert_eq!(mdns.protocol, "udp");
        assert!(mdns.ip().is_none());
    }

    #[test]
    fn test_parse_candidate_rejects_garbage() {
        assert!(parse_candidate("").is_none());
        assert!(parse_candidate("a=ice-ufrag:abcd").is_none());
        assert!(parse_candidate("candidate:1 1 udp 100 10.0.0.1 notaport typ host").is_none());
        assert!(parse_candidate("candidate:1 1 udp 100 10.0.0.1 5000 type host").is_none());
        assert!(parse_candidate("candidate:1 1 udp 100 10.0.0.1 5000 typ bogus").is_none());
    }

    #[test]
    fn test_report_classifies_and_dedups() {
        let lines = [
            "candidate:1 1 udp 2122260223 192.168.1.20 50000 typ host",
            "candidate:2 1 udp 2122260223 192.168.1.20 50001 typ host",
            "candidate:3 1 udp 2122262783 fe80::1 50002 typ host",
            "candidate:4 1 udp 1686052607 203.0.113.7 40000 typ srflx raddr 192.168.1.20 rport 50000",
            "candidate:5 1 udp 1686052607 203.0.113.7 40001 typ srflx raddr 192.168.1.20 rport 50001",
            "candidate:6 1 udp 1686052863 2001:db8::7 40002 typ srflx raddr fe80::1 rport 50002",
            "candidate:7 1 udp 2122252543 abcd.local 61000 typ host",
        ];
        let candidates: Vec<_> = lines.iter().filter_map(|l| parse_candidate(l)).collect();
        let report = CandidateReport::from_candidates(&candidates);

        assert_eq!(report.candidates, 7);
        assert_eq!(report.mdns_hidden, 1);
        assert_eq!(
            report.public,
            vec![
                "203.0.113.7".parse::<IpAddr>().unwrap(),
                "2001:db8::7".parse().unwrap()
            ]
        );
        assert_eq!(
            report.private,
            vec![
                "192.168.1.20".parse::<IpAddr>().unwrap(),
                "fe80::1".parse().unwrap()
            ]
        );

        let known = ["203.0.113.7".parse().unwrap()];
        assert_eq!(
            report.additional(&known),
            vec!["2001:db8::7".parse::<IpAddr>().unwrap()]
        );
    }

    #[tokio::test]
    async fn test_gather_collects_lines() {
        let source = Lines(vec![
            "candidate:1 1 udp 2122260223 10.0.0.2 50000 typ host",
            "not a candidate",
            "candidate:2 1 udp 1686052607 198.51.100.4 40000 typ srflx",
        ]);
        let candidates = gather_with_timeout(&source, Duration::from_secs(5)).await.unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_gather_keeps_lines_after_timeout() {
        let candidates = gather_with_timeout(&Stalls, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].address, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_gather_error_without_lines() {
        assert!(gather_with_timeout(&Unsupported, Duration::from_secs(5))
            .await
            .is_err());
    }
}
