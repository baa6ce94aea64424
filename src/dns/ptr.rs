//! Reverse DNS lookups over DoH.

use crate::dns::doh::DohClient;
use crate::net::build_ptr_name;
use trust_dns_resolver::proto::rr::RecordType;

/// Reverse-DNS (PTR) client.
///
/// Lookups never fail: a missing record, a malformed address and an
/// unreachable resolver all produce `None`.
#[derive(Debug, Clone)]
pub struct ReverseDnsClient {
    doh: DohClient,
}

impl ReverseDnsClient {
    /// Create a PTR client on top of a DoH client.
    #[must_use]
    pub fn new(doh: DohClient) -> Self {
        Self { doh }
    }

    /// Look up the hostname registered for `ip`.
    ///
    /// Returns the first PTR answer with the trailing root dot removed.
    pub async fn lookup(&self, ip: &str) -> Option<String> {
        let name = match build_ptr_name(ip) {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!("Skipping PTR lookup for {ip}: {e}");
                return None;
            }
        };

        let response = match self.doh.query(&name, RecordType::PTR, false).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("PTR lookup for {ip} failed: {e}");
                return None;
            }
        };

        let answer = response.answers_of(RecordType::PTR).next()?;
        let hostname = answer.data.trim_end_matches('.');
        (!hostname.is_empty()).then(|| hostname.to_string())
    }
}
