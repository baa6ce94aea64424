//! DNS-over-HTTPS client.
//!
//! Speaks the JSON flavour of DoH (`application/dns-json`) understood by
//! Cloudflare's `/dns-query` and Google's `/resolve` endpoints.

use crate::dns::types::DohResponse;
use crate::error::{Error, Result};
use reqwest::header::ACCEPT;
use trust_dns_resolver::proto::rr::RecordType;

/// Media type of the JSON DoH API.
const DNS_JSON: &str = "application/dns-json";

/// DNS-over-HTTPS JSON client.
///
/// # Example
///
/// ```ignore
/// let doh = DohClient::new(http, "https://cloudflare-dns.com/dns-query");
/// let response = doh.query("example.com", RecordType::A, true).await?;
/// println!("AD flag: {}", response.authenticated_data);
/// ```
#[derive(Debug, Clone)]
pub struct DohClient {
    http: reqwest::Client,
    endpoint: String,
}

impl DohClient {
    /// Create a client for one resolver endpoint.
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// Resolve `name` for `record_type`.
    ///
    /// When `dnssec_ok` is set the DO bit is requested so the resolver
    /// performs (and reports) DNSSEC validation.
    ///
    /// # Errors
    ///
    /// Returns a network-class error when the request cannot complete, the
    /// endpoint answers with a non-success HTTP status or the body is not
    /// a DNS JSON document. DNS-level failures (SERVFAIL, NXDOMAIN) are
    /// reported through `DohResponse::status`, not as errors.
    pub async fn query(
        &self,
        name: &str,
        record_type: RecordType,
        dnssec_ok: bool,
    ) -> Result<DohResponse> {
        let mut params = vec![("name", name.to_string()), ("type", record_type.to_string())];
        if dnssec_ok {
            params.push(("do", "1".to_string()));
        }

        tracing::debug!(endpoint = %self.endpoint, %name, %record_type, dnssec_ok, "DoH query");

        let response = self
            .http
            .get(&self.endpoint)
            .header(ACCEPT, DNS_JSON)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!(
                "{} answered HTTP {status} for {name}",
                self.endpoint
            )));
        }

        let body = response.text().await?;
        let parsed: DohResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}
