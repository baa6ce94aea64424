//! DNSSEC validation probing.
//!
//! Each (algorithm, condition) cell maps to a test domain. The prober
//! resolves it through a validating DoH resolver with the DO bit set and
//! judges the resolver by the DNS status it returns.

use crate::dns::doh::DohClient;
use crate::dns::types::{
    all_cells, DnssecAlgorithm, DnssecCondition, DnssecProbeResult, DnssecSummary, DohResponse,
};
use crate::error::Result;
use trust_dns_resolver::proto::rr::RecordType;

/// Failure message for a correctly signed domain that did not resolve.
pub const MSG_DID_NOT_RESOLVE: &str = "domain did not resolve";

/// Failure message for a bad signature the resolver let through.
pub const MSG_ACCEPTED_INVALID: &str = "resolver accepted invalid signature";

/// Test domains for one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Domain probed first
    pub primary: String,
    /// Well-known public domain used when the primary is unreachable
    pub alternate: String,
}

/// Algorithm × condition → test domains.
#[derive(Debug, Clone)]
pub struct TestCatalog {
    entries: Vec<((DnssecAlgorithm, DnssecCondition), CatalogEntry)>,
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::well_known()
    }
}

impl TestCatalog {
    /// Catalog of publicly maintained DNSSEC test domains.
    #[must_use]
    pub fn well_known() -> Self {
        Self::build(|alg, cond| well_known_domain(alg, cond).to_string())
    }

    /// Build the catalog for a self-hosted test zone.
    ///
    /// Primary domains follow `{condition}.alg{number}.{zone}`; the zone must
    /// publish one signed (or deliberately broken) name per cell.
    #[must_use]
    pub fn for_zone(zone: &str) -> Self {
        let zone = zone.trim_matches('.');
        Self::build(|alg, cond| format!("{}.alg{}.{zone}", cond.as_str(), alg.number()))
    }

    fn build(primary: impl Fn(DnssecAlgorithm, DnssecCondition) -> String) -> Self {
        let entries = all_cells()
            .map(|(alg, cond)| {
                let entry = CatalogEntry {
                    primary: primary(alg, cond),
                    alternate: alternate_domain(alg, cond).to_string(),
                };
                ((alg, cond), entry)
            })
            .collect();
        Self { entries }
    }

    /// Look up the domains for one cell.
    #[must_use]
    pub fn entry(
        &self,
        algorithm: DnssecAlgorithm,
        condition: DnssecCondition,
    ) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|(key, _)| *key == (algorithm, condition))
            .map(|(_, entry)| entry)
    }

    /// Cells in probing order: algorithm-major, condition-minor.
    pub fn cells(&self) -> impl Iterator<Item = (DnssecAlgorithm, DnssecCondition)> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Dedicated test-bed names, one scenario each.
fn well_known_domain(algorithm: DnssecAlgorithm, condition: DnssecCondition) -> &'static str {
    use DnssecAlgorithm::{Ecdsa256, Ecdsa384, Ed25519};
    use DnssecCondition::{Expired, Invalid, Missing, Valid};

    match (algorithm, condition) {
        (Ecdsa256, Valid) => "valid.extended-dns-errors.com",
        (Ecdsa384, Valid) => "sigok.verteiltesysteme.net",
        (Ed25519, Valid) => "ed25519.nl",
        (Ecdsa256 | Ed25519, Invalid) => "sigfail.verteiltesysteme.net",
        (Ecdsa384, Invalid) => "dnssec-failed.org",
        (_, Expired) => "rrsig-exp-all.extended-dns-errors.com",
        (_, Missing) => "unsigned.extended-dns-errors.com",
    }
}

/// Fallback domains, grouped by scenario.
fn alternate_domain(algorithm: DnssecAlgorithm, condition: DnssecCondition) -> &'static str {
    use DnssecAlgorithm::{Ecdsa256, Ecdsa384, Ed25519};
    use DnssecCondition::{Expired, Invalid, Missing, Valid};

    match (algorithm, condition) {
        (Ecdsa256, Valid) => "cloudflare.com",
        (Ecdsa384, Valid) => "nlnetlabs.nl",
        (Ed25519, Valid) => "sigok.verteiltesysteme.net",
        (Ecdsa256 | Ed25519, Invalid) => "dnssec-failed.org",
        (Ecdsa384, Invalid) => "brokendnssec.net",
        (_, Expired) => "rhybar.cz",
        (Ecdsa256, Missing) => "google.com",
        (Ecdsa384, Missing) => "github.com",
        (Ed25519, Missing) => "amazon.com",
    }
}

/// Judge a resolver response for a condition.
///
/// Returns `Ok(())` when the resolver behaved like a validating resolver,
/// otherwise the failure explanation. For unsigned domains the AD flag is
/// ignored: both states pass as long as the name resolved.
pub fn evaluate(
    condition: DnssecCondition,
    response: &DohResponse,
) -> std::result::Result<(), String> {
    let code = response.response_code();
    match condition {
        DnssecCondition::Valid | DnssecCondition::Missing => {
            if response.is_noerror() {
                Ok(())
            } else {
                Err(format!("{MSG_DID_NOT_RESOLVE} (status {code})"))
            }
        }
        DnssecCondition::Invalid | DnssecCondition::Expired => {
            if response.is_servfail() {
                Ok(())
            } else if response.is_noerror() {
                Err(MSG_ACCEPTED_INVALID.to_string())
            } else {
                Err(format!("unexpected status {code}"))
            }
        }
    }
}

/// DNSSEC resolver prober.
///
/// # Example
///
/// ```ignore
/// let prober = DnssecProber::new(doh, TestCatalog::well_known());
/// let result = prober.probe(DnssecAlgorithm::Ed25519, DnssecCondition::Invalid).await;
/// println!("{}: {}", result.domain, result.passed);
/// ```
#[derive(Debug, Clone)]
pub struct DnssecProber {
    doh: DohClient,
    catalog: TestCatalog,
}

impl DnssecProber {
    /// Create a prober.
    #[must_use]
    pub fn new(doh: DohClient, catalog: TestCatalog) -> Self {
        Self { doh, catalog }
    }

    /// The catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &TestCatalog {
        &self.catalog
    }

    /// Probe one cell.
    ///
    /// Only a network-level failure on the primary domain triggers the
    /// single retry against the alternate domain; a DNS status on the
    /// primary is always final.
    pub async fn probe(
        &self,
        algorithm: DnssecAlgorithm,
        condition: DnssecCondition,
    ) -> DnssecProbeResult {
        let Some(entry) = self.catalog.entry(algorithm, condition) else {
            return DnssecProbeResult::failure("", algorithm, condition, "no test domain");
        };

        let (domain, outcome) = match self.query(&entry.primary).await {
            Err(e) if e.is_network() => {
                tracing::warn!(
                    "DNSSEC probe {algorithm}/{condition} on {} failed ({e}), trying {}",
                    entry.primary,
                    entry.alternate
                );
                (&entry.alternate, self.query(&entry.alternate).await)
            }
            outcome => (&entry.primary, outcome),
        };

        let result = match outcome {
            Ok(response) => match evaluate(condition, &response) {
                Ok(()) => DnssecProbeResult::pass(domain.as_str(), algorithm, condition),
                Err(reason) => {
                    DnssecProbeResult::failure(domain.as_str(), algorithm, condition, reason)
                }
            },
            Err(e) => DnssecProbeResult::failure(domain.as_str(), algorithm, condition, e.to_string()),
        };

        tracing::debug!(
            domain = %result.domain,
            %algorithm,
            %condition,
            passed = result.passed,
            "DNSSEC probe finished"
        );
        result
    }

    /// Probe every cell sequentially, in catalog order.
    ///
    /// # Arguments
    ///
    /// * `progress_callback` - Optional callback invoked after each cell
    pub async fn probe_all(
        &self,
        progress_callback: Option<impl Fn(usize, usize, &DnssecProbeResult)>,
    ) -> Vec<DnssecProbeResult> {
        self.probe_matching(|_, _| true, progress_callback).await
    }

    /// Probe the cells accepted by `filter`, sequentially, in catalog order.
    ///
    /// The callback receives the index among the selected cells and their count.
    pub async fn probe_matching(
        &self,
        filter: impl Fn(DnssecAlgorithm, DnssecCondition) -> bool,
        progress_callback: Option<impl Fn(usize, usize, &DnssecProbeResult)>,
    ) -> Vec<DnssecProbeResult> {
        let cells: Vec<_> = self.catalog.cells().filter(|(a, c)| filter(*a, *c)).collect();
        let total = cells.len();
        let mut results = Vec::with_capacity(total);

        for (idx, (algorithm, condition)) in cells.into_iter().enumerate() {
            let result = self.probe(algorithm, condition).await;
            if let Some(ref cb) = progress_callback {
                cb(idx, total, &result);
            }
            results.push(result);
        }

        results
    }

    /// Calculate summary statistics from results.
    #[must_use]
    pub fn summarize(results: &[DnssecProbeResult]) -> DnssecSummary {
        DnssecSummary::from_results(results)
    }

    async fn query(&self, domain: &str) -> Result<DohResponse> {
        self.doh.query(domain, RecordType::A, true).await
    }
}
