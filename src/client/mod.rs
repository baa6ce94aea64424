//! Terminal client for a running ipcheck service.
//!
//! The client fires three independent tasks (address detection, ICE
//! candidate harvesting and sequential DNSSEC probing) and folds their
//! progressive results into a [`ResultsState`].

pub mod api;
pub mod fingerprint;
pub mod ice;
pub mod orchestrator;
pub mod state;
mod stun;

pub use api::ApiClient;
pub use fingerprint::Fingerprint;
pub use ice::{
    gather_with_timeout, parse_candidate, CandidateKind, CandidateReport, CandidateSource,
    IceCandidate, StunGatherer,
};
pub use orchestrator::Orchestrator;
pub use state::{ResultsState, Slot, Task, Update};
