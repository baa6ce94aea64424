//! ipcheck - What is my IP, and does my resolver validate DNSSEC?
//!
//! This crate provides both a library API and a CLI tool for:
//! - Detecting a caller's public IPv4/IPv6 addresses behind proxies
//! - Reverse DNS (PTR) and geolocation metadata for an address
//! - Probing whether a resolver validates DNSSEC signatures
//! - Finding addresses leaked through ICE candidate gathering
//!
//! # Library Usage
//!
//! ```ignore
//! use ipcheck::dns::{DnssecAlgorithm, DnssecCondition, DnssecProber, DohClient, TestCatalog};
//!
//! let prober = DnssecProber::new(
//!     DohClient::new(http, "https://cloudflare-dns.com/dns-query"),
//!     TestCatalog::well_known(),
//! );
//! let result = prober.probe(DnssecAlgorithm::Ed25519, DnssecCondition::Invalid).await;
//! assert!(result.passed);
//!
//! let ptr = ipcheck::net::build_ptr_name("2001:db8::1")?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Run the HTTP API
//! ipcheck serve --listen 0.0.0.0:8080
//!
//! # Check this machine against it (interactive TUI by default)
//! ipcheck
//! ipcheck check --server http://127.0.0.1:8080
//! ipcheck check --format json --no-webrtc
//!
//! # Direct lookups, no service needed
//! ipcheck lookup 8.8.8.8
//! ipcheck ptr 2001:4860:4860::8888
//! ipcheck dnssec --algorithm ed25519
//! ```
//!
//! # Features
//!
//! - **Proxy-aware detection**: `cf-connecting-ip`, `x-forwarded-for`, `x-real-ip`
//! - **Provider fallback**: secondary geolocation provider and alternate DNSSEC domains
//! - **Progressive results**: every task reports as soon as it has something
//! - **IPv4/IPv6 Support**: Works with both address families

pub mod cli;
pub mod client;
pub mod config;
pub mod dns;
pub mod error;
pub mod geo;
pub mod lookup;
pub mod net;
pub mod server;
pub mod tui;

// Re-export commonly used types
pub use cli::{Cli, Commands, OutputFormat};
pub use client::{ApiClient, Orchestrator, ResultsState};
pub use config::{ConfigLoader, Settings};
pub use dns::{DnssecAlgorithm, DnssecCondition, DnssecProbeResult, DnssecProber, TestCatalog};
pub use error::{Error, Result};
pub use lookup::{AddressLookup, AddressRecord};
pub use net::IpVersion;
