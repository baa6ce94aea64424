//! DNS module.
//!
//! This module provides DNS-related functionality including:
//! - DNS-over-HTTPS JSON queries
//! - Reverse DNS (PTR) lookups
//! - DNSSEC validation probing
//! - Core data types

pub mod dnssec;
pub mod doh;
pub mod ptr;
pub mod types;

pub use dnssec::{DnssecProber, TestCatalog};
pub use doh::DohClient;
pub use ptr::ReverseDnsClient;
pub use types::*;
