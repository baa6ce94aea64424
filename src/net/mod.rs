//! Network address module.
//!
//! This module provides address-level helpers shared by the server and
//! the client:
//! - IPv6 expansion and contraction
//! - Reverse-DNS (PTR) name construction
//! - Private-range classification

pub mod addr;

pub use addr::*;
