//! Terminal User Interface (TUI) module.
//!
//! Renders a check run live using the `ratatui` library: address panels,
//! leaked WebRTC addresses, the DNSSEC table and a fingerprint summary.

mod app;

pub use app::App;
