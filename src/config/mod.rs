//! Configuration module.
//!
//! This module provides the runtime settings and the loader that
//! resolves them from files, defaults and command-line overrides.

pub mod loader;
pub mod settings;

pub use loader::{ConfigLoader, Overrides};
pub use settings::Settings;
