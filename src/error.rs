//! Error types module.
//!
//! This module defines the error types used throughout ipcheck.
//! It uses `thiserror` for structured error handling and provides
//! a custom `Result` type alias for convenience.

use thiserror::Error;

/// A specialized `Result` type for ipcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for ipcheck.
///
/// Variants fall into three classes: network failures (the request could
/// not complete), input errors (caller supplied something malformed) and
/// local failures (I/O, config, terminal).
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, sockets, terminal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (configuration files, provider responses)
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error from an upstream provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Network-related error (non-success upstream status, unreachable host)
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error (invalid config, missing files)
    #[error("Config error: {0}")]
    Config(String),

    /// TUI (terminal UI) related error
    #[error("TUI error: {0}")]
    Tui(String),

    /// Parse error (invalid address text, malformed data)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Caller supplied an unusable parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation timeout
    #[error("Operation timed out")]
    Timeout,
}

impl Error {
    /// Create a new network error with a message.
    #[must_use]
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new configuration error with a message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new parse error with a message.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new TUI error with a message.
    #[must_use]
    pub fn tui(msg: impl Into<String>) -> Self {
        Self::Tui(msg.into())
    }

    /// Create a new invalid input error with a message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the request never produced a usable answer.
    ///
    /// Only these errors may trigger a provider or catalog fallback.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Network(_) | Self::Timeout | Self::Io(_) | Self::Json(_)
        )
    }

    /// Whether the error was caused by the caller's input.
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::InvalidInput(_))
    }
}

impl From<color_eyre::Report> for Error {
    fn from(e: color_eyre::Report) -> Self {
        Self::Config(e.to_string())
    }
}
