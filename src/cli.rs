//! Command-line interface (CLI) argument parsing module.
//!
//! This module provides CLI argument parsing using `clap`.
//! It supports running the HTTP service, checking against a running
//! service, and direct lookups (geolocation, PTR, DNSSEC) without one.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI argument parser using clap derive macro.
///
/// # Example
///
/// ```ignore
/// let cli = Cli::parse();
/// match cli.command {
///     Some(Commands::Serve { listen }) => { /* ... */ }
///     Some(Commands::Lookup { ip }) => { /* ... */ }
///     None => { /* check against the default server */ }
/// }
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "ipcheck",
    version,
    about = "What is my IP, and does my resolver validate DNSSEC?",
    long_about = "Reports your public IPv4/IPv6 addresses with reverse DNS and geolocation, \
                  addresses leaked through ICE candidate gathering, and whether your DNS \
                  resolver validates DNSSEC signatures.",
    infer_subcommands = true
)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Settings file (JSON)
    #[arg(short, long, global = true, env = "IPCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// ipinfo.io access token
    #[arg(long, global = true, env = "IPINFO_TOKEN", hide_env_values = true)]
    pub ipinfo_token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default, human-readable)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Get all available output format names.
    #[must_use]
    pub fn names() -> &'static [&'static str] {
        &["table", "json"]
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Unknown format: {}. Valid options are: {:?}",
                s,
                Self::names()
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Available commands for the ipcheck CLI.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    ///
    /// Serves /api/ip, /api/dnssec, /api/fingerprint and /api/health.
    #[command(alias = "s")]
    Serve {
        /// Socket address to bind
        #[arg(short, long, env = "IPCHECK_LISTEN")]
        listen: Option<String>,
    },

    /// Check this machine against a running service
    ///
    /// Detects IPv4/IPv6, gathers ICE candidates and probes every DNSSEC
    /// cell concurrently. Results stream as they arrive.
    #[command(alias = "c")]
    Check {
        /// Service base URL
        #[arg(short, long, env = "IPCHECK_SERVER")]
        server: Option<String>,

        /// Interactive terminal UI
        #[arg(short, long)]
        tui: bool,

        /// Skip ICE candidate gathering
        #[arg(long = "no-webrtc")]
        no_webrtc: bool,
    },

    /// Geolocation and PTR for an address, without a service
    #[command(alias = "l")]
    Lookup {
        /// IPv4 or IPv6 address
        ip: String,
    },

    /// Probe DNSSEC validation directly through the configured resolver
    ///
    /// Without filters every algorithm x condition cell is probed.
    #[command(alias = "d")]
    Dnssec {
        /// Only this algorithm (ecdsa256, ecdsa384, ed25519)
        #[arg(short, long)]
        algorithm: Option<String>,

        /// Only this condition (valid, invalid, expired, missing)
        #[arg(short, long)]
        test: Option<String>,
    },

    /// Reverse DNS for an address
    ///
    /// Prints the PTR query name (with the fully expanded IPv6 form) and the
    /// resolved hostname.
    #[command(alias = "p")]
    Ptr {
        /// IPv4 or IPv6 address
        ip: String,
    },

    /// Write the effective settings as a JSON config file
    #[command(alias = "init")]
    Config {
        /// Output file path (default: the user config directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Parse CLI arguments and return verbose flag.
///
/// # Returns
///
/// Returns a tuple of `(Cli, verbose)` where `verbose` indicates
/// whether verbose logging was enabled.
#[must_use]
pub fn parse_verbose() -> (Cli, bool) {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    (cli, verbose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["ipcheck", "dnssec", "-a", "ed25519", "--format", "json"])
            .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Some(Commands::Dnssec { algorithm: Some(ref a), test: None }) if a == "ed25519"
        ));

        let cli = Cli::try_parse_from(["ipcheck", "check", "--no-webrtc", "-s", "http://x:1"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Check { no_webrtc: true, tui: false, server: Some(_) })
        ));

        assert!(Cli::try_parse_from(["ipcheck", "ptr"]).is_err());
    }
}
