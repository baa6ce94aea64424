//! Client IP extraction from proxy headers.

use crate::net::is_private;
use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Set by Cloudflare to the visitor address.
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";

/// Comma-separated proxy chain, client first.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Set by nginx-style reverse proxies.
pub const X_REAL_IP: &str = "x-real-ip";

/// Headers consulted, highest precedence first.
const TRUSTED_HEADERS: [&str; 3] = [CF_CONNECTING_IP, X_FORWARDED_FOR, X_REAL_IP];

/// Where the client address came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpSource {
    /// Taken from a proxy header
    Header { ip: IpAddr, header: &'static str },
    /// Taken from the TCP connection
    Connection { ip: IpAddr },
}

impl IpSource {
    #[must_use]
    pub fn ip(&self) -> IpAddr {
        match self {
            Self::Header { ip, .. } | Self::Connection { ip } => *ip,
        }
    }
}

/// Determine the caller's address.
///
/// Precedence: `cf-connecting-ip`, the first `x-forwarded-for` entry,
/// `x-real-ip`, then the connection address. Unparseable header values
/// are skipped.
#[must_use]
pub fn client_ip(headers: &HeaderMap, connection: Option<IpAddr>) -> Option<IpSource> {
    for header in TRUSTED_HEADERS {
        let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) else {
            continue;
        };

        let first = value.split(',').next().unwrap_or_default();
        match parse_ip(first) {
            Some(ip) => {
                tracing::debug!("Client IP {ip} from header {header}");
                return Some(IpSource::Header { ip, header });
            }
            None => tracing::debug!("Ignoring unparseable {header}: {value}"),
        }
    }

    connection.map(|ip| IpSource::Connection { ip })
}

/// Parse an address that may carry a port or IPv6 brackets.
fn parse_ip(value: &str) -> Option<IpAddr> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|s| s.ip()))
        .or_else(|| {
            value
                .strip_prefix('[')
                .and_then(|v| v.strip_suffix(']'))
                .and_then(|v| v.parse().ok())
        })
}

/// Whether the detected address is only meaningful locally.
///
/// Loopback, unspecified and private addresses mean the service is being
/// used from the same host or LAN; the public address must come from an
/// echo service instead.
#[must_use]
pub fn needs_echo(ip: &IpAddr) -> bool {
    ip.is_loopback() || ip.is_unspecified() || is_private(ip)
}
