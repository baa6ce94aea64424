//! Address utilities.
//!
//! Pure helpers for IPv6 text forms, reverse-DNS (PTR) name construction
//! and private-range classification of IPv4/IPv6 addresses.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Number of 16-bit groups in an IPv6 address.
const IPV6_GROUPS: usize = 8;

/// IP address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Family of a parsed address.
    #[must_use]
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// Whether `ip` belongs to this family.
    #[must_use]
    pub fn matches(self, ip: &IpAddr) -> bool {
        Self::of(ip) == self
    }

    /// Placeholder shown when no address of this family could be found.
    #[must_use]
    pub fn no_connectivity_message(self) -> &'static str {
        match self {
            Self::V4 => "No IPv4 connectivity",
            Self::V6 => "No IPv6 connectivity",
        }
    }
}

impl From<IpVersion> for u8 {
    fn from(v: IpVersion) -> Self {
        match v {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

impl TryFrom<u8> for IpVersion {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            4 => Ok(Self::V4),
            6 => Ok(Self::V6),
            other => Err(format!("Unknown IP version: {other}")),
        }
    }
}

impl FromStr for IpVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "4" | "v4" | "ipv4" => Ok(Self::V4),
            "6" | "v6" | "ipv6" => Ok(Self::V6),
            _ => Err(Error::invalid_input(format!(
                "Invalid version: {s}. Expected 4 or 6"
            ))),
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// Expand an IPv6 address to its full 8-group, zero-padded form.
///
/// `2001:db8::1` becomes `2001:0db8:0000:0000:0000:0000:0000:0001`.
/// A trailing dotted-quad (`::ffff:192.0.2.1`) is folded into two groups and
/// a zone suffix (`%eth0`) is ignored.
///
/// # Errors
///
/// Returns `Error::Parse` for more than one `::`, a wrong group count or a
/// group that is not 1-4 hex digits.
pub fn expand_ipv6(address: &str) -> Result<String> {
    let address = address.trim();
    let address = address.split('%').next().unwrap_or(address);

    let groups = match address.matches("::").count() {
        0 => {
            let groups = split_groups(address)?;
            if groups.len() != IPV6_GROUPS {
                return Err(Error::parse(format!(
                    "Expected {IPV6_GROUPS} groups in {address}, found {}",
                    groups.len()
                )));
            }
            groups
        }
        1 => {
            let (left, right) = address
                .split_once("::")
                .ok_or_else(|| Error::parse(format!("Invalid IPv6 address: {address}")))?;
            let left = split_groups(left)?;
            let right = split_groups(right)?;
            let present = left.len() + right.len();
            if present >= IPV6_GROUPS {
                return Err(Error::parse(format!(
                    "Too many groups around '::' in {address}"
                )));
            }

            let mut groups = left;
            groups.extend(std::iter::repeat(String::from("0")).take(IPV6_GROUPS - present));
            groups.extend(right);
            groups
        }
        _ => {
            return Err(Error::parse(format!(
                "Multiple '::' markers in {address}"
            )))
        }
    };

    Ok(groups
        .iter()
        .map(|g| format!("{:0>4}", g.to_lowercase()))
        .collect::<Vec<_>>()
        .join(":"))
}

/// Split one side of an IPv6 address into validated hex groups.
fn split_groups(part: &str) -> Result<Vec<String>> {
    if part.is_empty() {
        return Ok(Vec::new());
    }

    let mut groups = Vec::new();
    let pieces: Vec<&str> = part.split(':').collect();
    let last = pieces.len() - 1;

    for (idx, piece) in pieces.iter().enumerate() {
        if idx == last && piece.contains('.') {
            let v4: Ipv4Addr = piece
                .parse()
                .map_err(|_| Error::parse(format!("Invalid embedded IPv4: {piece}")))?;
            let o = v4.octets();
            groups.push(format!("{:x}", u16::from_be_bytes([o[0], o[1]])));
            groups.push(format!("{:x}", u16::from_be_bytes([o[2], o[3]])));
            continue;
        }

        if piece.is_empty() || piece.len() > 4 || !piece.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::parse(format!("Invalid IPv6 group: '{piece}'")));
        }
        groups.push((*piece).to_string());
    }

    Ok(groups)
}

/// Contract an IPv6 address to its canonical (RFC 5952) text form.
///
/// # Errors
///
/// Returns `Error::Parse` if the input is not a valid IPv6 address.
pub fn compress_ipv6(address: &str) -> Result<String> {
    let expanded = expand_ipv6(address)?;
    let ip: Ipv6Addr = expanded
        .parse()
        .map_err(|_| Error::parse(format!("Invalid IPv6 address: {address}")))?;
    Ok(ip.to_string())
}

/// Build the reverse-DNS query name for an address.
///
/// IPv4 octets are reversed under `in-addr.arpa`; IPv6 addresses are
/// expanded and their 32 nibbles reversed under `ip6.arpa`.
///
/// # Errors
///
/// Returns `Error::Parse` if `address` is neither a valid IPv4 nor IPv6 address.
///
/// # Example
///
/// ```ignore
/// assert_eq!(build_ptr_name("8.8.4.4")?, "4.4.8.8.in-addr.arpa");
/// ```
pub fn build_ptr_name(address: &str) -> Result<String> {
    let address = address.trim();

    if address.contains(':') {
        let expanded = expand_ipv6(address)?;
        let nibbles: Vec<String> = expanded
            .chars()
            .filter(|c| *c != ':')
            .rev()
            .map(String::from)
            .collect();
        return Ok(format!("{}.ip6.arpa", nibbles.join(".")));
    }

    let v4: Ipv4Addr = address
        .parse()
        .map_err(|_| Error::parse(format!("Invalid IP address: {address}")))?;
    let [a, b, c, d] = v4.octets();
    Ok(format!("{d}.{c}.{b}.{a}.in-addr.arpa"))
}

/// Check if an IPv4 address is outside the publicly routable space.
///
/// Covers RFC 1918, carrier-grade NAT (100.64.0.0/10), link-local
/// (169.254.0.0/16), loopback and the unspecified address.
#[must_use]
pub fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();

    a == 10
        || (a == 172 && (b & 0xf0) == 16)
        || (a == 192 && b == 168)
        || (a == 100 && (b & 0xc0) == 64)
        || (a == 169 && b == 254)
        || a == 127
        || ip.is_unspecified()
}

/// Check if an IPv6 address is outside the publicly routable space.
///
/// Covers link-local (fe80::/10), unique-local (fc00::/7), loopback and the
/// unspecified address. IPv4-mapped addresses are classified as IPv4.
#[must_use]
pub fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(v4);
    }

    let first = ip.segments()[0];
    (first & 0xffc0) == 0xfe80 || (first & 0xfe00) == 0xfc00 || ip.is_loopback() || ip.is_unspecified()
}

/// Check if an address of either family is private.
#[must_use]
pub fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(*v4),
        IpAddr::V6(v6) => is_private_ipv6(*v6),
    }
}

/// Check if a candidate address is a multicast-DNS placeholder.
///
/// Browsers hide host candidates behind random `<uuid>.local` names.
#[must_use]
pub fn is_mdns_placeholder(address: &str) -> bool {
    address.to_ascii_lowercase().ends_with(".local")
}
