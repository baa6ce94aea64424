//! Address lookups.
//!
//! Combines geolocation and reverse DNS into one `AddressRecord`.

use crate::dns::ReverseDnsClient;
use crate::geo::{GeoClient, GeoInfo};
use crate::net::IpVersion;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Everything known about one address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressRecord {
    pub ip: String,
    pub version: IpVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(flatten)]
    pub geo: GeoInfo,
}

impl AddressRecord {
    /// A record with no metadata attached.
    #[must_use]
    pub fn bare(ip: IpAddr) -> Self {
        Self {
            ip: ip.to_string(),
            version: IpVersion::of(&ip),
            hostname: None,
            geo: GeoInfo::default(),
        }
    }
}

/// Geolocation + PTR lookup service.
#[derive(Debug, Clone)]
pub struct AddressLookup {
    geo: GeoClient,
    ptr: ReverseDnsClient,
}

impl AddressLookup {
    /// Create a lookup service.
    #[must_use]
    pub fn new(geo: GeoClient, ptr: ReverseDnsClient) -> Self {
        Self { geo, ptr }
    }

    /// Look up `ip`, running geolocation and PTR concurrently.
    ///
    /// Missing metadata is not an error; the record simply lacks it.
    pub async fn lookup(&self, ip: IpAddr) -> AddressRecord {
        let text = ip.to_string();
        let (geo, hostname) = tokio::join!(self.geo.lookup(&text), self.ptr.lookup(&text));

        AddressRecord {
            hostname,
            geo: geo.unwrap_or_default(),
            ..AddressRecord::bare(ip)
        }
    }
}
