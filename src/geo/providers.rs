//! Provider response shapes.

use super::GeoInfo;
use crate::error::{Error, Result};
use serde::Deserialize;

/// ipinfo.io `/{ip}/json` response.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IpInfoResponse {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Set for reserved/private addresses
    #[serde(default)]
    pub bogon: bool,
}

impl IpInfoResponse {
    /// Normalize into `GeoInfo`.
    ///
    /// # Errors
    ///
    /// Bogon addresses and empty answers are treated as failures so the
    /// caller moves on to the next provider.
    pub fn into_geo(self) -> Result<GeoInfo> {
        if self.bogon {
            return Err(Error::network("ipinfo reports a bogon address"));
        }

        let info = GeoInfo {
            city: non_empty(self.city),
            region: non_empty(self.region),
            country: non_empty(self.country),
            org: non_empty(self.org),
            timezone: non_empty(self.timezone),
        };
        if info.is_empty() {
            return Err(Error::network("ipinfo returned no location data"));
        }
        Ok(info)
    }
}

/// ip-api.com `/json/{ip}` response.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IpApiResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub isp: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default, rename = "as")]
    pub asn: Option<String>,
}

impl IpApiResponse {
    /// Normalize into `GeoInfo`.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider reports `status != "success"`.
    pub fn into_geo(self) -> Result<GeoInfo> {
        if self.status != "success" {
            return Err(Error::network(format!(
                "ip-api status {}: {}",
                self.status,
                self.message.unwrap_or_default()
            )));
        }

        Ok(GeoInfo {
            city: non_empty(self.city),
            region: non_empty(self.region_name),
            country: non_empty(self.country_code),
            org: non_empty(self.asn)
                .or_else(|| non_empty(self.org))
                .or_else(|| non_empty(self.isp)),
            timezone: non_empty(self.timezone),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_api_org_fallbacks() {
        let response = IpApiResponse {
            status: "success".to_string(),
            asn: Some(String::new()),
            isp: Some("Example ISP".to_string()),
            ..IpApiResponse::default()
        };
        let info = response.into_geo().unwrap();
        assert_eq!(info.org.as_deref(), Some("Example ISP"));
    }

    #[test]
    fn test_ipinfo_empty_is_error() {
        let response = IpInfoResponse {
            ip: Some("192.0.2.1".to_string()),
            ..IpInfoResponse::default()
        };
        assert!(response.into_geo().is_err());
    }
}
