//! Local device fingerprint.

use chrono::{Local, Offset};
use serde::{Deserialize, Serialize};

/// What this machine reveals about itself without asking anyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub os: String,
    pub arch: String,
    pub cpu_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Offset from UTC, e.g. `+02:00`
    pub utc_offset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    pub user_agent: String,
}

impl Fingerprint {
    /// Collect from the running process.
    #[must_use]
    pub fn collect() -> Self {
        let offset = Local::now().offset().fix();

        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_count: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            locale: locale_from(|key| std::env::var(key).ok()),
            utc_offset: format_offset(offset.local_minus_utc()),
            time_zone: std::env::var("TZ").ok().filter(|tz| !tz.is_empty()),
            user_agent: user_agent(),
        }
    }
}

/// User agent sent by the client.
#[must_use]
pub fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// POSIX locale lookup order: `LC_ALL`, `LC_MESSAGES`, `LANG`.
fn locale_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| lookup(key))
        .find(|v| !v.is_empty() && v != "C" && v != "POSIX")
        .map(|v| {
            // en_US.UTF-8 -> en-US
            let base = v.split(['.', '@']).next().unwrap_or(v.as_str());
            base.replace('_', "-")
        })
}

fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_locale_precedence() {
        let env: HashMap<&str, &str> = [("LANG", "de_DE.UTF-8"), ("LC_ALL", "fr_FR@euro")].into();
        let lookup = |k: &str| env.get(k).map(|v| (*v).to_string());
        assert_eq!(locale_from(lookup).as_deref(), Some("fr-FR"));

        let env: HashMap<&str, &str> = [("LANG", "C"), ("LC_MESSAGES", "")].into();
        let lookup = |k: &str| env.get(k).map(|v| (*v).to_string());
        assert_eq!(locale_from(lookup), None);
    }

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(0), "+00:00");
        assert_eq!(format_offset(19_800), "+05:30");
        assert_eq!(format_offset(-25_200), "-07:00");
    }

    #[test]
    fn test_collect() {
        let fp = Fingerprint::collect();
        assert!(fp.cpu_count >= 1);
        assert!(fp.user_agent.starts_with("ipcheck/"));
        assert_eq!(fp.os, std::env::consts::OS);
    }
}
