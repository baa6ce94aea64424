//! Settings configuration loader.
//!
//! This module loads `Settings` from JSON files, the default
//! config location, or falls back to built-in defaults, and applies
//! command-line overrides on top.

use crate::config::settings::Settings;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// File name looked up in the config directory.
const CONFIG_FILE: &str = "config.json";

/// Settings configuration loader.
pub struct ConfigLoader;

/// Overrides supplied on the command line or via environment variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub server: Option<String>,
    pub ipinfo_token: Option<String>,
}

impl ConfigLoader {
    /// Load settings from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default location.
    ///
    /// Searches in the following order:
    /// 1. `$CONFIG_DIR/ipcheck/config.json`
    /// 2. `config.json` in current directory
    ///
    /// # Errors
    ///
    /// Returns an error if no default file is found or cannot be parsed.
    pub fn load_default() -> Result<Settings> {
        Self::load_from_file(Self::config_dir().join(CONFIG_FILE))
            .or_else(|_| Self::load_from_file(CONFIG_FILE))
    }

    /// Resolve the settings for this run.
    ///
    /// An explicit path must load; otherwise the default locations are
    /// tried and built-in defaults are used when nothing is found.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be loaded.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Settings> {
        let settings = match path {
            Some(p) => Self::load_from_file(p)
                .map_err(|e| Error::config(format!("{}: {e}", p.display())))?,
            None => Self::load_default().unwrap_or_else(|e| {
                tracing::debug!("No config file loaded ({e}), using defaults");
                Settings::default()
            }),
        };
        Ok(Self::apply(settings, overrides))
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn apply(mut settings: Settings, overrides: Overrides) -> Settings {
        if let Some(listen) = overrides.listen {
            settings.listen = listen;
        }
        if let Some(server) = overrides.server {
            settings.server = server.trim_end_matches('/').to_string();
        }
        if let Some(token) = overrides.ipinfo_token.filter(|t| !t.is_empty()) {
            settings.geo.primary_token = Some(token);
        }
        settings
    }

    /// Get the config directory path.
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ipcheck")
    }

    /// Write settings as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(settings: &Settings, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"listen": "0.0.0.0:8443", "timeout_secs": 3}}"#).unwrap();

        let settings = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(settings.listen, "0.0.0.0:8443");
        assert_eq!(settings.timeout_secs, 3);
    }

    #[test]
    fn test_resolve_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigLoader::resolve(Some(&dir.path().join("nope.json")), Overrides::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let settings = Settings {
            dnssec_test_zone: Some("example.test".to_string()),
            ..Settings::default()
        };

        ConfigLoader::save(&settings, &path).unwrap();
        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_apply_overrides() {
        let settings = ConfigLoader::apply(
            Settings::default(),
            Overrides {
                listen: Some("[::]:80".to_string()),
                server: Some("http://example.test/".to_string()),
                ipinfo_token: Some(String::new()),
            },
        );
        assert_eq!(settings.listen, "[::]:80");
        assert_eq!(settings.server, "http://example.test");
        assert!(settings.geo.primary_token.is_none());
    }
}
