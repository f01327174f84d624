//! File-backed settings.
//!
//! Settings are the middle layer of configuration: compiled defaults are
//! overridden by an optional TOML file, and the result is overridden again by
//! environment variables when [`crate::config::Config::resolve`] runs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gateway: GatewaySettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    /// Artificial delay applied to every API request, in milliseconds.
    pub latency_ms: u64,
    pub enforce_roles: bool,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            latency_ms: 300,
            enforce_roles: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Load the demo users, clients and cases at startup.
    pub seed: bool,
    pub page_limit_default: usize,
    pub page_limit_max: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            seed: true,
            page_limit_default: 100,
            page_limit_max: 1000,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&raw, &path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let settings = Settings::from_toml_str("[gateway]\nport = 9100\n", "inline")
            .expect("partial settings parse");
        assert_eq!(settings.gateway.port, 9100);
        assert_eq!(settings.gateway.host, "127.0.0.1");
        assert_eq!(settings.store, StoreSettings::default());
    }

    #[test]
    fn load_reads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[store]\nseed = false\npage_limit_default = 25").expect("write");

        let settings = Settings::load(Some(file.path())).expect("load");
        assert!(!settings.store.seed);
        assert_eq!(settings.store.page_limit_default, 25);
        assert_eq!(settings.store.page_limit_max, 1000);
    }

    #[test]
    fn load_without_path_is_default() {
        assert_eq!(Settings::load(None).expect("defaults"), Settings::default());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let err = Settings::from_toml_str("[gateway\nport = ", "broken.toml").expect_err("bad");
        let ConfigError::Parse { path, .. } = err else {
            panic!("expected Parse");
        };
        assert_eq!(path, "broken.toml");
    }
}
