//! Configuration system for docquery.
//!
//! This module provides the configuration structure for docquery with sensible
//! defaults and support for serialization/deserialization via serde.
//! Configuration is loaded from a TOML file and merged with command-line
//! arguments.
//!
//! # Example
//!
//! ```
//! use docquery::config::Config;
//!
//! // Use default configuration
//! let config = Config::default();
//! assert_eq!(config.embedded_path, "azepi.config");
//! assert_eq!(config.expected_provider, "any");
//!
//! // Create custom configuration
//! let custom = Config {
//!     expected_provider: "azure".to_string(),
//!     fail_fast: false,
//!     ..Config::default()
//! };
//! assert!(!custom.settings().fail_fast);
//! ```

use crate::checks::Settings;
use crate::query::FieldPath;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for docquery.
///
/// All fields have defaults via `Config::default()`, and any subset may be
/// set in the TOML file.
///
/// # Fields
///
/// * `embedded_path` - Path of the embedded document stream in captured output (default: "azepi.config")
/// * `expected_provider` - Provider every document must declare (default: "any")
/// * `timeout_secs` - Seconds a captured command may run (default: 600)
/// * `fail_fast` - Stop at the first failing check (default: true)
/// * `log_filter` - tracing filter used when `DOCQUERY_LOG` is unset (default: "warn")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path of the embedded document stream in captured output
    #[serde(default = "default_embedded_path")]
    pub embedded_path: String,

    /// Provider every document must declare
    #[serde(default = "default_expected_provider")]
    pub expected_provider: String,

    /// Seconds a captured command may run before it is killed
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Stop at the first failing check
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,

    /// tracing filter directive
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_embedded_path() -> String {
    "azepi.config".to_string()
}

fn default_expected_provider() -> String {
    "any".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_fail_fast() -> bool {
    true
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedded_path: default_embedded_path(),
            expected_provider: default_expected_provider(),
            timeout_secs: default_timeout_secs(),
            fail_fast: default_fail_fast(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Returns the path to the config file.
    ///
    /// Uses `~/.config/docquery/config.toml` on all platforms.
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::home_dir().map(|mut path| {
            path.push(".config");
            path.push("docquery");
            path.push("config.toml");
            path
        })
    }

    /// Loads configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist or can't be read.
    pub fn load() -> Self {
        let config_path = match Self::config_path() {
            Some(path) => path,
            None => return Self::default(),
        };

        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Loads configuration from an explicit path; errors are returned.
    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parses `embedded_path`.
    pub fn embedded_field_path(&self) -> crate::Result<FieldPath> {
        FieldPath::parse(&self.embedded_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check settings derived from this configuration.
    pub fn settings(&self) -> Settings {
        Settings {
            expected_provider: self.expected_provider.clone(),
            fail_fast: self.fail_fast,
        }
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_check_defaults() {
        assert_eq!(Config::default().settings(), Settings::default());
    }

    #[test]
    fn test_default_embedded_path_parses() {
        let path = Config::default().embedded_field_path().unwrap();
        assert_eq!(path.to_string(), "azepi.config");
    }

    #[test]
    fn test_timeout() {
        let config = Config {
            timeout_secs: 5,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }
}
