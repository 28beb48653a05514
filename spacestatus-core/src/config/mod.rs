//! Process-wide configuration, loaded once at startup
//!
//! [`AppConfig`] is created once in `main` and passed by reference to
//! every component that needs it; there is no hidden global lookup.
//! The file format is TOML: a `hosts` table mapping each tenant
//! hostname to its status document file, API key and per-host plugin
//! fragments, plus a `plugins` table of global plugin fragments.
//!
//! ```toml
//! [hosts."status.example.org"]
//! file = "example.json"
//! key = "supersecret"
//!
//! [hosts."status.example.org".plugins.microblog]
//! enabled = true
//! access_token = "..."
//!
//! [plugins.microblog]
//! base_url = "https://social.example.org"
//! ```

mod merge;
mod resolver;

pub use merge::deep_merge;
pub use resolver::{ConfigValidationError, MissingKey, resolve};

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use toml::Value;

/// Errors raised while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration is not valid: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// One tenant entry in the `hosts` table
#[derive(Debug, Clone, Deserialize)]
pub struct HostEntry {
    /// Status document file name, relative to the data directory
    pub file: String,
    /// API key the sensor gateway must present for writes
    pub key: String,
    /// Per-host plugin configuration fragments
    #[serde(default)]
    pub plugins: toml::Table,
}

/// The parsed process configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    hosts: BTreeMap<String, HostEntry>,
    #[serde(default)]
    plugins: toml::Table,
}

impl AppConfig {
    /// Parse configuration from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        if config.hosts.is_empty() {
            return Err(ConfigError::Invalid(vec!["no hosts defined".to_string()]));
        }
        Ok(config)
    }

    /// Load and validate the configuration file.
    ///
    /// Every host's status document file must exist under `data_dir`.
    /// All validation errors are collected before failing so a broken
    /// config is reported in one pass.
    pub fn load(path: &Path, data_dir: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;

        let mut errors = Vec::new();
        for (host, entry) in &config.hosts {
            if !data_dir.join(&entry.file).is_file() {
                errors.push(format!("status document for {host} does not exist"));
            }
        }
        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }

        Ok(config)
    }

    /// Iterator over configured hostnames
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }

    /// Iterator over (hostname, status document file name) pairs
    pub fn host_files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.hosts
            .iter()
            .map(|(host, entry)| (host.as_str(), entry.file.as_str()))
    }

    /// API key for a host
    pub fn api_key(&self, host: &str) -> Option<&str> {
        self.hosts.get(host).map(|entry| entry.key.as_str())
    }

    /// Global configuration fragment for one plugin, or an empty table.
    pub fn plugin_global(&self, plugin: &str) -> Value {
        self.plugins
            .get(plugin)
            .cloned()
            .unwrap_or_else(|| Value::Table(toml::Table::new()))
    }

    /// Per-host configuration fragments for one plugin.
    ///
    /// Every configured host appears in the result; hosts without a
    /// fragment for this plugin get an empty table so the resolver can
    /// still consider them via the global fragment.
    pub fn plugin_host_fragments(&self, plugin: &str) -> BTreeMap<String, Value> {
        self.hosts
            .iter()
            .map(|(host, entry)| {
                let fragment = entry
                    .plugins
                    .get(plugin)
                    .cloned()
                    .unwrap_or_else(|| Value::Table(toml::Table::new()));
                (host.clone(), fragment)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [hosts."status.example.org"]
        file = "example.json"
        key = "supersecret"

        [hosts."status.example.org".plugins.microblog]
        enabled = true
        access_token = "host-token"

        [hosts."status.other.org"]
        file = "other.json"
        key = "alsosecret"

        [plugins.microblog]
        base_url = "https://social.example.org"
    "#;

    #[test]
    fn test_from_toml_parses_hosts() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        let hosts: Vec<&str> = config.hosts().collect();
        assert_eq!(hosts, vec!["status.example.org", "status.other.org"]);
        assert_eq!(config.api_key("status.example.org"), Some("supersecret"));
    }

    #[test]
    fn test_from_toml_requires_hosts() {
        // An absent hosts table reports the same error as an empty one
        let err = AppConfig::from_toml("[plugins]").unwrap_err();
        assert!(err.to_string().contains("no hosts defined"));

        let err = AppConfig::from_toml("").unwrap_err();
        assert!(err.to_string().contains("no hosts defined"));
    }

    #[test]
    fn test_host_entry_requires_file_and_key() {
        assert!(AppConfig::from_toml("[hosts.\"h1\"]\nfile = \"h1.json\"").is_err());
    }

    #[test]
    fn test_plugin_global_fragment() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        let global = config.plugin_global("microblog");
        assert_eq!(
            global.get("base_url").and_then(Value::as_str),
            Some("https://social.example.org")
        );

        // Unknown plugins resolve to an empty table
        assert!(config.plugin_global("missing").as_table().unwrap().is_empty());
    }

    #[test]
    fn test_plugin_host_fragments_cover_all_hosts() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        let fragments = config.plugin_host_fragments("microblog");

        assert_eq!(fragments.len(), 2);
        let with_fragment = fragments.get("status.example.org").unwrap();
        assert_eq!(
            with_fragment.get("access_token").and_then(Value::as_str),
            Some("host-token")
        );
        let without = fragments.get("status.other.org").unwrap();
        assert!(without.as_table().unwrap().is_empty());
    }

    #[test]
    fn test_load_checks_status_documents_exist() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, SAMPLE).unwrap();
        std::fs::write(dir.path().join("example.json"), "{}").unwrap();

        // other.json is missing
        let err = AppConfig::load(&config_path, dir.path()).unwrap_err();
        assert!(err.to_string().contains("status.other.org"));

        std::fs::write(dir.path().join("other.json"), "{}").unwrap();
        assert!(AppConfig::load(&config_path, dir.path()).is_ok());
    }
}
