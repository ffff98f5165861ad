//! Configuration management for chronolog

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::SweepConfig;

/// Environment variable pointing at an alternate config file
pub const CONFIG_ENV_VAR: &str = "CHRONOLOG_CONFIG";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Address the HTTP API binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Port for the HTTP API
    #[serde(default = "default_port")]
    pub port: u16,

    /// Entries older than this many seconds are purged (default: 3600 = 1 hour)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Seconds between purge cycles (default: 60)
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,

    /// Also write the daemon's own logs to ~/.chronolog/logs/
    #[serde(default)]
    pub log_to_file: bool,

    /// Daemon log file retention in days (default: 7)
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_retention_secs() -> u64 {
    3600
}

fn default_purge_interval_secs() -> u64 {
    60
}

fn default_log_retention_days() -> u64 {
    crate::logging::DEFAULT_RETENTION_DAYS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            retention_secs: default_retention_secs(),
            purge_interval_secs: default_purge_interval_secs(),
            log_to_file: false,
            log_retention_days: default_log_retention_days(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    ///
    /// `$CHRONOLOG_CONFIG` takes precedence over `~/.chronolog/config.toml`.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path, defaulting if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Socket address for the HTTP API
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.listen_addr, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address '{}'", self.listen_addr))
    }

    /// Retention window as a duration
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Purge interval as a duration, never zero
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs.max(1))
    }

    /// Timing for the retention sweep
    pub fn sweep(&self) -> SweepConfig {
        SweepConfig {
            interval: self.purge_interval(),
            retention: self.retention(),
        }
    }
}

/// Get the base configuration directory (~/.chronolog)
/// Falls back to ./.chronolog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".chronolog")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".chronolog"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir().join("config.toml"))
}

/// Get the path to the logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.retention(), Duration::from_secs(3600));
        assert_eq!(config.purge_interval(), Duration::from_secs(60));
        assert!(!config.log_to_file);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("port = 9100\nretention_secs = 120").unwrap();
        assert_eq!(parsed.port, 9100);
        assert_eq!(parsed.retention_secs, 120);
        assert_eq!(parsed.purge_interval_secs, 60);
        assert_eq!(parsed.listen_addr, "127.0.0.1");
    }

    #[test]
    fn test_zero_purge_interval_is_clamped() {
        let config = Config {
            purge_interval_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.purge_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8000");

        let bad = Config {
            listen_addr: "not an address".to_string(),
            ..Config::default()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = Config {
            port: 9200,
            log_to_file: true,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_invalid_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".chronolog"));
    }
}
