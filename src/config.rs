//! Autosave configuration.
//!
//! Provides three loading methods:
//! - `default_config()` - Loads the defaults compiled into the library
//! - `load_config(path)` - Loads a custom configuration from a TOML file
//! - `load_or_default()` - Loads the user's config file if present, else defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::autosave::RetryPolicy;

/// Defaults embedded at compile time from `config/autosave.toml`.
const DEFAULT_CONFIG: &str = include_str!("../config/autosave.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    pub server: ServerConfig,
    pub save: SaveConfig,
    pub conflict: ConflictConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Root of the planner backend; `api/...` paths are joined onto it.
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveConfig {
    pub debounce_ms: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    /// 0 disables the periodic save.
    #[serde(default)]
    pub periodic_save_secs: u64,
    pub saved_indicator_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictConfig {
    pub poll_interval_secs: u64,
    pub stale_threshold_secs: u64,
    pub cooldown_secs: u64,
}

impl AutosaveConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AutosaveConfig =
            toml::from_str(content).context("Failed to parse autosave config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.save.max_attempts == 0 {
            bail!("save.max_attempts must be at least 1");
        }
        if self.save.debounce_ms == 0 {
            bail!("save.debounce_ms must be greater than zero");
        }
        if self.conflict.poll_interval_secs == 0 {
            bail!("conflict.poll_interval_secs must be greater than zero");
        }
        if self.server.base_url.trim().is_empty() {
            bail!("server.base_url must not be empty");
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.save.debounce_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.save.max_attempts,
            Duration::from_millis(self.save.retry_base_delay_ms),
        )
    }

    pub fn periodic_save(&self) -> Option<Duration> {
        (self.save.periodic_save_secs > 0).then(|| Duration::from_secs(self.save.periodic_save_secs))
    }

    pub fn saved_indicator(&self) -> Duration {
        Duration::from_millis(self.save.saved_indicator_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn conflict_poll_interval(&self) -> Duration {
        Duration::from_secs(self.conflict.poll_interval_secs)
    }

    pub fn stale_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.conflict.stale_threshold_secs as i64)
    }

    pub fn conflict_cooldown(&self) -> Duration {
        Duration::from_secs(self.conflict.cooldown_secs)
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        default_config()
    }
}

/// Get the configuration embedded in the library.
///
/// # Panics
/// Panics if the embedded TOML is invalid (a build-time bug).
pub fn default_config() -> AutosaveConfig {
    AutosaveConfig::from_toml(DEFAULT_CONFIG).expect("embedded autosave.toml must be valid")
}

/// Load a configuration from a TOML file at the given path.
pub fn load_config(path: &Path) -> Result<AutosaveConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config = AutosaveConfig::from_toml(&content)
        .with_context(|| format!("Invalid config file {:?}", path))?;
    info!("Loaded autosave config from {:?}", path);
    Ok(config)
}

/// Location of the user's config file, e.g. `~/.config/dayplan/autosave.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dayplan").join("autosave.toml"))
}

/// Load the user's config file if one exists, otherwise the embedded defaults.
/// A config file that exists but fails to parse is an error.
pub fn load_or_default() -> Result<AutosaveConfig> {
    match config_path() {
        Some(path) if path.exists() => load_config(&path),
        Some(path) => {
            debug!("No config at {:?}, using defaults", path);
            Ok(default_config())
        }
        None => {
            debug!("No config directory on this platform, using defaults");
            Ok(default_config())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_loads() {
        let config = default_config();
        assert_eq!(config.debounce(), Duration::from_secs(2));
        assert_eq!(config.save.max_attempts, 3);
        assert_eq!(config.periodic_save(), Some(Duration::from_secs(120)));
        assert_eq!(config.saved_indicator(), Duration::from_secs(3));
        assert_eq!(config.conflict_poll_interval(), Duration::from_secs(300));
        assert_eq!(config.stale_threshold(), chrono::Duration::minutes(5));
        assert_eq!(config.conflict_cooldown(), Duration::from_secs(3600));
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = default_config().retry_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_before_retry(1), Duration::from_secs(2));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("autosave.toml");
        let custom = DEFAULT_CONFIG
            .replace("debounce_ms = 2000", "debounce_ms = 10000")
            .replace("periodic_save_secs = 120", "periodic_save_secs = 0");
        std::fs::write(&path, custom).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.debounce(), Duration::from_secs(10));
        assert_eq!(config.periodic_save(), None);
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_config(&dir.path().join("nope.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let bad = DEFAULT_CONFIG.replace("max_attempts = 3", "max_attempts = 0");
        let err = AutosaveConfig::from_toml(&bad).unwrap_err();
        assert!(err.to_string().contains("max_attempts"), "{}", err);
    }

    #[test]
    fn test_zero_debounce_rejected() {
        let bad = DEFAULT_CONFIG.replace("debounce_ms = 2000", "debounce_ms = 0");
        assert!(AutosaveConfig::from_toml(&bad).is_err());
    }

    #[test]
    fn test_config_path_ends_with_app_dir() {
        if let Some(path) = config_path() {
            assert!(path.ends_with("dayplan/autosave.toml"));
        }
    }
}
