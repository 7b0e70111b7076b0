//! Configuration management for AuditPulse.
//!
//! Loads configuration from ${AUDITPULSE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the configured API base address.
pub const API_URL_ENV: &str = "AUDITPULSE_API_URL";

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for AuditPulse configuration and data files.
    //!
    //! AUDITPULSE_HOME resolution order:
    //! 1. AUDITPULSE_HOME environment variable (if set)
    //! 2. ~/.config/auditpulse (default)

    use std::path::PathBuf;

    pub fn home() -> PathBuf {
        if let Ok(home) = std::env::var("AUDITPULSE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("auditpulse"))
            .unwrap_or_else(|| PathBuf::from(".auditpulse"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        home().join("config.toml")
    }

    /// Returns the path to the durable client storage file (token, locale).
    pub fn storage_path() -> PathBuf {
        home().join("storage.json")
    }

    pub fn log_dir() -> PathBuf {
        home().join("logs")
    }
}

/// Retry behavior for failed status fetches while polling an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollRetryConfig {
    /// Consecutive failed fetches to retry before polling stops.
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds; doubles per attempt.
    pub backoff_ms: u64,
}

impl Default for PollRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            backoff_ms: 1000,
        }
    }
}

impl PollRetryConfig {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// File name inside the log directory. Logs go to stderr when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base address of the REST API.
    pub api_url: String,
    /// Delay between polls of a non-terminal audit, in milliseconds.
    pub poll_interval_ms: u64,
    /// Interface locale used when none was saved.
    pub default_locale: String,
    pub poll_retry: PollRetryConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            default_locale: Self::DEFAULT_LOCALE.to_string(),
            poll_retry: PollRetryConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 4000;
    pub const DEFAULT_LOCALE: &str = "en";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config at {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be at least 1");
        }
        Ok(())
    }

    /// Resolves the API base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL is not a valid absolute URL.
    pub fn api_base_url(&self) -> Result<String> {
        let from_env = std::env::var(API_URL_ENV).ok();
        resolve_base_url(from_env.as_deref(), Some(&self.api_url))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Writes the default config template to `path`.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

/// Picks the first non-empty candidate (env, then config) or the default.
fn resolve_base_url(env_url: Option<&str>, config_url: Option<&str>) -> Result<String> {
    let chosen = [env_url, config_url]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty());

    match chosen {
        Some(url) => {
            url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
            Ok(url.trim_end_matches('/').to_string())
        }
        None => Ok(Config::DEFAULT_API_URL.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.poll_interval(), Duration::from_millis(4000));
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_interval_ms = 250\n[poll_retry]\nmax_attempts = 3\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.poll_retry.max_attempts, 3);
        assert_eq!(config.poll_retry.backoff_ms, 1000);
        assert_eq!(config.api_url, Config::DEFAULT_API_URL);
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_interval_ms = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("poll_interval_ms must be at least 1"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::init(&path).unwrap();
        assert!(path.exists());
        let err = Config::init(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_base_url_precedence() {
        assert_eq!(
            resolve_base_url(Some("http://env:1/api/"), Some("http://cfg:2")).unwrap(),
            "http://env:1/api"
        );
        assert_eq!(
            resolve_base_url(Some("  "), Some("http://cfg:2")).unwrap(),
            "http://cfg:2"
        );
        assert_eq!(resolve_base_url(None, None).unwrap(), Config::DEFAULT_API_URL);
        assert!(resolve_base_url(None, Some("not a url")).is_err());
    }

    #[test]
    fn test_retry_backoff_doubles() {
        let retry = PollRetryConfig {
            max_attempts: 3,
            backoff_ms: 500,
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(500));
        assert_eq!(retry.backoff(2), Duration::from_millis(1000));
        assert_eq!(retry.backoff(3), Duration::from_millis(2000));
    }
}
