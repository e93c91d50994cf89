//! Configuration management for the prayer admin dashboard

use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::{Error, Result, types::Theme};

/// Environment variable prefix, e.g. `PRAYER_ADMIN_BACKEND__URL`
pub const ENV_PREFIX: &str = "PRAYER_ADMIN";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hosted backend connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Connection heartbeat
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Dashboard presentation
    #[serde(default)]
    pub ui: UiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend-as-a-service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Public (anon) API key sent with every request
    #[serde(default)]
    pub anon_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

/// Heartbeat probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Seconds between probes
    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,

    /// Probe timeout in milliseconds
    #[serde(default = "default_heartbeat_timeout")]
    pub timeout_ms: u64,

    /// Table read by the probe
    #[serde(default = "default_probe_table")]
    pub probe_table: String,
}

/// Presentation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// Initial theme
    #[serde(default)]
    pub theme: Theme,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json or pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_backend_url() -> String {
    "http://localhost:54321".to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_heartbeat_interval() -> u64 {
    30
}

const fn default_heartbeat_timeout() -> u64 {
    5_000
}

fn default_probe_table() -> String {
    "prayers".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            anon_key: String::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_heartbeat_interval(),
            timeout_ms: default_heartbeat_timeout(),
            probe_table: default_probe_table(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl BackendConfig {
    /// Request timeout as a duration
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl HeartbeatConfig {
    /// Interval between probes
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Bound on a single probe
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LoggingConfig {
    /// Whether JSON output was requested
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from `config.toml` (if present) and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file plus the environment.
    ///
    /// Without a path, an optional `config` file in the working directory is
    /// used. Environment variables use the `PRAYER_ADMIN` prefix and `__` as
    /// the section separator.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, a value fails to parse, or
    /// the result does not validate.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("config").required(false),
        };

        let config: Self = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::configuration(format!(
                "backend.url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.backend.request_timeout == 0 {
            return Err(Error::configuration("backend.request_timeout must be positive"));
        }
        if self.heartbeat.interval_secs == 0 {
            return Err(Error::configuration("heartbeat.interval_secs must be positive"));
        }
        if self.heartbeat.timeout_ms == 0 {
            return Err(Error::configuration("heartbeat.timeout_ms must be positive"));
        }
        if self.heartbeat.probe_table.trim().is_empty() {
            return Err(Error::configuration("heartbeat.probe_table must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::field_reassign_with_default
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.backend.url, "http://localhost:54321");
        assert!(config.backend.anon_key.is_empty());
        assert_eq!(config.backend.request_timeout(), Duration::from_secs(30));

        assert_eq!(config.heartbeat.interval(), Duration::from_secs(30));
        assert_eq!(config.heartbeat.timeout(), Duration::from_millis(5_000));
        assert_eq!(config.heartbeat.probe_table, "prayers");

        assert_eq!(config.ui.theme, Theme::Light);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.is_json());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_deserialization() {
        let json_str = r#"{
            "backend": {"url": "https://abc.supabase.co/", "anon_key": "public-key"},
            "ui": {"theme": "dark"}
        }"#;

        let config: Config = serde_json::from_str(json_str).unwrap();

        assert_eq!(config.backend.base_url(), "https://abc.supabase.co");
        assert_eq!(config.backend.anon_key, "public-key");
        assert_eq!(config.backend.request_timeout, 30);
        assert_eq!(config.heartbeat.interval_secs, 30);
        assert_eq!(config.ui.theme, Theme::Dark);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.backend.url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.heartbeat.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.heartbeat.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.heartbeat.probe_table = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[backend]
url = "https://project.example.co"
anon_key = "anon"

[heartbeat]
interval_secs = 10
timeout_ms = 1500
probe_table = "prayer_types"

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();

        assert_eq!(config.backend.url, "https://project.example.co");
        assert_eq!(config.heartbeat.interval(), Duration::from_secs(10));
        assert_eq!(config.heartbeat.timeout(), Duration::from_millis(1500));
        assert_eq!(config.heartbeat.probe_table, "prayer_types");
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let result = Config::load_from(Some(Path::new("/nonexistent/prayer-admin.toml")));
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }
}
