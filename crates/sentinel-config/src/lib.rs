//! Process configuration for the `sentinel` binary.
//!
//! Where status comes from, where settings are stored, how long toasts
//! stay up, and which services the fleet runs. Layered with figment:
//! built-in defaults, then the TOML file, then `SENTINEL_*` environment
//! variables (`__` separates nested keys).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sentinel_api::{TlsMode, TransportConfig};
use sentinel_core::Inventory;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Torrent clients and downloaders, joined to hosts by IP.
    #[serde(default)]
    pub inventory: Inventory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Built-in three-host fleet with a flapping host.
    #[default]
    Simulated,
    /// `GET {apiEndpoint}/fleet/status`.
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub mode: SourceMode,

    /// HTTP request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept self-signed certificates from the fleet API.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// Artificial latency of the simulated source, milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
            latency_ms: default_latency_ms(),
        }
    }
}

impl SourceConfig {
    pub fn transport(&self) -> TransportConfig {
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        };
        TransportConfig {
            tls,
            timeout: Duration::from_secs(self.timeout),
        }
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_latency_ms() -> u64 {
    250
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Where the settings blob lives. Platform data dir when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Quiet period before settings are written, milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub autosave_debounce_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            autosave_debounce_ms: default_debounce_ms(),
        }
    }
}

impl StorageConfig {
    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Configured data directory, or the platform default.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(data_dir)
    }
}

fn default_debounce_ms() -> u64 {
    500
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NotificationsConfig {
    /// How long a toast stays up, milliseconds.
    #[serde(default = "default_toast_ms")]
    pub toast_duration_ms: u64,

    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            toast_duration_ms: default_toast_ms(),
            telegram_api_base: default_telegram_api_base(),
        }
    }
}

impl NotificationsConfig {
    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }
}

fn default_toast_ms() -> u64 {
    3000
}
fn default_telegram_api_base() -> String {
    sentinel_api::telegram::DEFAULT_API_BASE.into()
}

impl Config {
    /// Reject values that would make the process misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "source.timeout".into(),
                reason: "must be at least one second".into(),
            });
        }
        if self.notifications.toast_duration_ms == 0 {
            return Err(ConfigError::Validation {
                field: "notifications.toast_duration_ms".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "fleet-sentinel", "sentinel")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Platform data directory holding the settings blob.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("sentinel");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SENTINEL_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if anything goes wrong.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_without_file_or_env() {
        Jail::expect_with(|jail| {
            let config = load_config_from(&jail.directory().join("missing.toml")).unwrap();
            assert_eq!(config, Config::default());
            assert_eq!(config.source.mode, SourceMode::Simulated);
            assert_eq!(config.source.latency(), Duration::from_millis(250));
            assert_eq!(config.storage.autosave_debounce(), Duration::from_millis(500));
            assert_eq!(config.notifications.toast_duration(), Duration::from_secs(3));
            Ok(())
        });
    }

    #[test]
    fn file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [source]
                mode = "http"
                timeout = 5

                [[inventory.torrent_clients]]
                ip = "10.0.0.1"
                vpsName = "VPS-DE-01"
                status = "ONLINE"
                "#,
            )?;
            jail.set_env("SENTINEL_SOURCE__TIMEOUT", "9");
            jail.set_env("SENTINEL_STORAGE__AUTOSAVE_DEBOUNCE_MS", "50");

            let config = load_config_from(&jail.directory().join("config.toml")).unwrap();
            assert_eq!(config.source.mode, SourceMode::Http);
            assert_eq!(config.source.timeout, 9);
            assert_eq!(config.storage.autosave_debounce_ms, 50);
            assert_eq!(config.inventory.torrent_clients.len(), 1);
            Ok(())
        });
    }

    #[test]
    fn zero_timeout_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("SENTINEL_SOURCE__TIMEOUT", "0");
            let err = load_config_from(&jail.directory().join("none.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { .. }));
            Ok(())
        });
    }

    #[test]
    fn insecure_wins_over_custom_ca() {
        let source = SourceConfig {
            insecure: true,
            ca_cert: Some("/etc/ca.pem".into()),
            ..SourceConfig::default()
        };
        assert!(matches!(source.transport().tls, TlsMode::DangerAcceptInvalid));
        assert!(matches!(SourceConfig::default().transport().tls, TlsMode::System));
    }

    #[test]
    fn saved_config_loads_back() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("nested/config.toml");
            let mut config = Config::default();
            config.source.mode = SourceMode::Http;
            config.storage.data_dir = Some(jail.directory().join("data"));

            save_config_to(&config, &path).unwrap();
            let text = std::fs::read_to_string(&path).unwrap();
            assert!(text.contains("mode = \"http\""));
            assert_eq!(load_config_from(&path).unwrap(), config);
            Ok(())
        });
    }
}
