//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use sentinel_config::ConfigError;
use sentinel_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Polling ──────────────────────────────────────────────────────
    #[error("Could not read fleet status from {source_name}: {message}")]
    #[diagnostic(
        code(sentinel::fetch_failed),
        help(
            "Check the status endpoint with: sentinel integrations show\n\
             Or try the built-in fleet with --simulate"
        )
    )]
    FetchFailed { source_name: String, message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(sentinel::not_found),
        help("Run: sentinel {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(code(sentinel::conflict), help("{hint}"))]
    Conflict { message: String, hint: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sentinel::validation))]
    Validation { field: String, reason: String },

    // ── Storage / alerts ─────────────────────────────────────────────
    #[error("Could not save settings: {message}")]
    #[diagnostic(
        code(sentinel::persistence),
        help("Check that the data directory is writable, or pass --data-dir.")
    )]
    Persistence { message: String },

    #[error("Notification failed: {message}")]
    #[diagnostic(
        code(sentinel::notification),
        help("Verify the bot token and chat id with: sentinel notify show")
    )]
    Notification { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists at {path}")]
    #[diagnostic(code(sentinel::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(sentinel::config))]
    Config(Box<figment::Error>),

    #[error("Could not write configuration: {0}")]
    #[diagnostic(code(sentinel::config_write))]
    ConfigWrite(#[from] toml::ser::Error),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(sentinel::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    #[diagnostic(code(sentinel::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FetchFailed { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Name the source a fetch failure came from.
    pub fn with_source(self, name: String) -> Self {
        match self {
            Self::FetchFailed { message, .. } => Self::FetchFailed {
                source_name: name,
                message,
            },
            other => other,
        }
    }

    pub fn host_not_found(ip: &str) -> Self {
        Self::NotFound {
            resource_type: "host".into(),
            identifier: ip.into(),
            list_command: "status".into(),
        }
    }

    pub fn account_not_found(id: u32) -> Self {
        Self::NotFound {
            resource_type: "account".into(),
            identifier: id.to_string(),
            list_command: "accounts list".into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Fetch { message } => CliError::FetchFailed {
                source_name: "the status source".into(),
                message,
            },
            CoreError::Persistence { message } => CliError::Persistence { message },
            CoreError::Validation { field, message } => CliError::Validation {
                field,
                reason: message,
            },
            CoreError::Notification { message } => CliError::Notification { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(inner) => CliError::Config(inner),
            ConfigError::Serialization(inner) => CliError::ConfigWrite(inner),
            ConfigError::Io(inner) => CliError::Io(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let fetch: CliError = CoreError::Fetch {
            message: "HTTP 502".into(),
        }
        .into();
        assert_eq!(fetch.exit_code(), exit_code::CONNECTION);

        let invalid: CliError = CoreError::Validation {
            field: "interval".into(),
            message: "must be at least one second".into(),
        }
        .into();
        assert_eq!(invalid.exit_code(), exit_code::USAGE);
        assert_eq!(
            invalid.to_string(),
            "Invalid value for interval: must be at least one second"
        );
    }

    #[test]
    fn missing_host_points_at_status() {
        let err = CliError::host_not_found("10.9.9.9");
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(err.to_string(), "host '10.9.9.9' not found");
    }
}
