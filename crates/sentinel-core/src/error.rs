// ── Core error types ──
//
// User-facing errors from sentinel-core. None of these is fatal: every
// failure degrades to "retain last known good state" and optionally
// surfaces a notification. The `From<sentinel_api::Error>` impl maps
// transport failures onto the poll taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Polling ──────────────────────────────────────────────────────
    /// The status poll failed; the fleet keeps its previous state.
    #[error("Status poll failed: {message}")]
    Fetch { message: String },

    // ── Storage ──────────────────────────────────────────────────────
    /// Reading or writing the settings blob failed; memory stays authoritative.
    #[error("Settings storage failed: {message}")]
    Persistence { message: String },

    // ── Input ────────────────────────────────────────────────────────
    /// Rejected before any mutation took place.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    // ── Alerts ───────────────────────────────────────────────────────
    #[error("Notification delivery failed: {message}")]
    Notification { message: String },
}

impl CoreError {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn persistence(message: impl std::fmt::Display) -> Self {
        Self::Persistence {
            message: message.to_string(),
        }
    }

    /// Map an API error raised while delivering an alert.
    pub(crate) fn notification(err: &sentinel_api::Error) -> Self {
        Self::Notification {
            message: err.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sentinel_api::Error> for CoreError {
    fn from(err: sentinel_api::Error) -> Self {
        match err {
            sentinel_api::Error::Transport(ref e) if e.is_timeout() => CoreError::Fetch {
                message: "status endpoint timed out".into(),
            },
            sentinel_api::Error::Transport(ref e) if e.is_connect() => CoreError::Fetch {
                message: format!(
                    "cannot reach {}: {e}",
                    e.url().map_or_else(|| "<unknown>".into(), ToString::to_string)
                ),
            },
            sentinel_api::Error::Api { status, message } => CoreError::Fetch {
                message: format!("HTTP {status}: {message}"),
            },
            sentinel_api::Error::Deserialization { message, body: _ } => CoreError::Fetch {
                message: format!("unexpected response: {message}"),
            },
            sentinel_api::Error::Telegram { .. } => CoreError::notification(&err),
            other => CoreError::Fetch {
                message: other.to_string(),
            },
        }
    }
}
