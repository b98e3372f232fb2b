use thiserror::Error;

/// Top-level error type for the `sentinel-api` crate.
///
/// Covers every failure mode of the HTTP surfaces this crate talks to:
/// the fleet status endpoint and the Telegram Bot API.
/// `sentinel-core` maps these into its own error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Fleet endpoint ──────────────────────────────────────────────
    /// Non-success status from the fleet status endpoint.
    #[error("Fleet API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Telegram ────────────────────────────────────────────────────
    /// The Bot API answered with `ok: false`.
    #[error("Telegram API error: {message}")]
    Telegram {
        message: String,
        code: Option<u16>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            Self::Telegram { code, .. } => *code == Some(429),
            _ => false,
        }
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            Self::Telegram { code, .. } => *code,
            _ => None,
        }
    }
}
