use thiserror::Error;

/// Top-level error type for the `myuplink-api` crate.
///
/// Covers every failure mode across the startup prerequisites, the OAuth
/// session, and the API calls themselves. The binary maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Prerequisites ───────────────────────────────────────────────
    /// Neither the environment nor the config file yielded a usable
    /// client id / client secret pair.
    #[error("client credentials not found: {reason}")]
    MissingCredentials { reason: String },

    /// The persisted OAuth token is missing or unreadable.
    #[error("OAuth token not available: {reason}")]
    MissingToken { reason: String },

    // ── Authentication ──────────────────────────────────────────────
    /// Token refresh failed (rejected by the token endpoint, or the
    /// refresh request itself could not be sent).
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// The API rejected the access token (HTTP 401). Recoverable:
    /// drives the single refresh-and-retry in [`Session`](crate::Session).
    #[error("access token expired or rejected")]
    TokenExpired,

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success response from the myUplink API.
    #[error("myUplink API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Persistence ─────────────────────────────────────────────────
    /// Writing the refreshed token back to disk failed.
    #[error("failed to persist token: {0}")]
    TokenWrite(#[source] std::io::Error),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the access token was
    /// rejected and a refresh might resolve it.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::TokenExpired)
    }

    /// Returns `true` for errors that should stop the process before
    /// any network I/O is attempted.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials { .. } | Self::MissingToken { .. }
        )
    }

    /// Returns `true` if this is a transient failure worth retrying on
    /// the next poll cycle (timeouts, connection resets).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
