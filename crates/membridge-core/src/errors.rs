//! Error hierarchy for the memory-bridge subsystem.
//!
//! Five categories, per the error handling design:
//!
//! - [`MemoryError::Transport`] — network / 5xx / timeout. Retriable.
//! - [`MemoryError::Protocol`] — malformed envelope, non-JSON body. Not retriable.
//! - [`MemoryError::Policy`] — fs write policy gate rule fired. Not retriable.
//! - [`MemoryError::Config`] — backend disabled, missing linkage. Not retriable.
//! - [`MemoryError::Validation`] — empty query/content, bad field. Not retriable.
//!
//! `is_retryable()` is the single source of truth the Outbox consults before
//! scheduling a retry; nothing else should decide retryability ad hoc.

use thiserror::Error;

/// Top-level error type for the memory-bridge subsystem.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Network failure, timeout, or 5xx response from the store.
    #[error("store request failed: {0}")]
    Transport(String),

    /// The store responded but its envelope was malformed or carried
    /// `status: "error"`.
    #[error("store protocol error: {0}")]
    Protocol(String),

    /// An fs write policy gate rule fired.
    #[error("fs write denied: {0}")]
    Policy(String),

    /// The subsystem is not configured to act (backend disabled, no
    /// session linkage, dual-write off).
    #[error("memory bridge not configured: {0}")]
    Config(String),

    /// A caller-supplied value failed validation (empty query, bad role, …).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl MemoryError {
    /// Whether this error should be retried by the outbox's backoff loop.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Build a [`MemoryError`] from the store's error envelope, preferring
    /// `error.message`, then the raw body, then the HTTP status text.
    /// `retryable` should reflect the HTTP status the envelope came with
    /// (5xx/429): when true this produces [`MemoryError::Transport`],
    /// otherwise [`MemoryError::Protocol`].
    #[must_use]
    pub fn from_envelope(message: Option<&str>, raw_body: &str, status_text: &str, retryable: bool) -> Self {
        let text = message
            .filter(|m| !m.is_empty())
            .or_else(|| (!raw_body.is_empty()).then_some(raw_body))
            .unwrap_or(status_text);
        if retryable {
            Self::Transport(text.to_owned())
        } else {
            Self::Protocol(text.to_owned())
        }
    }
}

impl From<reqwest::Error> for MemoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Self::Transport(err.to_string());
        }
        if let Some(status) = err.status() {
            if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Self::Transport(err.to_string());
            }
        }
        Self::Protocol(err.to_string())
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(format!("invalid json: {err}"))
    }
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(format!("io error: {err}"))
    }
}
