//! Voice backend error types

use thiserror::Error;

/// Voice error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct VoiceError {
    pub kind: VoiceErrorKind,
    pub message: String,
}

impl VoiceError {
    pub fn new(kind: VoiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(VoiceErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(VoiceErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(VoiceErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(VoiceErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(VoiceErrorKind::InvalidRequest, message)
    }

    pub fn not_connected(message: impl Into<String>) -> Self {
        Self::new(VoiceErrorKind::NotConnected, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(VoiceErrorKind::Unknown, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Missing or rejected credentials (401, 403)
    Auth,
    /// Bad request (400) or unknown tool
    InvalidRequest,
    /// No live session to deliver to
    NotConnected,
    /// Unknown error
    Unknown,
}

impl VoiceErrorKind {
    /// Whether retrying the same request might succeed. Retrying is left to
    /// the user; this only shapes what gets logged.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}
