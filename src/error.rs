//! Error types for the fishing client

use thiserror::Error;

use crate::session::state::{ActionKind, Phase};

/// Errors surfaced to the embedding UI
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FishingError {
    /// The cast request failed; the session is back to walking
    #[error("cast failed: {0}")]
    CastFailed(String),

    /// The catch or miss-report request failed; no result is kept
    #[error("catch failed: {0}")]
    CatchFailed(String),

    /// Daily quota exhausted, either reported by the server or known locally
    #[error("daily limit reached: {message}")]
    QuotaExceeded { message: String },

    /// 403-class response, message passed through verbatim
    #[error("{message}")]
    PermissionDenied { message: String },

    /// A cast was requested while a session or cast request is active
    #[error("cannot cast while {phase:?}")]
    SessionBusy { phase: Phase },

    /// The session was cancelled while the request was in flight
    #[error("session cancelled")]
    Cancelled,

    #[error("server returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FishingError {
    /// Daily quota errors, from the server or the local mirror
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, FishingError::QuotaExceeded { .. })
    }

    /// 403-class errors
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, FishingError::PermissionDenied { .. })
    }

    /// Wrap a service error from the cast call, keeping quota and
    /// permission errors intact so callers can still classify them.
    pub(crate) fn into_cast_failure(self) -> Self {
        match self {
            e @ (FishingError::QuotaExceeded { .. } | FishingError::PermissionDenied { .. }) => e,
            FishingError::CastFailed(msg) => FishingError::CastFailed(msg),
            other => FishingError::CastFailed(other.to_string()),
        }
    }

    /// Same as [`into_cast_failure`](Self::into_cast_failure) for the catch path.
    pub(crate) fn into_catch_failure(self) -> Self {
        match self {
            e @ (FishingError::QuotaExceeded { .. } | FishingError::PermissionDenied { .. }) => e,
            FishingError::CatchFailed(msg) => FishingError::CatchFailed(msg),
            other => FishingError::CatchFailed(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for FishingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FishingError::Decode(err.to_string())
        } else {
            FishingError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FishingError {
    fn from(err: serde_json::Error) -> Self {
        FishingError::Decode(err.to_string())
    }
}

/// An action arrived for a phase that does not accept it.
///
/// Only ever logged; stale timer callbacks end up here.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{action:?} rejected in phase {phase:?}")]
pub struct TransitionRejected {
    pub phase: Phase,
    pub action: ActionKind,
}
