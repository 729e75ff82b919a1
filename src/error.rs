//! Error types shared by every session operation.

use thiserror::Error;

/// The coarse category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before any network call was made.
    Validation,
    /// The server rejected the credentials.
    Unauthorized,
    /// The request could not complete.
    Network,
    /// Non-2xx response (or an unusable 2xx body) from the server.
    ServerError,
    /// A newer transition (usually a logout) made this result stale.
    Superseded,
}

/// Failure of an auth operation. The display text is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    ServerError(String),
    #[error("result discarded: session changed while the request was in flight")]
    Superseded,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::Unauthorized(_) => ErrorKind::Unauthorized,
            AuthError::Network(_) => ErrorKind::Network,
            AuthError::ServerError(_) => ErrorKind::ServerError,
            AuthError::Superseded => ErrorKind::Superseded,
        }
    }

    /// True when the failure means the held credential can no longer be trusted.
    pub fn invalidates_credential(&self) -> bool {
        matches!(self, AuthError::Unauthorized(_) | AuthError::ServerError(_))
    }
}
