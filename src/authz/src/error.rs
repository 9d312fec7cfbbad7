//! Error types for policy resolution

use thiserror::Error;

use crate::denial::Denial;

/// Coarse classification of an [`AuthzError`], mirroring the status codes a
/// transport layer would surface to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PermissionDenied,
    NotFound,
    Cancelled,
    DeadlineExceeded,
    FailedPrecondition,
    InvalidArgument,
    Unavailable,
    Internal,
}

/// Policy resolution errors
#[derive(Debug, Clone, Error)]
pub enum AuthzError {
    /// No policy exists for the resource
    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    /// Remote policy authority failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Lookup abandoned because the call context was cancelled
    #[error("Lookup cancelled")]
    Cancelled,

    /// Lookup did not finish before the call deadline
    #[error("Lookup deadline exceeded")]
    DeadlineExceeded,

    /// The same resource was listed twice for one fetcher
    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    /// Resolution was triggered more than once
    #[error("Policy fetch already started")]
    AlreadyStarted,

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Caller lacks the roles required for the method
    #[error("Permission denied: {0}")]
    PermissionDenied(Denial),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthzError::PolicyNotFound(_) => ErrorKind::NotFound,
            AuthzError::Transport(_) => ErrorKind::Unavailable,
            AuthzError::Cancelled => ErrorKind::Cancelled,
            AuthzError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            AuthzError::DuplicateResource(_) | AuthzError::AlreadyStarted => {
                ErrorKind::FailedPrecondition
            }
            AuthzError::InvalidConfig(_) => ErrorKind::InvalidArgument,
            AuthzError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            AuthzError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for errors that indicate misuse of a fetcher rather than a lookup failure
    pub fn is_precondition(&self) -> bool {
        self.kind() == ErrorKind::FailedPrecondition
    }
}

/// Result type for policy resolution
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(AuthzError::PolicyNotFound("a".into()).kind(), ErrorKind::NotFound);
        assert_eq!(AuthzError::Cancelled.kind(), ErrorKind::Cancelled);
        assert!(AuthzError::AlreadyStarted.is_precondition());
        assert!(AuthzError::DuplicateResource("a".into()).is_precondition());
        assert!(!AuthzError::Transport("boom".into()).is_precondition());
    }
}
