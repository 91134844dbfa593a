//! Remote directory error types

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for a single remote directory call
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Provider error code reported by a remote directory call
///
/// Codes are mapped from the provider's error code string by exact match,
/// see [`ErrorCode::from_vendor`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The addressed user, group, policy or key does not exist
    NoSuchEntity,
    /// An entity with the same name already exists
    EntityAlreadyExists,
    /// The entity still has dependents that block the operation
    DeleteConflict,
    /// The provider rejected a password against its password policy
    PasswordPolicyViolation,
    /// A per-entity quota was reached (e.g. access keys per user)
    LimitExceeded,
    /// The request was malformed
    InvalidInput,
    /// The provider throttled the request
    Throttling,
    /// The provider failed internally
    ServiceFailure,
    /// Any code the client does not know
    Unknown(String),
}

impl ErrorCode {
    /// Map a provider error code string to a known code
    pub fn from_vendor(code: &str) -> Self {
        match code {
            "NoSuchEntity" | "NoSuchEntityException" => Self::NoSuchEntity,
            "EntityAlreadyExists" | "EntityAlreadyExistsException" => Self::EntityAlreadyExists,
            "DeleteConflict" | "DeleteConflictException" => Self::DeleteConflict,
            "PasswordPolicyViolation" | "PasswordPolicyViolationException" => {
                Self::PasswordPolicyViolation
            }
            "LimitExceeded" | "LimitExceededException" => Self::LimitExceeded,
            "InvalidInput" | "ValidationError" | "MalformedPolicyDocument" => Self::InvalidInput,
            "Throttling" | "ThrottlingException" | "RequestLimitExceeded" => Self::Throttling,
            "ServiceFailure" | "ServiceFailureException" | "InternalFailure" => {
                Self::ServiceFailure
            }
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Provider-facing code string
    pub fn as_str(&self) -> &str {
        match self {
            Self::NoSuchEntity => "NoSuchEntity",
            Self::EntityAlreadyExists => "EntityAlreadyExists",
            Self::DeleteConflict => "DeleteConflict",
            Self::PasswordPolicyViolation => "PasswordPolicyViolation",
            Self::LimitExceeded => "LimitExceeded",
            Self::InvalidInput => "InvalidInput",
            Self::Throttling => "Throttling",
            Self::ServiceFailure => "ServiceFailure",
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed classification of directory failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Target entity absent
    NotFound,
    /// Entity already exists or has undetachable dependents
    Conflict,
    /// Remote-side validation rejected an input
    PolicyViolation,
    /// Anything else, surfaced verbatim
    TransientOrUnknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::PolicyViolation => "policy violation",
            Self::TransientOrUnknown => "transient or unknown",
        };
        f.write_str(name)
    }
}

/// Error returned by a [`RemoteDirectory`](crate::directory::RemoteDirectory) call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct DirectoryError {
    /// Structured provider code
    pub code: ErrorCode,
    /// Human-readable provider message
    pub message: String,
}

impl DirectoryError {
    /// Create a directory error from a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a directory error from a provider code string
    pub fn from_vendor(code: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::from_vendor(code), message)
    }

    pub fn no_such_entity(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoSuchEntity, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityAlreadyExists, message)
    }

    pub fn delete_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DeleteConflict, message)
    }

    pub fn password_policy(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PasswordPolicyViolation, message)
    }

    /// Classify into the closed error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self.code {
            ErrorCode::NoSuchEntity => ErrorKind::NotFound,
            ErrorCode::EntityAlreadyExists | ErrorCode::DeleteConflict => ErrorKind::Conflict,
            ErrorCode::PasswordPolicyViolation | ErrorCode::InvalidInput => {
                ErrorKind::PolicyViolation
            }
            ErrorCode::LimitExceeded
            | ErrorCode::Throttling
            | ErrorCode::ServiceFailure
            | ErrorCode::Unknown(_) => ErrorKind::TransientOrUnknown,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NoSuchEntity
    }

    pub fn is_already_exists(&self) -> bool {
        self.code == ErrorCode::EntityAlreadyExists
    }

    pub fn is_delete_conflict(&self) -> bool {
        self.code == ErrorCode::DeleteConflict
    }

    pub fn is_policy_violation(&self) -> bool {
        self.code == ErrorCode::PasswordPolicyViolation
    }

    /// Check if this error is transient and can be retried by the caller
    pub fn is_transient(&self) -> bool {
        matches!(self.code, ErrorCode::Throttling | ErrorCode::ServiceFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_codes_map_by_exact_match() {
        assert_eq!(ErrorCode::from_vendor("NoSuchEntity"), ErrorCode::NoSuchEntity);
        assert_eq!(
            ErrorCode::from_vendor("EntityAlreadyExistsException"),
            ErrorCode::EntityAlreadyExists
        );
        assert_eq!(
            ErrorCode::from_vendor("DeleteConflict"),
            ErrorCode::DeleteConflict
        );
        // A message merely containing a code is not that code
        assert_eq!(
            ErrorCode::from_vendor("operation error: NoSuchEntity"),
            ErrorCode::Unknown("operation error: NoSuchEntity".to_string())
        );
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            DirectoryError::no_such_entity("gone").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            DirectoryError::already_exists("dup").kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DirectoryError::delete_conflict("attached").kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DirectoryError::password_policy("short").kind(),
            ErrorKind::PolicyViolation
        );
        assert_eq!(
            DirectoryError::from_vendor("Throttling", "slow down").kind(),
            ErrorKind::TransientOrUnknown
        );
        assert_eq!(
            DirectoryError::from_vendor("Weird", "?").kind(),
            ErrorKind::TransientOrUnknown
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(DirectoryError::from_vendor("Throttling", "").is_transient());
        assert!(DirectoryError::from_vendor("ServiceFailure", "").is_transient());
        assert!(!DirectoryError::no_such_entity("").is_transient());
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let error = DirectoryError::no_such_entity("The user with name bob cannot be found.");
        let text = error.to_string();
        assert!(text.starts_with("NoSuchEntity"));
        assert!(text.contains("bob cannot be found"));
    }

    #[test]
    fn test_unknown_code_round_trips_as_str() {
        let code = ErrorCode::from_vendor("ConcurrentModification");
        assert_eq!(code.as_str(), "ConcurrentModification");
    }
}
