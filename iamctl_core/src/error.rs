//! Error types for the iamctl core library
//!
//! This module contains all error types used throughout the library, organized
//! into logical categories.

use thiserror::Error;

pub mod directory;
pub mod internal;
pub mod validation;

pub use self::directory::{DirectoryError, DirectoryResult, ErrorCode, ErrorKind};
pub use self::validation::ValidationError;
pub use internal::InternalError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the iamctl core library
///
/// Errors are categorized into three main types:
/// - Directory errors: failures reported by the remote directory
/// - Validation errors: input validation and configuration errors
/// - Internal errors: snapshot persistence
#[derive(Error, Debug)]
pub enum Error {
    /// Remote directory errors
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal library errors
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl Error {
    /// Classify into the closed directory error taxonomy
    ///
    /// Errors that did not come from the directory are `TransientOrUnknown`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Directory(err) => err.kind(),
            Error::Validation(_) => ErrorKind::PolicyViolation,
            Error::Internal(_) => ErrorKind::TransientOrUnknown,
        }
    }

    /// Returns true if the error is a directory not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Directory(err) if err.is_not_found())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(InternalError::Serialization(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::path::Path;

    #[test]
    fn test_directory_error_is_transparent() {
        let error: Error = DirectoryError::no_such_entity("user alice").into();
        assert_eq!(error.to_string(), "NoSuchEntity: user alice");
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(error.is_not_found());
    }

    #[test]
    fn test_validation_error_kind() {
        let error = Error::Validation(ValidationError::missing_field("username"));
        assert_eq!(error.kind(), ErrorKind::PolicyViolation);
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_internal_error_kind() {
        let error = Error::Internal(InternalError::snapshot(Path::new("state.json"), "disk full"));
        assert_eq!(error.kind(), ErrorKind::TransientOrUnknown);
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = Error::Internal(InternalError::snapshot(Path::new("state.json"), "Test error"));
        let _: &dyn StdError = &error;
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_from_serde_error() {
        let serde_error = serde_json::from_str::<Vec<String>>("[1,").unwrap_err();
        let error: Error = serde_error.into();
        assert!(matches!(
            error,
            Error::Internal(InternalError::Serialization(_))
        ));
    }
}
