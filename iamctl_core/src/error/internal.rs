//! Internal library error types

use std::path::PathBuf;
use thiserror::Error;

/// Internal library errors
#[derive(Error, Debug)]
pub enum InternalError {
    /// Directory snapshot could not be read or written
    #[error("Directory snapshot error for '{}': {message}", path.display())]
    Snapshot { path: PathBuf, message: String },

    /// Directory snapshot could not be (de)serialized
    #[error("Directory snapshot is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InternalError {
    /// Create a snapshot persistence error
    pub fn snapshot(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::Snapshot {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}
