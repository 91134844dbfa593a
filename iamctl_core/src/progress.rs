//! Progress reporting abstractions for batch operations
//!
//! This module provides a trait-based abstraction for progress reporting,
//! allowing the core library to report progress without depending on
//! specific channel implementations or UI concerns.

/// Core trait for progress reporting
///
/// This trait abstracts away the progress reporting mechanism,
/// allowing different implementations (channels, logging, null, etc.)
pub trait ProgressProvider: Send + Sync {
    /// Report a progress update
    fn report(&self, update: ProgressUpdate);

    /// Signal that the operation is complete
    fn complete(&self);
}

/// Unified progress update type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// One item of a batch finished
    BatchProgress {
        /// Batch operation name, e.g. "create users"
        operation: String,
        /// Items finished so far, including this one
        completed: usize,
        total: usize,
        /// Label of the item that just finished
        item: Option<String>,
        /// Whether the item finished successfully
        succeeded: bool,
    },
}

/// Null implementation for when no progress is needed
pub struct NullProvider;

impl ProgressProvider for NullProvider {
    fn report(&self, _update: ProgressUpdate) {
        // No-op: discard all progress updates
    }

    fn complete(&self) {
        // No-op
    }
}

/// Provider that forwards updates to the `log` facade at debug level
pub struct LogProvider;

impl ProgressProvider for LogProvider {
    fn report(&self, update: ProgressUpdate) {
        let ProgressUpdate::BatchProgress {
            operation,
            completed,
            total,
            item,
            succeeded,
        } = update;
        log::debug!(
            "{operation}: {completed}/{total} {} ({})",
            item.as_deref().unwrap_or("-"),
            if succeeded { "ok" } else { "failed" }
        );
    }

    fn complete(&self) {}
}
