//! Mock implementations for testing

mod directory;

pub use directory::{MockDirectory, Operation, RecordedCall};
