//! Test utilities for iamctl
//!
//! This crate provides mock implementations, test builders, and fixtures
//! for testing iamctl's batch orchestration.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{DirectoryFixture, GroupFixture, UserFixture};
pub use mocks::{MockDirectory, Operation, RecordedCall};
