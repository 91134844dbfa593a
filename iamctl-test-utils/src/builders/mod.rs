//! Test data builders

mod fixtures;

pub use fixtures::{DirectoryFixture, GroupFixture, UserFixture};
