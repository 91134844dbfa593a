//! Subcommands over the lifecycle orchestrator
//!
//! Each module owns its clap arguments and an `execute` entry point that
//! returns the exit code for the finished batch.

pub mod groups;
pub mod policies;
pub mod users;

pub use groups::GroupsCommand;
pub use policies::PoliciesCommand;
pub use users::UsersCommand;

use crate::error::{CliError, CliResult};

/// Trim names and reject a list that is empty once blanks are dropped
fn non_empty(names: Vec<String>, what: &str) -> CliResult<Vec<String>> {
    let names: Vec<String> = names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Err(CliError::misuse(&format!("No {what} given")));
    }
    Ok(names)
}
