//! iamctl command line interface
//!
//! Library target behind the `iamctl` binary: command definitions, layered
//! configuration, output and progress rendering over `iamctl_core`.

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod paths;
pub mod progress;
pub mod session;
pub mod terminal;

pub use error::{CliError, CliResult, ExitCode};
