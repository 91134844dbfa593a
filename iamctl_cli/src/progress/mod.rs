//! Progress reporting module for the CLI
//!
//! Batch progress from the core is sent over a channel to a renderer task
//! that draws indicatif bars on stderr.

pub mod provider;
pub mod renderer;
pub mod utils;

pub use provider::{ChannelProvider, create_progress_infrastructure};
pub use renderer::{ProgressRenderer, render_progress};
pub use utils::{format_duration, format_elapsed};
