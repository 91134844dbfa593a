mod describe;
mod formatters;

pub use describe::Describe;
pub use formatters::{HumanFormatter, JsonFormatter, MinimalFormatter};

use anyhow::Result;
use iamctl_core::{BatchItem, BatchReport};
use serde::Serialize;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON report
    Json,
    /// One tab-separated line per item (for scripting)
    Minimal,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn from_string(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "minimal" => Ok(Self::Minimal),
            _ => anyhow::bail!("Unknown output format: {}", s),
        }
    }
}

/// Trait for batch report formatters
pub trait OutputFormatter<R>: Send + Sync {
    /// Format a single result line (or block)
    fn format_single(&self, result: &R) -> Result<String>;

    /// Format a whole report
    fn format_report(&self, report: &BatchReport<R>) -> Result<String> {
        let formatted: Result<Vec<String>> =
            report.results.iter().map(|r| self.format_single(r)).collect();

        Ok(formatted?.join("\n"))
    }
}

/// Create a formatter based on output format
pub fn create_formatter<R>(format: OutputFormat, use_color: bool) -> Box<dyn OutputFormatter<R>>
where
    R: Describe + BatchItem + Serialize,
{
    match format {
        OutputFormat::Human => Box::new(HumanFormatter::new(use_color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Minimal => Box::new(MinimalFormatter),
    }
}
