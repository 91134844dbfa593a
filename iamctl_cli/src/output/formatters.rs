use super::{Describe, OutputFormatter};
use crate::progress::format_elapsed;
use anyhow::Result;
use colored::*;
use iamctl_core::{BatchItem, BatchReport};
use serde::Serialize;

/// Text formatter for human-readable output
pub struct HumanFormatter {
    use_color: bool,
}

impl HumanFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, text: &str, color: fn(&str) -> ColoredString) -> String {
        if self.use_color {
            color(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl<R: Describe + BatchItem> OutputFormatter<R> for HumanFormatter {
    fn format_single(&self, result: &R) -> Result<String> {
        let (mark, outcome) = if result.is_success() {
            (
                self.colorize("✓", |s| s.green()),
                self.colorize(&result.outcome(), |s| s.normal()),
            )
        } else {
            (
                self.colorize("✗", |s| s.red()),
                self.colorize(&result.outcome(), |s| s.red()),
            )
        };

        let mut output = format!(
            "{mark} {}: {outcome}",
            self.colorize(&result.subject(), |s| s.cyan())
        );
        for line in result.details() {
            output.push_str(&format!("\n    {}", self.colorize(&line, |s| s.dimmed())));
        }
        Ok(output)
    }

    fn format_report(&self, report: &BatchReport<R>) -> Result<String> {
        let mut lines = Vec::with_capacity(report.results.len() + 2);
        for result in &report.results {
            lines.push(self.format_single(result)?);
        }

        let failed = format!("{} failed", report.failure_count);
        let failed = if report.failure_count > 0 {
            self.colorize(&failed, |s| s.red())
        } else {
            failed
        };
        lines.push(String::new());
        lines.push(format!(
            "{} {} total, {} succeeded, {failed} in {}",
            self.colorize("Summary:", |s| s.bold()),
            report.total,
            report.success_count,
            format_elapsed(report.total_time)
        ));
        Ok(lines.join("\n"))
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl<R: Serialize> OutputFormatter<R> for JsonFormatter {
    fn format_single(&self, result: &R) -> Result<String> {
        Ok(serde_json::to_string(result)?)
    }

    fn format_report(&self, report: &BatchReport<R>) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }
}

/// Tab-separated `subject, ok|failed, outcome` lines
pub struct MinimalFormatter;

impl<R: Describe + BatchItem> OutputFormatter<R> for MinimalFormatter {
    fn format_single(&self, result: &R) -> Result<String> {
        let status = if result.is_success() { "ok" } else { "failed" };
        Ok(format!("{}\t{status}\t{}", result.subject(), result.outcome()))
    }
}
