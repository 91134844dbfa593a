//! Per-invocation wiring between configuration, the local directory backend
//! and the core orchestrator

use crate::config::AppConfig;
use crate::error::{CliError, CliResult, ExitCode};
use crate::output::{Describe, OutputFormat, create_formatter};
use crate::progress::{create_progress_infrastructure, render_progress};
use crate::terminal;
use anyhow::Context;
use dialoguer::Confirm;
use iamctl_core::{
    BatchItem, BatchReport, InMemoryDirectory, LifecycleOrchestrator, LogProvider,
    ProgressProvider,
};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub struct Session {
    config: AppConfig,
    directory: InMemoryDirectory,
    state_path: PathBuf,
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
}

impl Session {
    /// Load the directory snapshot and resolve output settings
    pub async fn open(config: AppConfig, format: Option<OutputFormat>) -> CliResult<Self> {
        let state_path = config.directory.state_path();
        log::debug!("Using directory state {}", state_path.display());

        let directory = InMemoryDirectory::load(&state_path)
            .await
            .map_err(|e| CliError::state_file(e, &state_path.display().to_string()))?;

        let policy = directory
            .snapshot()
            .await
            .password_policy
            .with_minimum_length(config.directory.password_min_length)?;
        directory.set_password_policy(policy).await;

        let format = format.unwrap_or_else(|| config.output.format());
        let use_color = config.output.color_enabled && terminal::supports_ansi();
        colored::control::set_override(use_color);
        let show_progress = format == OutputFormat::Human
            && config.output.progress_enabled
            && terminal::should_show_progress_by_default();

        Ok(Self {
            config,
            directory,
            state_path,
            format,
            use_color,
            show_progress,
        })
    }

    pub fn directory(&self) -> &InMemoryDirectory {
        &self.directory
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// A fresh orchestrator over the loaded directory
    pub fn orchestrator(&self) -> LifecycleOrchestrator {
        LifecycleOrchestrator::new(Arc::new(self.directory.clone()), &self.config.client)
    }

    /// Run a batch against a fresh orchestrator and time it
    ///
    /// Progress bars are drawn while the batch runs on interactive
    /// terminals, otherwise progress goes to the debug log.
    pub async fn run<F, Fut, R>(&self, batch: F) -> BatchReport<R>
    where
        F: FnOnce(LifecycleOrchestrator) -> Fut,
        Fut: Future<Output = Vec<R>>,
        R: BatchItem,
    {
        let orchestrator = self.orchestrator();
        let start = Instant::now();

        let results = if self.show_progress {
            let (provider, rx) = create_progress_infrastructure();
            let renderer = tokio::spawn(render_progress(rx));
            let results = batch(orchestrator.with_progress(provider.clone())).await;
            provider.complete();
            if let Err(err) = renderer.await {
                log::debug!("Progress renderer stopped abnormally: {err}");
            }
            results
        } else {
            let provider: Arc<dyn ProgressProvider> = Arc::new(LogProvider);
            batch(orchestrator.with_progress(provider)).await
        };

        BatchReport::from_results(results, start.elapsed())
    }

    /// Write the directory snapshot back to the state file
    pub async fn persist(&self) -> CliResult<()> {
        self.directory
            .save(&self.state_path)
            .await
            .map_err(|e| CliError::state_file(e, &self.state_path.display().to_string()))?;
        log::debug!("Saved directory state to {}", self.state_path.display());
        Ok(())
    }

    /// Print a report in the selected format and map it to an exit code
    pub fn print_report<R>(&self, report: &BatchReport<R>) -> CliResult<ExitCode>
    where
        R: Describe + BatchItem + Serialize,
    {
        let formatter = create_formatter::<R>(self.format, self.use_color);
        println!("{}", formatter.format_report(report)?);
        Ok(ExitCode::for_batch(report.failure_count))
    }

    /// Print a listing as a JSON array or one line per entry
    ///
    /// Human output shows `name  detail`, minimal output only the name.
    pub fn print_list<T, N, D>(&self, items: &[T], name: N, detail: D) -> CliResult<ExitCode>
    where
        T: Serialize,
        N: Fn(&T) -> String,
        D: Fn(&T) -> String,
    {
        match self.format {
            OutputFormat::Json => {
                let json =
                    serde_json::to_string_pretty(items).context("Failed to serialize listing")?;
                println!("{json}");
            }
            OutputFormat::Minimal => {
                for item in items {
                    println!("{}", name(item));
                }
            }
            OutputFormat::Human => {
                for item in items {
                    let detail = detail(item);
                    if detail.is_empty() {
                        println!("{}", name(item));
                    } else {
                        println!("{}  {detail}", name(item));
                    }
                }
            }
        }
        Ok(ExitCode::Success)
    }

    /// Ask before a destructive operation
    ///
    /// Without a terminal to prompt on, or with `assume_yes`, the answer is yes.
    pub fn confirm(&self, prompt: &str, assume_yes: bool) -> CliResult<bool> {
        if assume_yes || !terminal::can_prompt() {
            return Ok(true);
        }
        let answer = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read input")?;
        Ok(answer)
    }
}
