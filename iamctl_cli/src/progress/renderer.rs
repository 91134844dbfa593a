//! Progress rendering for the CLI
//!
//! Converts ProgressUpdate messages into indicatif bars, one per batch
//! operation.

use colored::*;
use iamctl_core::progress::ProgressUpdate;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use tokio::sync::mpsc;

const BAR_TEMPLATE: &str = "{msg}\n[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} | {percent}%";

/// Render progress updates from a channel until every sender is gone
pub async fn render_progress(mut rx: mpsc::Receiver<ProgressUpdate>) {
    let mut renderer = ProgressRenderer::new();

    while let Some(update) = rx.recv().await {
        renderer.handle_update(update);
    }

    renderer.finish();
}

#[derive(Debug)]
struct BatchBar {
    bar: ProgressBar,
    failed: usize,
}

/// Progress renderer that manages visual progress display
pub struct ProgressRenderer {
    multi: MultiProgress,
    batches: HashMap<String, BatchBar>,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            batches: HashMap::new(),
        }
    }

    /// Handle a progress update
    pub fn handle_update(&mut self, update: ProgressUpdate) {
        match update {
            ProgressUpdate::BatchProgress {
                operation,
                completed,
                total,
                item,
                succeeded,
            } => {
                self.update_batch_progress(operation, completed, total, item, succeeded);
            }
        }
    }

    fn update_batch_progress(
        &mut self,
        operation: String,
        completed: usize,
        total: usize,
        item: Option<String>,
        succeeded: bool,
    ) {
        let multi = &self.multi;
        let batch = self.batches.entry(operation.clone()).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(total as u64));
            let style = ProgressStyle::with_template(BAR_TEMPLATE)
                .map(|style| style.progress_chars("##-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar.set_message(operation.bold().to_string());
            BatchBar { bar, failed: 0 }
        });

        if !succeeded {
            batch.failed += 1;
        }
        batch.bar.set_position(completed as u64);

        let mut message = operation.bold().to_string();
        if let Some(item) = item {
            message.push_str(&format!(": {}", item.cyan()));
        }
        if batch.failed > 0 {
            message.push_str(&format!(" ({})", format!("{} failed", batch.failed).red()));
        }
        batch.bar.set_message(message);
    }

    /// Finish all progress bars
    pub fn finish(self) {
        for (operation, batch) in self.batches {
            let summary = if batch.failed == 0 {
                format!("✓ {operation} complete").green().to_string()
            } else {
                format!("✗ {operation}: {} failed", batch.failed)
                    .yellow()
                    .to_string()
            };
            batch.bar.finish_with_message(summary);
        }
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}
