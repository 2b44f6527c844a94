//! Run command implementation.
//!
//! Submits a prompt file as one batch, polls it to completion and exports the
//! reconciled results.

use super::RequestArgs;
use crate::config::CliContext;
use anyhow::Context;
use colored::Colorize;
use promptbatch_abstraction::BatchApi;
use promptbatch_client::MockBatchApi;
use promptbatch_core::batch::{BatchSession, ParsePolicy, PollProgress, ResultTable, export};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Options for `promptbatch run`.
#[derive(Debug)]
pub struct RunOptions {
    /// Prompt file.
    pub input: PathBuf,
    /// CSV destination.
    pub output: Option<PathBuf>,
    /// Request parameters.
    pub request: RequestArgs,
    /// Skip malformed result lines.
    pub skip_malformed: bool,
    /// Seconds between status checks.
    pub poll_interval: Option<u64>,
    /// Status check cap.
    pub max_attempts: Option<u32>,
    /// Use the mock service.
    pub dry_run: bool,
}

/// Execute the run command.
pub async fn execute(context: &CliContext, options: RunOptions) -> anyhow::Result<()> {
    println!("{}", "promptbatch run".bold().cyan());
    println!();

    let api: Arc<dyn BatchApi> = if options.dry_run {
        println!("  {} Dry run: using the mock batch service", "ℹ".blue());
        Arc::new(MockBatchApi::new())
    } else {
        context.batch_api()?
    };

    let request_config = context.request_config(&options.request)?;
    let mut session = BatchSession::new(api, request_config)
        .with_submit_options(context.config.batch.to_submit_options())
        .with_parse_policy(parse_policy(options.skip_malformed));

    let count = session
        .load_file(&options.input)
        .with_context(|| format!("Failed to load prompts from {}", options.input.display()))?;
    println!("  {} Loaded {} prompts from {}", "✓".green(), count, options.input.display());
    println!("  {} Model: {}", "✓".green(), session.config().model.cyan());

    let job = session.submit().await.context("Failed to submit batch")?;
    println!("  {} Submitted batch {}", "✓".green(), job.id().cyan());

    let mut poll = context.config.poll.clone();
    if let Some(interval) = options.poll_interval {
        poll.interval_secs = Some(interval);
    }
    if let Some(max) = options.max_attempts {
        poll.max_attempts = Some(max);
    }
    let policy = poll.to_policy();

    // Setup Ctrl+C handler
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            eprintln!("\n{} Cancellation requested, stopping status checks", "⚠".yellow());
            ctrl_c.cancel();
        }
    });

    println!();
    println!("{}", "Waiting for batch to finish...".bold());

    let mut progress = PollProgress::new(count);
    let table = session
        .wait(&policy, &cancel, |batch| {
            progress.update(batch);
            println!("  {} {}", "…".dimmed(), progress.status_line());
        })
        .await?;

    println!();
    let output = options.output.unwrap_or_else(|| context.config.output.path_or_default());
    save_results(&table, &output)?;

    Ok(())
}

/// Map the `--skip-malformed` flag to a parse policy.
pub(crate) fn parse_policy(skip_malformed: bool) -> ParsePolicy {
    if skip_malformed { ParsePolicy::Lenient } else { ParsePolicy::Strict }
}

/// Export `table` to `path` and print a summary.
pub(crate) fn save_results(table: &ResultTable, path: &Path) -> anyhow::Result<()> {
    let csv = export::export(table)?;
    export::save_csv(path, &csv)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;

    println!("  {} Wrote {} rows to {}", "✓".green(), table.len(), path.display());
    if table.missing() > 0 {
        println!(
            "  {} {} of {} prompts have no output",
            "⚠".yellow(),
            table.missing(),
            table.len()
        );
    }
    Ok(())
}
