//! Fetch command implementation.
//!
//! Downloads the output of an already submitted batch and exports it against
//! the prompt file it was submitted from.

use super::run::{parse_policy, save_results};
use crate::config::CliContext;
use anyhow::{Context, bail};
use colored::Colorize;
use promptbatch_abstraction::BatchStatus;
use promptbatch_core::batch::{BatchSession, RequestConfig, parse_input_file};
use std::path::{Path, PathBuf};

/// Execute the fetch command.
pub async fn execute(
    context: &CliContext,
    batch_id: &str,
    input: &Path,
    output: Option<PathBuf>,
    skip_malformed: bool,
) -> anyhow::Result<()> {
    let inputs = parse_input_file(input)
        .with_context(|| format!("Failed to load prompts from {}", input.display()))?;

    let mut session = BatchSession::new(context.batch_api()?, RequestConfig::default())
        .with_parse_policy(parse_policy(skip_malformed));
    session.attach(batch_id, inputs);

    let status = session.refresh_status().await?.status;
    if status.is_failure() {
        bail!("Batch {} ended with status {} and has no results", batch_id, status);
    }
    if status != BatchStatus::Completed {
        bail!("Batch {} is {}; results are not available yet", batch_id, status);
    }
    println!("  {} Batch {} is {}", "✓".green(), batch_id.cyan(), status.as_str().green());

    let table = session.fetch_and_reconcile().await?;
    let output = output.unwrap_or_else(|| context.config.output.path_or_default());
    save_results(&table, &output)?;

    Ok(())
}
