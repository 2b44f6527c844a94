//! Submit command implementation.

use super::RequestArgs;
use crate::config::CliContext;
use anyhow::Context;
use colored::Colorize;
use promptbatch_core::batch::BatchSession;
use std::path::Path;

/// Execute the submit command.
pub async fn execute(
    context: &CliContext,
    input: &Path,
    request: &RequestArgs,
    json_output: bool,
) -> anyhow::Result<()> {
    let mut session = BatchSession::new(context.batch_api()?, context.request_config(request)?)
        .with_submit_options(context.config.batch.to_submit_options());

    let count = session
        .load_file(input)
        .with_context(|| format!("Failed to load prompts from {}", input.display()))?;
    let job = session.submit().await.context("Failed to submit batch")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&job.batch)?);
    } else {
        println!("{} Submitted {} prompts as batch {}", "✓".green(), count, job.id().cyan());
        println!();
        println!("Check progress with:  promptbatch status {}", job.id());
        println!("Fetch results with:   promptbatch fetch {} {}", job.id(), input.display());
    }

    Ok(())
}
