//! Encode command implementation.

use super::RequestArgs;
use crate::config::CliContext;
use anyhow::Context;
use colored::Colorize;
use promptbatch_core::batch::{encode, parse_input_file, to_jsonl};
use promptbatch_core::batch::submitter::INPUT_FILE_NAME;
use std::path::{Path, PathBuf};

/// Execute the encode command.
pub fn execute(
    context: &CliContext,
    input: &Path,
    output: Option<PathBuf>,
    request: &RequestArgs,
) -> anyhow::Result<()> {
    let inputs = parse_input_file(input)
        .with_context(|| format!("Failed to load prompts from {}", input.display()))?;
    let config = context.request_config(request)?;
    let jsonl = to_jsonl(&encode(&inputs, &config))?;

    let output = output.unwrap_or_else(|| PathBuf::from(INPUT_FILE_NAME));
    if output.as_os_str() == "-" {
        println!("{}", jsonl);
        return Ok(());
    }

    std::fs::write(&output, jsonl)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{} Encoded {} requests to {}", "✓".green(), inputs.len(), output.display());
    Ok(())
}
