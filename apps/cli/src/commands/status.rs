//! Status command implementation.

use crate::config::CliContext;
use chrono::DateTime;
use colored::Colorize;
use promptbatch_abstraction::{BatchObject, BatchStatus};
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Execute the status command.
pub async fn execute(context: &CliContext, batch_id: &str, json_output: bool) -> anyhow::Result<()> {
    let api = context.batch_api()?;
    let batch = api.retrieve_batch(batch_id).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        return Ok(());
    }

    println!();
    println!("{} {}", "Batch".bold(), batch.id.cyan());
    let table = Table::new(rows(&batch)).with(Style::rounded()).to_string();
    println!("{}", table);
    println!();
    println!("{}", hint(batch.status));
    Ok(())
}

fn rows(batch: &BatchObject) -> Vec<StatusRow> {
    let or_dash = |v: Option<&str>| v.unwrap_or("-").to_string();
    let mut rows = vec![StatusRow { field: "Status", value: colored_status(batch.status) }];

    if let Some(counts) = batch.request_counts {
        rows.push(StatusRow {
            field: "Requests",
            value: format!("{} total, {} completed, {} failed", counts.total, counts.completed, counts.failed),
        });
    }
    rows.push(StatusRow {
        field: "Created",
        value: batch
            .created_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
    });
    rows.push(StatusRow { field: "Input file", value: or_dash(batch.input_file_id.as_deref()) });
    rows.push(StatusRow { field: "Output file", value: or_dash(batch.output_file_id.as_deref()) });
    if batch.error_file_id.is_some() {
        rows.push(StatusRow { field: "Error file", value: or_dash(batch.error_file_id.as_deref()) });
    }
    rows
}

fn colored_status(status: BatchStatus) -> String {
    let text = status.as_str();
    if status == BatchStatus::Completed {
        text.green().to_string()
    } else if status.is_failure() {
        text.red().to_string()
    } else {
        text.yellow().to_string()
    }
}

fn hint(status: BatchStatus) -> String {
    if status == BatchStatus::Completed {
        "Results are ready; download them with `promptbatch fetch`.".green().to_string()
    } else if status.is_failure() {
        "The batch ended without results.".red().to_string()
    } else {
        "The batch is still running.".dimmed().to_string()
    }
}
