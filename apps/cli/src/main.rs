//! promptbatch CLI - bulk prompt completion through a remote batch API
//!
//! Turns a file of prompts into one asynchronous batch job, waits for it to
//! finish and writes the prompts next to their completions as CSV.

mod commands;
mod config;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

use commands::{RequestArgs, SettingsCommand, TemplatesCommand};
use config::CliContext;

/// promptbatch - run a file of prompts as one batch completion job
#[derive(Parser, Debug)]
#[command(
    name = "promptbatch",
    author,
    version,
    about = "Run a file of prompts as a batch completion job and export the results as CSV"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// API key (overrides OPENAI_API_KEY and the stored api_key setting)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Base URL of the batch service (overrides the configured api_base)
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a prompt file, wait for the batch and export the results
    ///
    /// Each non-empty line of the input becomes one request. The batch is
    /// polled until it finishes, then results are matched back to their
    /// prompts and written as CSV.
    Run {
        /// Prompt file (one prompt per line, or a JSON array)
        input: PathBuf,

        /// CSV file to write (default: batch_results.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        request: RequestArgs,

        /// Skip malformed result lines instead of failing
        #[arg(long)]
        skip_malformed: bool,

        /// Seconds between status checks (default: 5)
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Give up after this many status checks
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Run against a local mock service instead of the real API
        #[arg(long)]
        dry_run: bool,
    },

    /// Submit a prompt file and print the batch id without waiting
    Submit {
        /// Prompt file (one prompt per line, or a JSON array)
        input: PathBuf,

        #[command(flatten)]
        request: RequestArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the status of a batch
    Status {
        /// Batch id
        batch_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download the results of a completed batch and export them
    ///
    /// The input must be the same prompt file the batch was submitted from,
    /// since results are matched to prompts by position.
    Fetch {
        /// Batch id
        batch_id: String,

        /// Prompt file the batch was submitted from
        input: PathBuf,

        /// CSV file to write (default: batch_results.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip malformed result lines instead of failing
        #[arg(long)]
        skip_malformed: bool,
    },

    /// Write the batch request file for a prompt file without submitting it
    Encode {
        /// Prompt file (one prompt per line, or a JSON array)
        input: PathBuf,

        /// JSONL file to write, or "-" for stdout (default: batch_input.jsonl)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Manage stored settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Manage named system message templates
    #[command(subcommand)]
    Templates(TemplatesCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let context = CliContext::load(args.api_key, args.api_base)?;

    // Initialize tracing
    let level_name = args
        .log_level
        .or_else(|| context.config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    let level = match level_name.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    for path in &context.config.loaded_from {
        debug!(path = %path.display(), "Loaded configuration");
    }

    // If no command provided, show help
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    // Execute command
    match command {
        Command::Run {
            input,
            output,
            request,
            skip_malformed,
            poll_interval,
            max_attempts,
            dry_run,
        } => {
            let options = commands::run::RunOptions {
                input,
                output,
                request,
                skip_malformed,
                poll_interval,
                max_attempts,
                dry_run,
            };
            commands::run::execute(&context, options).await?;
        }
        Command::Submit { input, request, json } => {
            let json = json || context.config.output.is_json();
            commands::submit::execute(&context, &input, &request, json).await?;
        }
        Command::Status { batch_id, json } => {
            let json = json || context.config.output.is_json();
            commands::status::execute(&context, &batch_id, json).await?;
        }
        Command::Fetch { batch_id, input, output, skip_malformed } => {
            commands::fetch::execute(&context, &batch_id, &input, output, skip_malformed).await?;
        }
        Command::Encode { input, output, request } => {
            commands::encode::execute(&context, &input, output, &request)?;
        }
        Command::Settings(cmd) => {
            commands::settings::execute(&context, cmd)?;
        }
        Command::Templates(cmd) => {
            commands::templates::execute(&context, cmd)?;
        }
    }

    Ok(())
}
