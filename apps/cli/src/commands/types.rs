//! Shared clap types for CLI commands.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Request parameters shared by every command that builds requests.
///
/// Unset values fall back to the stored settings, then to built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Model to run (default: stored `model` setting, else gpt-4o-mini)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature; non-numeric values become 0
    #[arg(short, long, allow_hyphen_values = true)]
    pub temperature: Option<String>,

    /// Completion token limit; non-numeric values become 1000
    #[arg(long, allow_hyphen_values = true)]
    pub max_tokens: Option<String>,

    /// System message sent before every prompt
    #[arg(short, long, conflicts_with = "template")]
    pub system: Option<String>,

    /// Use a saved template as the system message
    #[arg(long)]
    pub template: Option<String>,
}

/// Settings subcommands.
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print one setting
    Get {
        /// Setting key (model, temperature, max_tokens, system_message, api_key)
        key: String,
    },

    /// Store a setting
    Set {
        /// Setting key (model, temperature, max_tokens, system_message, api_key)
        key: String,

        /// Value, stored as typed
        value: String,
    },

    /// List stored settings
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Show the API key instead of masking it
        #[arg(long)]
        reveal: bool,
    },
}

/// Template subcommands.
#[derive(Subcommand, Debug)]
pub enum TemplatesCommand {
    /// List saved templates
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one template
    Show {
        /// Template name
        name: String,
    },

    /// Create or replace a template
    Save {
        /// Template name
        name: String,

        /// Template text
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        content: Option<String>,

        /// Read the template text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Delete a template
    Delete {
        /// Template name
        name: String,
    },
}
