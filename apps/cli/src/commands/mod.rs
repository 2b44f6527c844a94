//! Command implementations for the promptbatch CLI.

pub mod encode;
pub mod fetch;
pub mod run;
pub mod settings;
pub mod status;
pub mod submit;
pub mod templates;
pub mod types;

// Re-export types for convenience
pub use types::{RequestArgs, SettingsCommand, TemplatesCommand};
