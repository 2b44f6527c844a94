//! Persistent settings and prompt templates.
//!
//! Everything is kept in a single TOML file, `settings.toml`, under the
//! promptbatch home directory.

pub mod error;
pub mod settings;

pub use error::{StorageError, StorageResult};
pub use settings::{PromptTemplate, SettingsStore, keys};
