//! CLI configuration file support.
//!
//! Configuration is layered: built-in defaults, then the global file
//! (`~/.promptbatch/config.toml`), then the local file (`./.promptbatchrc`),
//! then `PROMPTBATCH_*` environment variables. Command-line flags are applied
//! last by the binary.

use crate::batch::export::DEFAULT_FILE_NAME;
use crate::batch::submitter::SubmitOptions;
use crate::batch::types::PollPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the promptbatch home directory.
pub const HOME_ENV: &str = "PROMPTBATCH_HOME";

/// CLI configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CliConfig {
    /// Base URL of the batch service
    #[serde(default)]
    pub api_base: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: Option<String>,

    /// Status polling
    #[serde(default)]
    pub poll: PollConfig,

    /// Batch registration
    #[serde(default)]
    pub batch: BatchSection,

    /// Output preferences
    #[serde(default)]
    pub output: OutputConfig,

    /// Files this configuration was read from, in load order.
    #[serde(skip)]
    pub loaded_from: Vec<PathBuf>,
}

/// Status polling configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PollConfig {
    /// Seconds between status queries (default 5).
    #[serde(default)]
    pub interval_secs: Option<u64>,

    /// Give up after this many status queries.
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Consecutive failed status queries tolerated (default 3).
    #[serde(default)]
    pub max_status_errors: Option<u32>,

    /// Delay growth factor; 1.0 keeps the interval fixed.
    #[serde(default)]
    pub backoff_multiplier: Option<f64>,

    /// Upper bound on the delay when backing off.
    #[serde(default)]
    pub max_interval_secs: Option<u64>,
}

impl PollConfig {
    /// Build the polling schedule, filling unset values with defaults.
    pub fn to_policy(&self) -> PollPolicy {
        let defaults = PollPolicy::default();
        let interval = self.interval_secs.map_or(defaults.interval, Duration::from_secs);
        let mut policy = PollPolicy::fixed(interval);

        if let Some(multiplier) = self.backoff_multiplier {
            let max_interval =
                self.max_interval_secs.map_or(policy.max_interval, Duration::from_secs);
            policy = policy.with_backoff(multiplier, max_interval);
        }
        if let Some(max) = self.max_attempts {
            policy = policy.with_max_attempts(max);
        }
        if let Some(max) = self.max_status_errors {
            policy = policy.with_max_consecutive_errors(max.max(1));
        }
        policy
    }

    fn merge(&mut self, other: &Self) {
        if other.interval_secs.is_some() {
            self.interval_secs = other.interval_secs;
        }
        if other.max_attempts.is_some() {
            self.max_attempts = other.max_attempts;
        }
        if other.max_status_errors.is_some() {
            self.max_status_errors = other.max_status_errors;
        }
        if other.backoff_multiplier.is_some() {
            self.backoff_multiplier = other.backoff_multiplier;
        }
        if other.max_interval_secs.is_some() {
            self.max_interval_secs = other.max_interval_secs;
        }
    }
}

/// Batch registration configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchSection {
    /// Endpoint declared for each batch
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Completion window declared for each batch
    #[serde(default)]
    pub completion_window: Option<String>,
}

impl BatchSection {
    /// Submission options with unset values left at their defaults.
    pub fn to_submit_options(&self) -> SubmitOptions {
        let mut options = SubmitOptions::default();
        if let Some(ref endpoint) = self.endpoint {
            options.endpoint = endpoint.clone();
        }
        if let Some(ref window) = self.completion_window {
            options.completion_window = window.clone();
        }
        options
    }
}

/// Output format configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Where results are written
    #[serde(default)]
    pub path: Option<String>,

    /// Default output format for `submit`, `status` and the list commands
    /// (human, json)
    #[serde(default)]
    pub format: Option<String>,
}

impl OutputConfig {
    /// Results path, falling back to `batch_results.csv`.
    pub fn path_or_default(&self) -> PathBuf {
        PathBuf::from(self.path.as_deref().unwrap_or(DEFAULT_FILE_NAME))
    }

    /// Whether machine-readable output is preferred.
    pub fn is_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum CliConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type CliConfigResult<T> = std::result::Result<T, CliConfigError>;

/// The promptbatch home directory (`$PROMPTBATCH_HOME`, else `~/.promptbatch`).
pub fn promptbatch_home() -> PathBuf {
    if let Ok(home) = std::env::var(HOME_ENV) {
        return PathBuf::from(home);
    }
    std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(".")).join(".promptbatch")
}

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> CliConfigResult<Self> {
        if !path.exists() {
            return Err(CliConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CliConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| CliConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> CliConfigResult<()> {
        match self.output.format.as_deref() {
            None | Some("human" | "json") => Ok(()),
            Some(other) => Err(CliConfigError::InvalidValue(format!(
                "{}: output.format must be \"human\" or \"json\", got \"{}\"",
                path.display(),
                other
            ))),
        }
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        promptbatch_home().join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".promptbatchrc")
    }

    /// Discover and load configuration files, then apply the environment.
    ///
    /// A file that is missing is skipped; a file that exists but cannot be
    /// parsed is an error.
    pub fn discover_and_load() -> CliConfigResult<Self> {
        let mut config =
            Self::discover_and_load_from(&Self::default_global_path(), &Self::default_local_path())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load `global` then `local`, local values overriding global ones.
    pub fn discover_and_load_from(global: &Path, local: &Path) -> CliConfigResult<Self> {
        let mut config = Self::default();

        for path in [global, local] {
            match Self::load_from_file(path) {
                Ok(layer) => {
                    config.merge(&layer);
                    config.loaded_from.push(path.to_path_buf());
                }
                Err(CliConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(config)
    }

    /// Override values from `PROMPTBATCH_*` variables as returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> CliConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup("PROMPTBATCH_API_BASE") {
            self.api_base = Some(base);
        }
        if let Some(level) = lookup("PROMPTBATCH_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(raw) = lookup("PROMPTBATCH_POLL_INTERVAL") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                CliConfigError::InvalidValue(format!("PROMPTBATCH_POLL_INTERVAL={}", raw))
            })?;
            self.poll.interval_secs = Some(secs);
        }
        if let Some(path) = lookup("PROMPTBATCH_OUTPUT") {
            self.output.path = Some(path);
        }
        Ok(())
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Self) {
        if let Some(ref api_base) = other.api_base {
            self.api_base = Some(api_base.clone());
        }
        if let Some(ref log_level) = other.log_level {
            self.log_level = Some(log_level.clone());
        }
        self.poll.merge(&other.poll);
        if let Some(ref endpoint) = other.batch.endpoint {
            self.batch.endpoint = Some(endpoint.clone());
        }
        if let Some(ref window) = other.batch.completion_window {
            self.batch.completion_window = Some(window.clone());
        }
        if let Some(ref path) = other.output.path {
            self.output.path = Some(path.clone());
        }
        if let Some(ref format) = other.output.format {
            self.output.format = Some(format.clone());
        }
    }
}
