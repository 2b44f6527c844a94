//! Configuration module for promptbatch.

pub mod cli_config;

pub use cli_config::{
    BatchSection, CliConfig, CliConfigError, CliConfigResult, OutputConfig, PollConfig,
    promptbatch_home,
};
