//! promptbatch Core - batch lifecycle for bulk prompt completion.
//!
//! This crate provides the core functionality for promptbatch, including:
//! - Prompt file loading and request encoding
//! - Batch submission, status polling and result reconciliation
//! - CSV export of reconciled results
//! - CLI configuration and the settings/template store
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use promptbatch_core::batch::{BatchSession, PollPolicy, RequestConfig, parse_input_file, export};
//! use promptbatch_abstraction::BatchApi;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run(api: Arc<dyn BatchApi>) -> promptbatch_core::batch::Result<()> {
//!     let config = RequestConfig::from_raw("gpt-4o-mini", "0.2", "500", "Be brief.");
//!     let mut session = BatchSession::new(api, config);
//!     session.load_inputs(parse_input_file("prompts.txt".as_ref())?);
//!     session.submit().await?;
//!     let table = session.wait(&PollPolicy::default(), &CancellationToken::new(), |_| {}).await?;
//!     export::save_csv("batch_results.csv".as_ref(), &export::export(&table)?)?;
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod storage;

pub use batch::{
    BatchError, BatchSession, EncodedRequest, InputRecords, ParsePolicy, PollPolicy,
    RequestConfig, ResultRow, ResultTable, SubmitOptions,
};
pub use config::{CliConfig, CliConfigError};
pub use storage::{PromptTemplate, SettingsStore, StorageError};
