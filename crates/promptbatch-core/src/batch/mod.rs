//! Batch lifecycle: encode, submit, poll, reconcile and export.

pub mod encoder;
pub mod error;
pub mod export;
pub mod formats;
pub mod input;
pub mod poller;
pub mod progress;
pub mod reconciler;
pub mod session;
pub mod submitter;
pub mod types;

pub use encoder::{encode, to_jsonl};
pub use error::{BatchError, Result};
pub use input::{parse_input_file, parse_input_str};
pub use poller::poll_until_terminal;
pub use progress::PollProgress;
pub use reconciler::{fetch_results, reconcile};
pub use session::{BatchSession, SubmittedJob};
pub use submitter::{SubmitOptions, submit};
pub use types::{
    ChatMessage, EncodedRequest, InputRecords, OutputRecord, ParsePolicy, PollPolicy,
    RequestBody, RequestConfig, ResultRow, ResultTable, custom_id,
};
