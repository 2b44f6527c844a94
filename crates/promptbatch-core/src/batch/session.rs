//! Batch session: the loaded inputs and the job submitted for them.
//!
//! A session tracks at most one job. The inputs are snapshotted into the job at
//! submission, so loading another file afterwards cannot change how that job's
//! results are reconciled.

use crate::batch::encoder::encode;
use crate::batch::error::{BatchError, Result};
use crate::batch::input::parse_input_file;
use crate::batch::poller::poll_until_terminal;
use crate::batch::reconciler::{fetch_results, reconcile};
use crate::batch::submitter::{SubmitOptions, submit};
use crate::batch::types::{InputRecords, ParsePolicy, PollPolicy, RequestConfig, ResultTable};
use promptbatch_abstraction::{BatchApi, BatchObject, BatchStatus};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A batch job together with the inputs it was submitted for.
#[derive(Debug, Clone)]
pub struct SubmittedJob {
    /// Latest known state of the job.
    pub batch: BatchObject,
    /// Prompts in submission order.
    pub inputs: InputRecords,
}

impl SubmittedJob {
    /// The job id.
    pub fn id(&self) -> &str {
        &self.batch.id
    }
}

/// Caller-owned context for one batch run.
pub struct BatchSession {
    api: Arc<dyn BatchApi>,
    config: RequestConfig,
    submit_options: SubmitOptions,
    parse_policy: ParsePolicy,
    inputs: InputRecords,
    current: Option<SubmittedJob>,
}

impl BatchSession {
    /// Create a session with no inputs and no job.
    pub fn new(api: Arc<dyn BatchApi>, config: RequestConfig) -> Self {
        Self {
            api,
            config,
            submit_options: SubmitOptions::default(),
            parse_policy: ParsePolicy::default(),
            inputs: InputRecords::default(),
            current: None,
        }
    }

    /// Set the options used when registering batches.
    #[must_use]
    pub fn with_submit_options(mut self, options: SubmitOptions) -> Self {
        self.submit_options = options;
        self
    }

    /// Set how malformed output lines are handled.
    #[must_use]
    pub fn with_parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.parse_policy = policy;
        self
    }

    /// The request parameters applied to every prompt.
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Replace the loaded inputs wholesale.
    pub fn load_inputs(&mut self, inputs: InputRecords) {
        self.inputs = inputs;
    }

    /// Parse `path` and replace the loaded inputs with its prompts.
    ///
    /// On error the previously loaded inputs are kept.
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let inputs = parse_input_file(path)?;
        let count = inputs.len();
        self.inputs = inputs;
        info!(path = %path.display(), prompts = count, "Loaded prompts");
        Ok(count)
    }

    /// The currently loaded inputs.
    pub fn inputs(&self) -> &InputRecords {
        &self.inputs
    }

    /// Whether there is anything to submit.
    pub fn is_ready(&self) -> bool {
        !self.inputs.is_empty()
    }

    /// The tracked job, if any.
    pub fn current_job(&self) -> Option<&SubmittedJob> {
        self.current.as_ref()
    }

    /// Encode the loaded inputs and submit them as a new batch.
    ///
    /// A job that is already tracked is abandoned (not cancelled remotely).
    /// If submission fails the session is left without a job.
    pub async fn submit(&mut self) -> Result<&SubmittedJob> {
        if !self.is_ready() {
            return Err(BatchError::InvalidInput("no prompts loaded".to_string()));
        }

        if let Some(previous) = self.current.take() {
            warn!(batch_id = %previous.id(), "Abandoning tracked batch for a new submission");
        }

        let requests = encode(&self.inputs, &self.config);
        let batch = submit(self.api.as_ref(), &requests, &self.submit_options).await?;

        Ok(self.current.insert(SubmittedJob { batch, inputs: self.inputs.clone() }))
    }

    /// Track an existing batch submitted for `inputs`.
    pub fn attach(&mut self, batch_id: impl Into<String>, inputs: InputRecords) -> &SubmittedJob {
        let batch = BatchObject {
            id: batch_id.into(),
            status: BatchStatus::Validating,
            endpoint: None,
            input_file_id: None,
            completion_window: None,
            output_file_id: None,
            error_file_id: None,
            created_at: None,
            request_counts: None,
        };
        if let Some(previous) = self.current.take() {
            warn!(batch_id = %previous.id(), "Abandoning tracked batch");
        }
        self.current.insert(SubmittedJob { batch, inputs })
    }

    /// Query the tracked job's status once.
    ///
    /// # Errors
    /// `InvalidInput` without a tracked job, `StatusFetchError` if the query fails.
    pub async fn refresh_status(&mut self) -> Result<&BatchObject> {
        let api = Arc::clone(&self.api);
        let job = self.job_mut()?;
        let batch = api.retrieve_batch(job.id()).await.map_err(|source| {
            BatchError::StatusFetchError { batch_id: job.id().to_string(), source }
        })?;
        job.batch = batch;
        Ok(&job.batch)
    }

    /// Poll the tracked job until it finishes, then reconcile its results once.
    ///
    /// Nothing is downloaded unless the job completes.
    pub async fn wait<F>(
        &mut self,
        policy: &PollPolicy,
        cancel: &CancellationToken,
        on_status: F,
    ) -> Result<ResultTable>
    where
        F: FnMut(&BatchObject) + Send,
    {
        let api = Arc::clone(&self.api);
        let job = self.job_mut()?;
        let batch = poll_until_terminal(api.as_ref(), job.id(), policy, cancel, on_status).await?;
        job.batch = batch;
        self.fetch_and_reconcile().await
    }

    /// Download the tracked job's output and join it with the job's inputs.
    ///
    /// # Errors
    /// `ResultFetchError` if the job has no output yet, `ParseError` under the
    /// strict policy.
    pub async fn fetch_and_reconcile(&self) -> Result<ResultTable> {
        let job = self.job()?;
        let artifact = fetch_results(self.api.as_ref(), &job.batch).await?;
        let table = reconcile(&artifact, &job.inputs, self.parse_policy)?;

        info!(
            batch_id = %job.id(),
            rows = table.len(),
            matched = table.matched(),
            "Results reconciled"
        );
        Ok(table)
    }

    fn job(&self) -> Result<&SubmittedJob> {
        self.current
            .as_ref()
            .ok_or_else(|| BatchError::InvalidInput("no batch has been submitted".to_string()))
    }

    fn job_mut(&mut self) -> Result<&mut SubmittedJob> {
        self.current
            .as_mut()
            .ok_or_else(|| BatchError::InvalidInput("no batch has been submitted".to_string()))
    }
}

impl std::fmt::Debug for BatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSession")
            .field("provider", &self.api.provider_id())
            .field("config", &self.config)
            .field("parse_policy", &self.parse_policy)
            .field("inputs", &self.inputs.len())
            .field("current", &self.current.as_ref().map(SubmittedJob::id))
            .finish()
    }
}
