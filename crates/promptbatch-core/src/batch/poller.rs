//! Status polling for a submitted batch.
//!
//! The loop is sequential: the next status query is only scheduled once the
//! previous one has returned, so two queries are never in flight together.

use crate::batch::error::{BatchError, Result};
use crate::batch::types::PollPolicy;
use promptbatch_abstraction::{BatchApi, BatchObject};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Polls `batch_id` until it reaches a terminal status.
///
/// Every successfully fetched status is passed to `on_status` before it is
/// evaluated. Returns the job once it is `completed`.
///
/// # Errors
/// - `JobFailed` if the job ends `failed`, `expired` or `cancelled`
/// - `StatusFetchError` after `max_consecutive_errors` failed queries in a row
/// - `MaxAttemptsExceeded` if the attempt cap is hit first
/// - `Cancelled` if `cancel` fires while waiting
pub async fn poll_until_terminal<F>(
    api: &dyn BatchApi,
    batch_id: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut on_status: F,
) -> Result<BatchObject>
where
    F: FnMut(&BatchObject) + Send,
{
    let mut attempt: u32 = 0;
    let mut consecutive_errors: u32 = 0;

    loop {
        if let Some(max) = policy.max_attempts {
            if attempt >= max {
                warn!(batch_id, attempts = attempt, "Giving up on batch");
                return Err(BatchError::MaxAttemptsExceeded {
                    batch_id: batch_id.to_string(),
                    attempts: attempt,
                });
            }
        }

        let delay = policy.delay_for(attempt);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled(batch_id)),
            () = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled(batch_id)),
            fetched = api.retrieve_batch(batch_id) => fetched,
        };

        let batch = match fetched {
            Ok(batch) => {
                consecutive_errors = 0;
                batch
            }
            Err(source) => {
                consecutive_errors += 1;
                if consecutive_errors >= policy.max_consecutive_errors {
                    return Err(BatchError::StatusFetchError {
                        batch_id: batch_id.to_string(),
                        source,
                    });
                }
                warn!(
                    batch_id,
                    attempt,
                    consecutive_errors,
                    error = %source,
                    "Status query failed, retrying"
                );
                continue;
            }
        };

        debug!(batch_id, attempt, status = %batch.status, "Batch status");
        on_status(&batch);

        if batch.status.is_failure() {
            warn!(batch_id, status = %batch.status, "Batch ended without results");
            return Err(BatchError::JobFailed { batch_id: batch_id.to_string(), status: batch.status });
        }
        if batch.status.is_terminal() {
            info!(batch_id, attempts = attempt, "Batch completed");
            return Ok(batch);
        }
    }
}

fn cancelled(batch_id: &str) -> BatchError {
    info!(batch_id, "Polling cancelled");
    BatchError::Cancelled { batch_id: batch_id.to_string() }
}
