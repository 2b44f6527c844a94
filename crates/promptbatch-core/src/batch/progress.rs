//! Progress tracking while a batch is polled.

use promptbatch_abstraction::{BatchObject, BatchStatus};
use std::time::{Duration, Instant};

/// Tracks what the status queries of one batch have reported so far.
#[derive(Debug, Clone)]
pub struct PollProgress {
    /// Number of requests submitted.
    pub total: usize,
    /// Requests the service reports as completed.
    pub completed: usize,
    /// Requests the service reports as failed.
    pub failed: usize,
    /// Status queries answered.
    pub checks: u32,
    /// Most recent status.
    pub status: Option<BatchStatus>,
    /// When polling started.
    pub start_time: Instant,
}

impl PollProgress {
    /// Create a new tracker for `total` requests.
    pub fn new(total: usize) -> Self {
        Self { total, completed: 0, failed: 0, checks: 0, status: None, start_time: Instant::now() }
    }

    /// Record one status query result.
    pub fn update(&mut self, batch: &BatchObject) {
        self.checks += 1;
        self.status = Some(batch.status);
        if let Some(counts) = &batch.request_counts {
            if counts.total > 0 {
                self.total = counts.total as usize;
            }
            self.completed = counts.completed as usize;
            self.failed = counts.failed as usize;
        }
    }

    /// Get completion percentage.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }

    /// Time since polling started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// One-line summary, e.g. `in_progress 12/40 (30%) after 1m 5s`.
    pub fn status_line(&self) -> String {
        let status = self.status.map_or("submitted", BatchStatus::as_str);
        let mut line = format!(
            "{} {}/{} ({:.0}%) after {}",
            status,
            self.completed,
            self.total,
            self.percentage(),
            format_duration(self.elapsed())
        );
        if self.failed > 0 {
            line.push_str(&format!(", {} failed", self.failed));
        }
        line
    }
}

/// Format duration as human-readable string.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptbatch_abstraction::RequestCounts;

    fn batch(status: BatchStatus, counts: Option<RequestCounts>) -> BatchObject {
        BatchObject {
            id: "batch_1".to_string(),
            status,
            endpoint: None,
            input_file_id: None,
            completion_window: None,
            output_file_id: None,
            error_file_id: None,
            created_at: None,
            request_counts: counts,
        }
    }

    #[test]
    fn test_progress_new() {
        let progress = PollProgress::new(10);
        assert_eq!(progress.total, 10);
        assert_eq!(progress.checks, 0);
        assert!(progress.status.is_none());
        assert!(progress.status_line().starts_with("submitted 0/10"));
    }

    #[test]
    fn test_progress_update() {
        let mut progress = PollProgress::new(10);
        progress.update(&batch(BatchStatus::InProgress, Some(RequestCounts { total: 8, completed: 2, failed: 1 })));

        assert_eq!(progress.checks, 1);
        assert_eq!(progress.total, 8);
        assert_eq!(progress.completed, 2);
        assert!((progress.percentage() - 25.0).abs() < 0.1);

        let line = progress.status_line();
        assert!(line.starts_with("in_progress 2/8 (25%)"));
        assert!(line.ends_with(", 1 failed"));
    }

    #[test]
    fn test_progress_update_without_counts() {
        let mut progress = PollProgress::new(4);
        progress.update(&batch(BatchStatus::Validating, None));
        progress.update(&batch(BatchStatus::Validating, Some(RequestCounts::default())));

        assert_eq!(progress.checks, 2);
        assert_eq!(progress.total, 4);
        assert_eq!(progress.status, Some(BatchStatus::Validating));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
