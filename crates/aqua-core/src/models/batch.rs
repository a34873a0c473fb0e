use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{TaskState, UploadTask};

/// A file submitted to a batch.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Aggregate progress: terminal tasks over submitted files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    /// 0–100. Exactly 100.0 once every task is terminal.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Final result of a batch run: terminal snapshots in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub tasks: Vec<UploadTask>,
    pub success_count: usize,
    pub failure_count: usize,
    /// Files never started because the batch was cancelled
    pub skipped_count: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn from_tasks(
        batch_id: Uuid,
        tasks: Vec<UploadTask>,
        skipped_count: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        let success_count = tasks
            .iter()
            .filter(|t| t.state() == TaskState::Logged)
            .count();
        let failure_count = tasks
            .iter()
            .filter(|t| t.state() == TaskState::Failed)
            .count();

        Self {
            batch_id,
            tasks,
            success_count,
            failure_count,
            skipped_count,
            cancelled: skipped_count > 0,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn empty(batch_id: Uuid) -> Self {
        Self::from_tasks(batch_id, Vec::new(), 0, Utc::now())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0 && !self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PipelineStage, TaskFailure};

    #[test]
    fn progress_reaches_exactly_one_hundred() {
        let progress = BatchProgress {
            completed: 3,
            total: 3,
        };
        assert_eq!(progress.percent(), 100.0);
        assert!(progress.is_complete());

        let progress = BatchProgress {
            completed: 1,
            total: 4,
        };
        assert_eq!(progress.percent(), 25.0);
    }

    #[test]
    fn report_counts_terminal_states() {
        let mut ok = UploadTask::new(0, "a.jpg", 10, "image/jpeg");
        ok.mark_validated("a.jpg").unwrap();
        ok.mark_credential_issued("k/a.jpg", "https://cdn/k/a.jpg")
            .unwrap();
        ok.mark_uploaded().unwrap();
        ok.mark_enhanced("https://cdn/k/a_enhanced.jpg", 5).unwrap();
        ok.mark_logged(false).unwrap();

        let mut failed = UploadTask::new(1, "b.txt", 10, "text/plain");
        failed
            .fail(TaskFailure {
                stage: PipelineStage::Validate,
                kind: "Invalid".to_string(),
                message: "Not an image".to_string(),
            })
            .unwrap();

        let report = BatchReport::from_tasks(Uuid::new_v4(), vec![ok, failed], 0, Utc::now());
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);
        assert!(!report.cancelled);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn empty_report_has_no_counts() {
        let report = BatchReport::empty(Uuid::new_v4());
        assert!(report.tasks.is_empty());
        assert_eq!(report.success_count, 0);
        assert_eq!(report.failure_count, 0);
        assert!(report.all_succeeded());
    }
}
