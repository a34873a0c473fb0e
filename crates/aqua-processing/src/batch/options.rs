use aqua_core::constants::MAX_BATCH_CONCURRENCY;
use aqua_core::models::{BatchProgress, EnhancementLevel, TaskState};
use aqua_core::BatchError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Aggregate progress callback
pub type BatchProgressFn = Arc<dyn Fn(BatchProgress) + Send + Sync>;

/// Event subscriber
pub type BatchEventFn = Arc<dyn Fn(&BatchEvent) + Send + Sync>;

/// What a subscriber sees while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// A task moved to a new state
    TaskState { index: usize, state: TaskState },
    /// Bytes handed to the object store for one task, 0..=100
    UploadProgress { index: usize, percent: u8 },
    /// A task reached a terminal state; aggregate progress after it
    Progress(BatchProgress),
    /// A file was never started because the batch was cancelled
    Skipped { index: usize },
}

/// Whether a failed enhancement is written to the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LedgerPolicy {
    /// Only tasks that reached `Enhanced` are recorded
    #[default]
    SkipFailed,
    /// Also record `status = failed` when the enhance stage fails
    RecordFailedEnhancements,
}

/// Per-run options for [`BatchCoordinator::run_batch`](super::BatchCoordinator::run_batch).
#[derive(Clone)]
pub struct BatchOptions {
    pub level: EnhancementLevel,
    pub email: Option<String>,
    /// Tasks in flight at once, 1..=4. 1 processes strictly in order.
    pub concurrency: usize,
    pub ledger_policy: LedgerPolicy,
    pub on_progress: Option<BatchProgressFn>,
    pub on_event: Option<BatchEventFn>,
    /// Checked before each task starts; a started task always finishes.
    pub cancel: CancellationToken,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            level: EnhancementLevel::default(),
            email: None,
            concurrency: 1,
            ledger_policy: LedgerPolicy::default(),
            on_progress: None,
            on_event: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl BatchOptions {
    pub fn new(level: EnhancementLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_ledger_policy(mut self, policy: LedgerPolicy) -> Self {
        self.ledger_policy = policy;
        self
    }

    pub fn with_progress(mut self, f: impl Fn(BatchProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn with_events(mut self, f: impl Fn(&BatchEvent) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(f));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Reject malformed options before any stage runs.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.concurrency == 0 || self.concurrency > MAX_BATCH_CONCURRENCY {
            return Err(BatchError::InvalidOptions(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_BATCH_CONCURRENCY, self.concurrency
            )));
        }

        if let Some(email) = &self.email {
            if !is_plausible_email(email) {
                return Err(BatchError::InvalidOptions(format!(
                    "invalid email address: {:?}",
                    email
                )));
            }
        }

        Ok(())
    }

    pub(crate) fn emit(&self, event: BatchEvent) {
        if let Some(f) = &self.on_event {
            f(&event);
        }
    }
}

impl std::fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("level", &self.level)
            .field("email", &self.email)
            .field("concurrency", &self.concurrency)
            .field("ledger_policy", &self.ledger_policy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.contains('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sequential_and_valid() {
        let options = BatchOptions::default();
        assert_eq!(options.concurrency, 1);
        assert_eq!(options.level, EnhancementLevel::Auto);
        assert_eq!(options.ledger_policy, LedgerPolicy::SkipFailed);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn concurrency_out_of_range_is_rejected() {
        assert!(BatchOptions::default().with_concurrency(0).validate().is_err());
        assert!(BatchOptions::default().with_concurrency(5).validate().is_err());
        assert!(BatchOptions::default().with_concurrency(4).validate().is_ok());
    }

    #[test]
    fn email_is_checked() {
        assert!(BatchOptions::default()
            .with_email("diver@example.com")
            .validate()
            .is_ok());
        for bad in ["", "   ", "diver", "diver@", "@example.com", "a b@example.com", "x@y"] {
            assert!(
                BatchOptions::default().with_email(bad).validate().is_err(),
                "{bad:?} accepted"
            );
        }
    }
}
