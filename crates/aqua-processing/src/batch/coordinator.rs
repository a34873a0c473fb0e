use aqua_core::models::{
    BatchProgress, BatchReport, LedgerOutcome, LedgerStatus, PipelineStage, SourceFile,
    TaskFailure, TaskState, TransitionError, UploadTask,
};
use aqua_core::{BatchError, CredentialError, ErrorMetadata, LogLevel, StageError};
use aqua_services::{EnhancementInvoker, LedgerRecorder};
use aqua_storage::{CredentialBroker, DirectUploader, ProgressFn};
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::Instrument;
use uuid::Uuid;

use super::options::{BatchEvent, BatchOptions, LedgerPolicy};
use crate::validator::{normalize_content_type, FileValidator};

/// Drives files through validate → credential → upload → enhance → ledger.
///
/// Each task is isolated: a failure at any stage is attached to that task and
/// the batch moves on. Only malformed options make `run_batch` itself fail.
pub struct BatchCoordinator {
    validator: FileValidator,
    broker: Arc<dyn CredentialBroker>,
    uploader: Arc<dyn DirectUploader>,
    invoker: Arc<dyn EnhancementInvoker>,
    ledger: LedgerRecorder,
}

/// Cross-task state of one run.
struct RunState {
    total: usize,
    completed: AtomicUsize,
    issued_keys: Mutex<HashSet<String>>,
}

impl RunState {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            issued_keys: Mutex::new(HashSet::new()),
        }
    }

    /// Record an object key; false if another task of this run already got it.
    fn claim_key(&self, key: &str) -> bool {
        self.issued_keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string())
    }

    fn finish_task(&self) -> BatchProgress {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        BatchProgress {
            completed,
            total: self.total,
        }
    }
}

/// Apply a transition. A refused transition is a coordinator bug, not a
/// pipeline failure, so it is logged and the task is left as is.
fn transition(
    task: &mut UploadTask,
    options: &BatchOptions,
    apply: impl FnOnce(&mut UploadTask) -> Result<(), TransitionError>,
) {
    match apply(task) {
        Ok(()) => options.emit(BatchEvent::TaskState {
            index: task.index(),
            state: task.state(),
        }),
        Err(e) => tracing::error!(
            index = task.index(),
            state = %task.state(),
            error = %e,
            "Refused task transition"
        ),
    }
}

fn log_failure(index: usize, err: &StageError) {
    let stage = err.stage().as_str();
    let kind = err.kind();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(index, stage, kind, error = %err, "Task failed"),
        LogLevel::Warn => tracing::warn!(index, stage, kind, error = %err, "Task failed"),
        LogLevel::Error => tracing::error!(index, stage, kind, error = %err, "Task failed"),
    }
}

/// Stage that owns a task still sitting in `state`.
fn owning_stage(state: TaskState) -> PipelineStage {
    match state {
        TaskState::Pending => PipelineStage::Validate,
        TaskState::Validated => PipelineStage::Credential,
        TaskState::CredentialIssued => PipelineStage::Upload,
        _ => PipelineStage::Enhance,
    }
}

impl BatchCoordinator {
    pub fn new(
        validator: FileValidator,
        broker: Arc<dyn CredentialBroker>,
        uploader: Arc<dyn DirectUploader>,
        invoker: Arc<dyn EnhancementInvoker>,
        ledger: LedgerRecorder,
    ) -> Self {
        Self {
            validator,
            broker,
            uploader,
            invoker,
            ledger,
        }
    }

    /// Process `files` and report every task's terminal snapshot in input order.
    #[tracing::instrument(skip_all, fields(batch_id = tracing::field::Empty, files = files.len()))]
    pub async fn run_batch(
        &self,
        files: Vec<SourceFile>,
        options: BatchOptions,
    ) -> Result<BatchReport, BatchError> {
        options.validate()?;

        let batch_id = Uuid::new_v4();
        tracing::Span::current().record("batch_id", tracing::field::display(batch_id));

        if files.is_empty() {
            tracing::debug!("Empty batch");
            // An empty batch is complete as soon as it starts.
            let progress = BatchProgress {
                completed: 0,
                total: 0,
            };
            if let Some(f) = &options.on_progress {
                f(progress);
            }
            options.emit(BatchEvent::Progress(progress));
            return Ok(BatchReport::empty(batch_id));
        }

        let started_at = Utc::now();
        let total = files.len();
        let run = RunState::new(total);

        tracing::info!(
            total,
            concurrency = options.concurrency,
            level = %options.level,
            "Batch started"
        );

        let mut tasks: Vec<UploadTask> = futures::stream::iter(files.into_iter().enumerate())
            .map(|(index, file)| self.run_slot(index, file, &options, &run))
            .buffer_unordered(options.concurrency)
            .filter_map(|task| async move { task })
            .collect()
            .await;

        tasks.sort_by_key(|t| t.index());
        let skipped = total - tasks.len();

        let report = BatchReport::from_tasks(batch_id, tasks, skipped, started_at);

        tracing::info!(
            success_count = report.success_count,
            failure_count = report.failure_count,
            skipped_count = report.skipped_count,
            cancelled = report.cancelled,
            "Batch finished"
        );

        Ok(report)
    }

    /// Run one file unless the batch was cancelled before it started.
    async fn run_slot(
        &self,
        index: usize,
        file: SourceFile,
        options: &BatchOptions,
        run: &RunState,
    ) -> Option<UploadTask> {
        if options.cancel.is_cancelled() {
            tracing::info!(index, name = %file.name, "Batch cancelled, skipping file");
            options.emit(BatchEvent::Skipped { index });
            return None;
        }

        let span = tracing::info_span!("task", index, name = %file.name);
        let task = self.process(index, file, options, run).instrument(span).await;

        let progress = run.finish_task();
        if let Some(f) = &options.on_progress {
            f(progress);
        }
        options.emit(BatchEvent::Progress(progress));

        Some(task)
    }

    async fn process(
        &self,
        index: usize,
        file: SourceFile,
        options: &BatchOptions,
        run: &RunState,
    ) -> UploadTask {
        let mime_type = normalize_content_type(&file.mime_type);
        let mut task = UploadTask::new(index, file.name.as_str(), file.size(), mime_type.as_str());
        options.emit(BatchEvent::TaskState {
            index,
            state: task.state(),
        });

        if let Err(err) = self.drive(&mut task, file.data, options, run).await {
            log_failure(index, &err);
            transition(&mut task, options, |t| t.fail(TaskFailure::from(&err)));
        }

        if !task.state().is_terminal() {
            let stage = owning_stage(task.state());
            transition(&mut task, options, |t| {
                t.fail(TaskFailure {
                    stage,
                    kind: "Internal".to_string(),
                    message: "task stopped before reaching a terminal state".to_string(),
                })
            });
        }

        if task.is_success() {
            tracing::info!(
                object_key = task.object_key().unwrap_or_default(),
                ledger_logged = task.ledger_logged(),
                "Task complete"
            );
        }

        task
    }

    async fn drive(
        &self,
        task: &mut UploadTask,
        data: Bytes,
        options: &BatchOptions,
        run: &RunState,
    ) -> Result<(), StageError> {
        let index = task.index();
        let mime_type = task.mime_type().to_string();

        let sanitized = self
            .validator
            .validate(task.raw_name(), task.size(), &mime_type)?;
        transition(task, options, |t| t.mark_validated(sanitized.as_str()));

        let credential = self
            .broker
            .request_credential(&sanitized, &mime_type)
            .await?;
        if !run.claim_key(&credential.object_key) {
            return Err(CredentialError::MalformedResponse(format!(
                "object key {} was already issued in this batch",
                credential.object_key
            ))
            .into());
        }
        let object_key = credential.object_key.clone();
        let public_url = credential.public_url.clone();
        transition(task, options, |t| {
            t.mark_credential_issued(object_key, public_url)
        });

        let on_upload: Option<ProgressFn> = options.on_event.clone().map(|f| {
            Arc::new(move |percent: u8| f(&BatchEvent::UploadProgress { index, percent }))
                as ProgressFn
        });
        self.uploader
            .upload(credential, data, &mime_type, on_upload)
            .await?;
        transition(task, options, |t| t.mark_uploaded());

        let public_url = task.public_url().unwrap_or_default().to_string();
        let enhancement = match self
            .invoker
            .enhance(&public_url, &sanitized, options.level, options.email.as_deref())
            .await
        {
            Ok(enhancement) => enhancement,
            Err(err) => {
                if options.ledger_policy == LedgerPolicy::RecordFailedEnhancements {
                    let outcome = LedgerOutcome::new(sanitized.as_str(), public_url.as_str())
                        .with_status(LedgerStatus::Failed)
                        .with_email(options.email.clone())
                        .with_level(options.level)
                        .with_notes(err.to_string());
                    let logged = self.ledger.record(&outcome).await;
                    transition(task, options, |t| t.note_ledger_result(logged));
                }
                return Err(err.into());
            }
        };
        transition(task, options, |t| {
            t.mark_enhanced(
                enhancement.derived_url.as_str(),
                enhancement.processing_time_ms,
            )
        });

        let outcome = LedgerOutcome::new(sanitized.as_str(), public_url.as_str())
            .with_status(LedgerStatus::Enhanced)
            .with_email(options.email.clone())
            .with_output_url(enhancement.derived_url.as_str())
            .with_level(options.level)
            .with_processing_time(enhancement.processing_time_ms);
        let logged = self.ledger.record(&outcome).await;
        transition(task, options, |t| t.mark_logged(logged));

        Ok(())
    }
}
