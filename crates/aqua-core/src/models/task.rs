use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorMetadata, StageError};

/// Position of an [`UploadTask`] in the pipeline state machine.
///
/// Transitions only move forward; `Logged` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Validated,
    CredentialIssued,
    Uploaded,
    Enhanced,
    Logged,
    Failed,
}

impl TaskState {
    fn rank(self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Validated => 1,
            TaskState::CredentialIssued => 2,
            TaskState::Uploaded => 3,
            TaskState::Enhanced => 4,
            TaskState::Logged | TaskState::Failed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Logged | TaskState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Validated => "validated",
            TaskState::CredentialIssued => "credential_issued",
            TaskState::Uploaded => "uploaded",
            TaskState::Enhanced => "enhanced",
            TaskState::Logged => "logged",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage that can fail a task. The ledger is deliberately absent: it never fails one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Validate,
    Credential,
    Upload,
    Enhance,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Validate => "validate",
            PipelineStage::Credential => "credential",
            PipelineStage::Upload => "upload",
            PipelineStage::Enhance => "enhance",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a task ended in `Failed`: enough to render a precise reason without
/// looking at transport details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub stage: PipelineStage,
    pub kind: String,
    pub message: String,
}

impl From<&StageError> for TaskFailure {
    fn from(err: &StageError) -> Self {
        Self {
            stage: err.stage(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Invalid task transition from {from} to {to}")]
    Invalid { from: TaskState, to: TaskState },

    #[error("Task already reached terminal state {0}")]
    Terminal(TaskState),

    #[error("Object key already assigned to this task")]
    ObjectKeyAlreadySet,
}

/// One file's journey through the pipeline.
///
/// Fields are only reachable through the transition methods so the state
/// machine invariants hold: transitions are monotonic, the object key is set at
/// most once, `failure` is present exactly when the state is `Failed`, and
/// nothing changes after a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTask {
    index: usize,
    raw_name: String,
    sanitized_name: Option<String>,
    size: u64,
    mime_type: String,
    state: TaskState,
    object_key: Option<String>,
    public_url: Option<String>,
    derived_url: Option<String>,
    processing_time_ms: Option<u64>,
    ledger_logged: bool,
    failure: Option<TaskFailure>,
}

impl UploadTask {
    pub fn new(
        index: usize,
        raw_name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            index,
            raw_name: raw_name.into(),
            sanitized_name: None,
            size,
            mime_type: mime_type.into(),
            state: TaskState::Pending,
            object_key: None,
            public_url: None,
            derived_url: None,
            processing_time_ms: None,
            ledger_logged: false,
            failure: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    pub fn sanitized_name(&self) -> Option<&str> {
        self.sanitized_name.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn object_key(&self) -> Option<&str> {
        self.object_key.as_deref()
    }

    pub fn public_url(&self) -> Option<&str> {
        self.public_url.as_deref()
    }

    pub fn derived_url(&self) -> Option<&str> {
        self.derived_url.as_deref()
    }

    pub fn processing_time_ms(&self) -> Option<u64> {
        self.processing_time_ms
    }

    pub fn ledger_logged(&self) -> bool {
        self.ledger_logged
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        self.failure.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.state == TaskState::Logged
    }

    fn transition(&mut self, from: TaskState, to: TaskState) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::Terminal(self.state));
        }
        if self.state != from || to.rank() <= from.rank() {
            return Err(TransitionError::Invalid {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// `Pending -> Validated`
    pub fn mark_validated(
        &mut self,
        sanitized_name: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.transition(TaskState::Pending, TaskState::Validated)?;
        self.sanitized_name = Some(sanitized_name.into());
        Ok(())
    }

    /// `Validated -> CredentialIssued`; assigns the broker's object key.
    pub fn mark_credential_issued(
        &mut self,
        object_key: impl Into<String>,
        public_url: impl Into<String>,
    ) -> Result<(), TransitionError> {
        if self.object_key.is_some() {
            return Err(TransitionError::ObjectKeyAlreadySet);
        }
        self.transition(TaskState::Validated, TaskState::CredentialIssued)?;
        self.object_key = Some(object_key.into());
        let public_url = public_url.into();
        self.public_url = (!public_url.is_empty()).then_some(public_url);
        Ok(())
    }

    /// `CredentialIssued -> Uploaded`
    pub fn mark_uploaded(&mut self) -> Result<(), TransitionError> {
        self.transition(TaskState::CredentialIssued, TaskState::Uploaded)
    }

    /// `Uploaded -> Enhanced`
    pub fn mark_enhanced(
        &mut self,
        derived_url: impl Into<String>,
        processing_time_ms: u64,
    ) -> Result<(), TransitionError> {
        self.transition(TaskState::Uploaded, TaskState::Enhanced)?;
        self.derived_url = Some(derived_url.into());
        self.processing_time_ms = Some(processing_time_ms);
        Ok(())
    }

    /// `Enhanced -> Logged`, whatever the ledger said.
    pub fn mark_logged(&mut self, ledger_logged: bool) -> Result<(), TransitionError> {
        self.transition(TaskState::Enhanced, TaskState::Logged)?;
        self.ledger_logged = ledger_logged;
        Ok(())
    }

    /// Record a ledger write made before the task reaches a terminal state
    /// (failed enhancements, when that policy is enabled).
    pub fn note_ledger_result(&mut self, ledger_logged: bool) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::Terminal(self.state));
        }
        self.ledger_logged = ledger_logged;
        Ok(())
    }

    /// Any non-terminal state `-> Failed`.
    pub fn fail(&mut self, failure: TaskFailure) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::Terminal(self.state));
        }
        self.state = TaskState::Failed;
        self.failure = Some(failure);
        Ok(())
    }
}
