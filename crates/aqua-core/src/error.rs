//! Error types module
//!
//! One tagged error enum per pipeline stage. Every variant is built from a
//! structured status or category at the call site, never from the text of a
//! remote message. `StageError` unifies the stage errors so the coordinator can
//! attach them to a task as a [`TaskFailure`](crate::models::TaskFailure).

use serde::{Deserialize, Serialize};

use crate::models::PipelineStage;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for rejected requests and remote failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata every stage error exposes so callers can report it without
/// inspecting transport internals.
pub trait ErrorMetadata {
    /// Stable machine-readable kind (e.g. `Rejected/AccessDenied`)
    fn kind(&self) -> &'static str;

    /// Whether a fresh attempt could plausibly succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// A single rule a candidate file broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Empty file")]
    EmptyFile,

    #[error("Not an image: {content_type}")]
    NotAnImage { content_type: String },

    #[error("Unsupported image type: {content_type} (allowed: {allowed:?})")]
    UnsupportedImageType {
        content_type: String,
        allowed: Vec<String>,
    },
}

/// Local validation failure. No I/O is attempted for a file that produces one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("File validation failed: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// Backend misconfigured, down, timed out or unreachable
    #[error("Credential service unavailable: {message}")]
    Unavailable { status: Option<u16>, message: String },

    #[error("Credential request denied: {message}")]
    AccessDenied { status: Option<u16>, message: String },

    /// A response without a usable write URL, even with HTTP 200
    #[error("Malformed credential response: {0}")]
    MalformedResponse(String),
}

/// Why the object store refused a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// HTTP 403
    AccessDenied,
    /// HTTP 400
    MalformedRequest,
    /// Credential expired before the write was attempted
    CredentialExpired,
    /// Any other 4xx
    Other,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::AccessDenied => "AccessDenied",
            RejectReason::MalformedRequest => "MalformedRequest",
            RejectReason::CredentialExpired => "CredentialExpired",
            RejectReason::Other => "Other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("Upload rejected ({reason}): {message}")]
    Rejected {
        reason: RejectReason,
        status: Option<u16>,
        message: String,
    },

    #[error("Storage server error: HTTP {status}: {message}")]
    ServerError { status: u16, message: String },

    /// No response: connection failure or timeout
    #[error("Network error during upload: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnhancementError {
    #[error("Enhancement input missing: no public URL for uploaded object")]
    InputMissing,

    #[error("Enhancement failed with HTTP {status}: {message}")]
    RemoteFailure { status: u16, message: String },

    /// No response: connection failure or timeout
    #[error("Network error during enhancement: {0}")]
    Network(String),
}

/// Ledger failures. Never propagated past the recorder.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Required ledger field missing: {0}")]
    MissingField(&'static str),

    #[error("Ledger rejected record with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Ledger unreachable: {0}")]
    Network(String),

    #[error("Ledger write timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Ledger sink panicked")]
    Panicked,

    #[error("Ledger not configured: {0}")]
    NotConfigured(String),
}

/// Unknown value for the closed enhancement-level enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown enhancement level: {0} (expected auto, light, medium or strong)")]
pub struct UnknownEnhancementLevel(pub String);

/// Errors `run_batch` itself returns. Per-item failures never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("Invalid batch options: {0}")]
    InvalidOptions(String),
}

/// Any error a stage can attach to a task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Enhancement(#[from] EnhancementError),
}

impl StageError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            StageError::Validation(_) => PipelineStage::Validate,
            StageError::Credential(_) => PipelineStage::Credential,
            StageError::Transfer(_) => PipelineStage::Upload,
            StageError::Enhancement(_) => PipelineStage::Enhance,
        }
    }
}

impl ErrorMetadata for ValidationError {
    fn kind(&self) -> &'static str {
        "Invalid"
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

impl ErrorMetadata for CredentialError {
    fn kind(&self) -> &'static str {
        match self {
            CredentialError::Unavailable { .. } => "Unavailable",
            CredentialError::AccessDenied { .. } => "AccessDenied",
            CredentialError::MalformedResponse(_) => "MalformedResponse",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, CredentialError::Unavailable { .. })
    }

    fn log_level(&self) -> LogLevel {
        match self {
            CredentialError::Unavailable { .. } => LogLevel::Error,
            CredentialError::AccessDenied { .. } => LogLevel::Warn,
            CredentialError::MalformedResponse(_) => LogLevel::Error,
        }
    }
}

impl ErrorMetadata for TransferError {
    fn kind(&self) -> &'static str {
        match self {
            TransferError::Rejected { reason, .. } => match reason {
                RejectReason::AccessDenied => "Rejected/AccessDenied",
                RejectReason::MalformedRequest => "Rejected/MalformedRequest",
                RejectReason::CredentialExpired => "Rejected/CredentialExpired",
                RejectReason::Other => "Rejected",
            },
            TransferError::ServerError { .. } => "ServerError",
            TransferError::Network(_) => "Network",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, TransferError::Rejected { .. })
    }

    fn log_level(&self) -> LogLevel {
        match self {
            TransferError::Rejected { .. } => LogLevel::Warn,
            TransferError::ServerError { .. } | TransferError::Network(_) => LogLevel::Error,
        }
    }
}

impl ErrorMetadata for EnhancementError {
    fn kind(&self) -> &'static str {
        match self {
            EnhancementError::InputMissing => "InputMissing",
            EnhancementError::RemoteFailure { .. } => "RemoteFailure",
            EnhancementError::Network(_) => "Network",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, EnhancementError::InputMissing)
    }

    fn log_level(&self) -> LogLevel {
        match self {
            EnhancementError::InputMissing => LogLevel::Warn,
            EnhancementError::RemoteFailure { .. } => LogLevel::Warn,
            EnhancementError::Network(_) => LogLevel::Error,
        }
    }
}

impl ErrorMetadata for StageError {
    fn kind(&self) -> &'static str {
        match self {
            StageError::Validation(e) => e.kind(),
            StageError::Credential(e) => e.kind(),
            StageError::Transfer(e) => e.kind(),
            StageError::Enhancement(e) => e.kind(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            StageError::Validation(e) => e.is_recoverable(),
            StageError::Credential(e) => e.is_recoverable(),
            StageError::Transfer(e) => e.is_recoverable(),
            StageError::Enhancement(e) => e.is_recoverable(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            StageError::Validation(e) => e.log_level(),
            StageError::Credential(e) => e.log_level(),
            StageError::Transfer(e) => e.log_level(),
            StageError::Enhancement(e) => e.log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_kinds_include_reject_reason() {
        let denied = TransferError::Rejected {
            reason: RejectReason::AccessDenied,
            status: Some(403),
            message: "Forbidden".to_string(),
        };
        assert_eq!(denied.kind(), "Rejected/AccessDenied");
        assert!(!denied.is_recoverable());

        let bad = TransferError::Rejected {
            reason: RejectReason::MalformedRequest,
            status: Some(400),
            message: "Bad Request".to_string(),
        };
        assert_eq!(bad.kind(), "Rejected/MalformedRequest");

        let server = TransferError::ServerError {
            status: 503,
            message: String::new(),
        };
        assert_eq!(server.kind(), "ServerError");
        assert!(server.is_recoverable());

        let busy = TransferError::ServerError {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(
            busy.to_string(),
            "Storage server error: HTTP 503: Service Unavailable"
        );
    }

    #[test]
    fn stage_error_maps_to_owning_stage() {
        let err = StageError::from(ValidationError {
            violations: vec![Violation::EmptyFile],
        });
        assert_eq!(err.stage(), PipelineStage::Validate);
        assert_eq!(err.log_level(), LogLevel::Debug);

        let err = StageError::from(EnhancementError::Network("timed out".to_string()));
        assert_eq!(err.stage(), PipelineStage::Enhance);
        assert_eq!(err.kind(), "Network");

        let err = StageError::from(CredentialError::MalformedResponse("no url".to_string()));
        assert_eq!(err.stage(), PipelineStage::Credential);
        assert_eq!(err.kind(), "MalformedResponse");
    }

    #[test]
    fn validation_error_lists_every_violation() {
        let err = ValidationError {
            violations: vec![
                Violation::FileTooLarge { size: 20, max: 10 },
                Violation::NotAnImage {
                    content_type: "text/plain".to_string(),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("File too large: 20 bytes"));
        assert!(message.contains("Not an image: text/plain"));
    }
}
