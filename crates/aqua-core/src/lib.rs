//! Aqua Core Library
//!
//! Domain models, the per-stage error taxonomy, and configuration shared by
//! every crate of the upload → enhance → ledger pipeline.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{CredentialBackend, LedgerBackend, PipelineConfig};
pub use error::{
    BatchError, CredentialError, EnhancementError, ErrorMetadata, LedgerError, LogLevel,
    RejectReason, StageError, TransferError, UnknownEnhancementLevel, ValidationError, Violation,
};
