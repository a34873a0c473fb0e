//! Domain models for the upload → enhance → ledger pipeline.

pub mod batch;
pub mod credential;
pub mod enhancement;
pub mod ledger;
pub mod task;

pub use batch::{BatchProgress, BatchReport, SourceFile};
pub use credential::Credential;
pub use enhancement::{Enhancement, EnhancementLevel};
pub use ledger::{LedgerOutcome, LedgerStatus};
pub use task::{PipelineStage, TaskFailure, TaskState, TransitionError, UploadTask};
