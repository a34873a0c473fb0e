//! Batch orchestration
//!
//! [`BatchCoordinator`] runs each submitted file through the pipeline stages and
//! isolates failures per file. [`BatchOptions`] carries the per-run settings and
//! the progress, event and cancellation hooks.

mod coordinator;
mod options;

pub use coordinator::BatchCoordinator;
pub use options::{BatchEvent, BatchEventFn, BatchOptions, BatchProgressFn, LedgerPolicy};
