//! Aqua Processing Library
//!
//! Local file validation and the batch coordinator that drives each file
//! through validate → credential → upload → enhance → ledger.

pub mod batch;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use batch::{
    BatchCoordinator, BatchEvent, BatchEventFn, BatchOptions, BatchProgressFn, LedgerPolicy,
};
pub use validator::{guess_content_type, normalize_content_type, sanitize_filename, FileValidator};
