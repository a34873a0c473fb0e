//! Aqua Storage Library
//!
//! Write credentials and direct uploads. A [`CredentialBroker`] issues a
//! single-use signed write URL for one object; a [`DirectUploader`] consumes it
//! with one HTTP PUT of the file bytes straight to the object store.
//!
//! # Object key format
//!
//! Keys are date-partitioned and carry a random suffix so two uploads of the same
//! name never collide:
//!
//! `{prefix}/{yyyy}/{mm}/{dd}/{epoch_ms}-{8 hex}/{name}`
//!
//! Key generation is centralized in the `keys` module so every broker that
//! assigns keys locally stays consistent with the backend's presign endpoint.

pub mod broker;
pub mod factory;
pub mod keys;
pub mod traits;
pub mod uploader;

// Re-export commonly used types
pub use broker::RemoteCredentialBroker;
#[cfg(feature = "storage-s3")]
pub use broker::{S3BrokerSettings, S3CredentialBroker};
pub use factory::create_credential_broker;
pub use traits::{CredentialBroker, DirectUploader, ProgressFn};
pub use uploader::HttpDirectUploader;

/// Construction-time storage errors. Per-upload failures use the stage errors
/// in `aqua_core::error`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP client error: {0}")]
    ClientError(String),
}

/// Result type for storage construction
pub type StorageResult<T> = Result<T, StorageError>;
