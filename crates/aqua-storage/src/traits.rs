//! Credential and upload abstractions
//!
//! The coordinator only talks to these traits, so brokers and uploaders can be
//! swapped (remote presign endpoint, local S3 signing, test doubles).

use aqua_core::models::Credential;
use aqua_core::{CredentialError, TransferError};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Upload progress callback, called with a percentage in 0..=100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Issues single-use write credentials.
///
/// Every call yields a fresh credential with a new object key; credentials are
/// never cached or shared between files.
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    /// Request a credential for an already sanitized name and its MIME type.
    async fn request_credential(
        &self,
        sanitized_name: &str,
        mime_type: &str,
    ) -> Result<Credential, CredentialError>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Writes file bytes straight to the object store.
#[async_trait]
pub trait DirectUploader: Send + Sync {
    /// Upload `data` with the given credential.
    ///
    /// The credential is consumed: a second attempt needs a new one.
    /// `on_progress` receives non-decreasing percentages and 100 on success.
    async fn upload(
        &self,
        credential: Credential,
        data: Bytes,
        mime_type: &str,
        on_progress: Option<ProgressFn>,
    ) -> Result<(), TransferError>;
}
