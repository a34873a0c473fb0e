//! Direct object upload over HTTP PUT.

use aqua_core::models::Credential;
use aqua_core::{RejectReason, TransferError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use std::time::Duration;

use crate::traits::{DirectUploader, ProgressFn};
use crate::{StorageError, StorageResult};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Uploader that PUTs the raw bytes to the credential's signed URL.
///
/// The body is streamed in chunks so progress follows the bytes handed to the
/// connection. Progress is capped at 99 until the store answers 2xx.
#[derive(Clone, Debug)]
pub struct HttpDirectUploader {
    client: Client,
    chunk_size: usize,
}

impl HttpDirectUploader {
    pub fn new(timeout: Duration) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ClientError(e.to_string()))?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

/// Map an object store response status onto the transfer taxonomy.
pub fn classify_status(status: u16, message: String) -> TransferError {
    let reason = match status {
        401 | 403 => RejectReason::AccessDenied,
        400 => RejectReason::MalformedRequest,
        500..=599 => return TransferError::ServerError { status, message },
        _ => RejectReason::Other,
    };
    TransferError::Rejected {
        reason,
        status: Some(status),
        message,
    }
}

fn progress_body(data: Bytes, chunk_size: usize, on_progress: Option<ProgressFn>) -> Body {
    let total = data.len();
    let chunks: Vec<Bytes> = (0..total)
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(total)))
        .collect();

    let mut sent = 0usize;
    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len();
        if let Some(cb) = &on_progress {
            let pct = (sent * 100 / total.max(1)).min(99) as u8;
            cb(pct);
        }
        Ok::<Bytes, std::io::Error>(chunk)
    }));

    Body::wrap_stream(stream)
}

#[async_trait]
impl DirectUploader for HttpDirectUploader {
    #[tracing::instrument(skip(self, credential, data, on_progress), fields(
        object_key = %credential.object_key,
        size = data.len(),
        content_type = %mime_type
    ))]
    async fn upload(
        &self,
        credential: Credential,
        data: Bytes,
        mime_type: &str,
        on_progress: Option<ProgressFn>,
    ) -> Result<(), TransferError> {
        if credential.is_expired() {
            return Err(TransferError::Rejected {
                reason: RejectReason::CredentialExpired,
                status: None,
                message: format!("credential expired at {}", credential.expires_at),
            });
        }

        if let Some(cb) = &on_progress {
            cb(0);
        }

        let start = std::time::Instant::now();
        let size = data.len();
        let body = progress_body(data, self.chunk_size, on_progress.clone());

        let response = self
            .client
            .put(&credential.upload_url)
            .header(CONTENT_TYPE, mime_type)
            .header(CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransferError::Network("upload timed out".to_string())
                } else {
                    TransferError::Network(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = status
                .canonical_reason()
                .unwrap_or("Upload failed")
                .to_string();
            return Err(classify_status(status.as_u16(), message));
        }

        if let Some(cb) = &on_progress {
            cb(100);
        }

        tracing::info!(
            size_bytes = size,
            duration_ms = start.elapsed().as_millis() as u64,
            "Direct upload successful"
        );

        Ok(())
    }
}
