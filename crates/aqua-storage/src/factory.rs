#[cfg(feature = "storage-s3")]
use crate::{S3BrokerSettings, S3CredentialBroker};
use crate::{CredentialBroker, RemoteCredentialBroker, StorageError, StorageResult};
use aqua_api_client::{ApiClient, Auth};
use aqua_core::{CredentialBackend, PipelineConfig};
use std::sync::Arc;

/// Create a credential broker based on configuration
pub fn create_credential_broker(config: &PipelineConfig) -> StorageResult<Arc<dyn CredentialBroker>> {
    match config.credential_backend {
        CredentialBackend::Remote => {
            let client = ApiClient::new(
                config.api_url.clone(),
                Auth::from_config(config),
                config.credential_timeout,
            )
            .map_err(|e| StorageError::ClientError(e.to_string()))?;

            Ok(Arc::new(RemoteCredentialBroker::new(
                client,
                config.presign_path.clone(),
                config.presign_expiry_secs,
            )))
        }

        #[cfg(feature = "storage-s3")]
        CredentialBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;

            let broker = S3CredentialBroker::new(S3BrokerSettings {
                bucket,
                region,
                cdn_base: config.cdn_base.clone(),
                prefix: config.upload_prefix.clone(),
                expires_in: std::time::Duration::from_secs(config.presign_expiry_secs),
            })?;
            Ok(Arc::new(broker))
        }

        #[cfg(not(feature = "storage-s3"))]
        CredentialBackend::S3 => Err(StorageError::ConfigError(
            "S3 credential backend not available (storage-s3 feature not enabled)".to_string(),
        )),
    }
}
