use aqua_core::models::Credential;
use aqua_core::CredentialError;
use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use std::time::Duration;

use crate::keys::{bucket_public_base, generate_upload_key, is_valid_key, public_url};
use crate::traits::CredentialBroker;
use crate::{StorageError, StorageResult};

/// Settings for local S3 presigning.
#[derive(Clone, Debug)]
pub struct S3BrokerSettings {
    pub bucket: String,
    pub region: String,
    /// Public read base; defaults to the bucket's virtual-hosted URL
    pub cdn_base: Option<String>,
    pub prefix: String,
    pub expires_in: Duration,
}

/// Broker that signs PUT URLs locally, without a backend hop.
///
/// Keys are assigned here with the same layout the backend uses.
#[derive(Clone, Debug)]
pub struct S3CredentialBroker {
    store: AmazonS3,
    settings: S3BrokerSettings,
    public_base: String,
}

impl S3CredentialBroker {
    /// Build a broker using AWS credentials from the environment.
    pub fn new(settings: S3BrokerSettings) -> StorageResult<Self> {
        if settings.bucket.is_empty() {
            return Err(StorageError::ConfigError(
                "S3_BUCKET not configured".to_string(),
            ));
        }
        if settings.region.is_empty() {
            return Err(StorageError::ConfigError(
                "S3_REGION or AWS_REGION not configured".to_string(),
            ));
        }

        let store = AmazonS3Builder::from_env()
            .with_bucket_name(settings.bucket.clone())
            .with_region(settings.region.clone())
            .build()
            .map_err(|e| {
                StorageError::ConfigError(format!("Failed to build S3 object store: {}", e))
            })?;

        Ok(Self::from_store(store, settings))
    }

    /// Build a broker around an existing store.
    pub fn from_store(store: AmazonS3, settings: S3BrokerSettings) -> Self {
        let public_base = settings
            .cdn_base
            .clone()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| bucket_public_base(&settings.bucket, &settings.region));

        Self {
            store,
            settings,
            public_base,
        }
    }
}

#[async_trait]
impl CredentialBroker for S3CredentialBroker {
    #[tracing::instrument(skip(self), fields(credential.backend = "s3", s3.bucket = %self.settings.bucket))]
    async fn request_credential(
        &self,
        sanitized_name: &str,
        mime_type: &str,
    ) -> Result<Credential, CredentialError> {
        let now = Utc::now();
        let object_key = generate_upload_key(&self.settings.prefix, sanitized_name, now);
        if !is_valid_key(&object_key) {
            return Err(CredentialError::MalformedResponse(format!(
                "generated invalid object key: {}",
                object_key
            )));
        }

        let location = Path::from(object_key.clone());
        let url = self
            .store
            .signed_url(Method::PUT, &location, self.settings.expires_in)
            .await
            .map_err(|e| CredentialError::Unavailable {
                status: None,
                message: format!("Failed to generate presigned URL: {}", e),
            })?;

        tracing::info!(
            object_key = %object_key,
            expires_in_seconds = self.settings.expires_in.as_secs(),
            "Generated presigned PUT URL"
        );

        Ok(Credential {
            public_url: public_url(Some(&self.public_base), &object_key),
            object_key,
            upload_url: url.to_string(),
            expires_at: now + chrono::Duration::seconds(self.settings.expires_in.as_secs() as i64),
        })
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(cdn_base: Option<&str>) -> S3BrokerSettings {
        S3BrokerSettings {
            bucket: "photos".to_string(),
            region: "us-east-1".to_string(),
            cdn_base: cdn_base.map(String::from),
            prefix: "uploads".to_string(),
            expires_in: Duration::from_secs(900),
        }
    }

    fn broker(cdn_base: Option<&str>) -> S3CredentialBroker {
        let store = AmazonS3Builder::new()
            .with_bucket_name("photos")
            .with_region("us-east-1")
            .with_access_key_id("AKIDEXAMPLE")
            .with_secret_access_key("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
            .build()
            .unwrap();
        S3CredentialBroker::from_store(store, settings(cdn_base))
    }

    #[tokio::test]
    async fn signs_put_url_for_generated_key() {
        let credential = broker(None)
            .request_credential("reef.jpg", "image/jpeg")
            .await
            .unwrap();

        assert!(credential.object_key.starts_with("uploads/"));
        assert!(credential.object_key.ends_with("/reef.jpg"));
        assert!(credential.upload_url.contains("X-Amz-Signature"));
        assert!(credential.upload_url.contains("reef.jpg"));
        assert_eq!(
            credential.public_url,
            format!(
                "https://photos.s3.us-east-1.amazonaws.com/{}",
                credential.object_key
            )
        );
        assert!(!credential.is_expired());
    }

    #[tokio::test]
    async fn cdn_base_overrides_bucket_url() {
        let credential = broker(Some("https://cdn.example.com"))
            .request_credential("reef.jpg", "image/jpeg")
            .await
            .unwrap();

        assert!(credential
            .public_url
            .starts_with("https://cdn.example.com/uploads/"));
    }

    #[test]
    fn missing_bucket_is_a_config_error() {
        let mut s = settings(None);
        s.bucket = String::new();
        assert!(matches!(
            S3CredentialBroker::new(s),
            Err(StorageError::ConfigError(_))
        ));
    }
}
