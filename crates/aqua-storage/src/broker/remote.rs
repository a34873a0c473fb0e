use aqua_api_client::{ApiClient, ApiError, PresignRequest, PresignResponse};
use aqua_core::models::Credential;
use aqua_core::CredentialError;
use async_trait::async_trait;
use chrono::Utc;

use crate::traits::CredentialBroker;

/// Broker backed by the backend's presign endpoint.
#[derive(Clone, Debug)]
pub struct RemoteCredentialBroker {
    client: ApiClient,
    path: String,
    expires_in_secs: u64,
}

impl RemoteCredentialBroker {
    pub fn new(client: ApiClient, path: impl Into<String>, expires_in_secs: u64) -> Self {
        Self {
            client,
            path: path.into(),
            expires_in_secs,
        }
    }
}

/// Map a backend failure onto the credential taxonomy using status and machine
/// code only.
pub(crate) fn classify_api_error(err: ApiError) -> CredentialError {
    match err {
        ApiError::Status {
            status,
            code,
            message,
        } => {
            if matches!(status, 401 | 403) || code.as_deref() == Some("access_denied") {
                CredentialError::AccessDenied {
                    status: Some(status),
                    message,
                }
            } else {
                CredentialError::Unavailable {
                    status: Some(status),
                    message,
                }
            }
        }
        ApiError::Timeout => CredentialError::Unavailable {
            status: None,
            message: "credential request timed out".to_string(),
        },
        ApiError::Network(message) => CredentialError::Unavailable {
            status: None,
            message,
        },
        ApiError::Decode(message) => CredentialError::MalformedResponse(message),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl CredentialBroker for RemoteCredentialBroker {
    #[tracing::instrument(skip(self), fields(credential.backend = "remote"))]
    async fn request_credential(
        &self,
        sanitized_name: &str,
        mime_type: &str,
    ) -> Result<Credential, CredentialError> {
        let request = PresignRequest {
            filename: sanitized_name.to_string(),
            content_type: mime_type.to_string(),
        };

        let response: PresignResponse = self
            .client
            .post_json(&self.path, &request)
            .await
            .map_err(classify_api_error)?;

        let upload_url = non_empty(response.url).ok_or_else(|| {
            CredentialError::MalformedResponse("response has no upload url".to_string())
        })?;
        let object_key = non_empty(response.key).ok_or_else(|| {
            CredentialError::MalformedResponse("response has no object key".to_string())
        })?;

        tracing::debug!(object_key = %object_key, "Credential issued");

        Ok(Credential {
            object_key,
            upload_url,
            public_url: response.public_url,
            expires_at: Utc::now() + chrono::Duration::seconds(self.expires_in_secs as i64),
        })
    }

    fn backend_name(&self) -> &'static str {
        "remote"
    }
}
