//! Shared HTTP client for the Aqua backend.
//!
//! Provides a minimal client with optional auth (X-API-Key or Bearer token) and a
//! JSON POST helper whose errors keep the HTTP status and the backend's machine
//! error code, so callers can classify failures without reading message text.
//! The storage broker, the enhancement invoker and the HTTP ledger sink share it.

pub mod api;

use anyhow::{Context, Result};
use aqua_core::PipelineConfig;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Authentication strategy for the backend.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
}

impl Auth {
    /// Auth configured for the backend. An API key wins over a bearer token.
    pub fn from_config(config: &PipelineConfig) -> Option<Self> {
        config
            .api_key
            .clone()
            .map(Auth::XApiKey)
            .or_else(|| config.api_token.clone().map(Auth::Bearer))
    }
}

/// Failure of a backend call, with enough structure to classify it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status
    #[error("API request failed with status {status}: {message}")]
    Status {
        status: u16,
        /// Machine code from the `error` field of the body, when present
        code: Option<String>,
        message: String,
    },

    #[error("API request timed out")]
    Timeout,

    /// No response at all (DNS, connect, reset)
    #[error("Failed to send request: {0}")]
    Network(String),

    /// 2xx with a body that does not match the expected shape
    #[error("Failed to parse response as JSON: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Error body shape used by the backend: `{error, detail, message}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<String>,
    message: Option<String>,
}

/// Build an [`ApiError::Status`] from a status and raw body text.
///
/// The `error` field is kept as the machine code; `message` or `detail` become
/// the human message. A non-JSON body is used verbatim.
pub fn status_error(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            let message = parsed
                .message
                .or(parsed.detail)
                .or_else(|| parsed.error.clone())
                .unwrap_or_else(|| "Unknown error".to_string());
            ApiError::Status {
                status,
                code: parsed.error,
                message,
            }
        }
        Err(_) => ApiError::Status {
            status,
            code: None,
            message: if body.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                body.trim().to_string()
            },
        },
    }
}

/// HTTP client for the backend with optional auth and a fixed timeout.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Option<Auth>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Option<Auth>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(Auth::Bearer(token)) => {
                request.header("Authorization", format!("Bearer {}", token))
            }
            Some(Auth::XApiKey(key)) => request.header("X-API-Key", key.as_str()),
            None => request,
        }
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let text = self.post_json_raw(path, body).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// POST JSON body; returns the raw body of a 2xx response.
    pub async fn post_json_raw<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, ApiError> {
        let url = self.build_url(path);
        let request = self.client.post(&url).json(body);
        let request = self.apply_auth(request);

        tracing::debug!(path = %path, "POST backend");

        let response = request.send().await.map_err(ApiError::from_reqwest)?;

        let status = response.status();
        let text = response.text().await.map_err(ApiError::from_reqwest)?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }

        Ok(text)
    }
}

// Re-export wire types for convenience.
pub use api::{EnhanceRequest, EnhanceResponse, PresignRequest, PresignResponse};
