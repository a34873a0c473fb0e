//! Image transform invocation.

use aqua_api_client::{ApiClient, ApiError, EnhanceRequest, EnhanceResponse};
use aqua_core::models::{Enhancement, EnhancementLevel};
use aqua_core::EnhancementError;
use async_trait::async_trait;
use std::time::Instant;

/// Calls the remote transform for an uploaded object.
#[async_trait]
pub trait EnhancementInvoker: Send + Sync {
    /// Transform the object at `public_url`.
    ///
    /// An empty `public_url` fails with `InputMissing` before any call is made.
    async fn enhance(
        &self,
        public_url: &str,
        sanitized_name: &str,
        level: EnhancementLevel,
        email: Option<&str>,
    ) -> Result<Enhancement, EnhancementError>;
}

/// Invoker backed by the backend's enhance endpoint.
#[derive(Clone, Debug)]
pub struct HttpEnhancementInvoker {
    client: ApiClient,
    path: String,
}

impl HttpEnhancementInvoker {
    pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }
}

fn classify_api_error(err: ApiError) -> EnhancementError {
    match err {
        ApiError::Status {
            status, message, ..
        } => EnhancementError::RemoteFailure { status, message },
        ApiError::Timeout => EnhancementError::Network("enhancement timed out".to_string()),
        ApiError::Network(message) => EnhancementError::Network(message),
        ApiError::Decode(message) => EnhancementError::RemoteFailure {
            status: 200,
            message: format!("unreadable response: {}", message),
        },
    }
}

#[async_trait]
impl EnhancementInvoker for HttpEnhancementInvoker {
    #[tracing::instrument(skip(self, email))]
    async fn enhance(
        &self,
        public_url: &str,
        sanitized_name: &str,
        level: EnhancementLevel,
        email: Option<&str>,
    ) -> Result<Enhancement, EnhancementError> {
        if public_url.trim().is_empty() {
            return Err(EnhancementError::InputMissing);
        }

        let request = EnhanceRequest {
            image_url: public_url.to_string(),
            filename: sanitized_name.to_string(),
            email: email.map(String::from),
            enhancement_level: level,
        };

        let start = Instant::now();
        let result = self
            .client
            .post_json::<EnhanceResponse, _>(&self.path, &request)
            .await;
        let processing_time_ms = start.elapsed().as_millis() as u64;

        let response = result.map_err(classify_api_error)?;

        let derived_url = response
            .enhanced_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| EnhancementError::RemoteFailure {
                status: 200,
                message: "response has no enhancedUrl".to_string(),
            })?;

        let reported_time_ms = response
            .processing_time
            .filter(|t| t.is_finite() && *t >= 0.0)
            .map(|t| t.round() as u64);

        tracing::info!(
            processing_time_ms = processing_time_ms,
            reported_time_ms = ?reported_time_ms,
            "Enhancement complete"
        );

        Ok(Enhancement {
            derived_url,
            processing_time_ms,
            reported_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn invoker(url: &str, timeout: Duration) -> HttpEnhancementInvoker {
        let client = ApiClient::new(url, None, timeout).unwrap();
        HttpEnhancementInvoker::new(client, "/api/enhance-image")
    }

    #[tokio::test]
    async fn returns_derived_url_and_measured_time() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/enhance-image")
            .match_body(Matcher::Json(json!({
                "imageUrl": "https://cdn/reef.jpg",
                "filename": "reef.jpg",
                "email": "diver@example.com",
                "enhancementLevel": "medium"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "enhancedUrl": "https://cdn/reef_enhanced.jpg",
                    "processingTime": 99999,
                    "notionLogged": false
                })
                .to_string(),
            )
            .create_async()
            .await;

        let enhancement = invoker(&server.url(), Duration::from_secs(5))
            .enhance(
                "https://cdn/reef.jpg",
                "reef.jpg",
                EnhancementLevel::Medium,
                Some("diver@example.com"),
            )
            .await
            .unwrap();

        assert_eq!(enhancement.derived_url, "https://cdn/reef_enhanced.jpg");
        assert_eq!(enhancement.reported_time_ms, Some(99999));
        assert!(enhancement.processing_time_ms < 99999);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_public_url_makes_no_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = invoker(&server.url(), Duration::from_secs(5))
            .enhance("", "reef.jpg", EnhancementLevel::Auto, None)
            .await
            .unwrap_err();

        assert_eq!(err, EnhancementError::InputMissing);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_is_remote_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/enhance-image")
            .with_status(500)
            .with_body(json!({"ok": false, "error": "server", "detail": "model crashed"}).to_string())
            .create_async()
            .await;

        let err = invoker(&server.url(), Duration::from_secs(5))
            .enhance("https://cdn/reef.jpg", "reef.jpg", EnhancementLevel::Auto, None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            EnhancementError::RemoteFailure {
                status: 500,
                message: "model crashed".to_string()
            }
        );
    }

    #[tokio::test]
    async fn missing_enhanced_url_is_remote_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/enhance-image")
            .with_status(200)
            .with_body(json!({"processingTime": 10}).to_string())
            .create_async()
            .await;

        let err = invoker(&server.url(), Duration::from_secs(5))
            .enhance("https://cdn/reef.jpg", "reef.jpg", EnhancementLevel::Auto, None)
            .await
            .unwrap_err();

        assert!(matches!(err, EnhancementError::RemoteFailure { status: 200, .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_network() {
        let err = invoker("http://127.0.0.1:1", Duration::from_secs(2))
            .enhance("https://cdn/reef.jpg", "reef.jpg", EnhancementLevel::Auto, None)
            .await
            .unwrap_err();

        assert!(matches!(err, EnhancementError::Network(_)));
    }

    #[tokio::test]
    async fn slow_service_times_out_as_network() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/enhance-image")
            .with_status(200)
            .with_body_from_request(|_| {
                std::thread::sleep(Duration::from_secs(3));
                b"{}".to_vec()
            })
            .create_async()
            .await;

        let err = invoker(&server.url(), Duration::from_millis(300))
            .enhance("https://cdn/reef.jpg", "reef.jpg", EnhancementLevel::Auto, None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            EnhancementError::Network("enhancement timed out".to_string())
        );
    }
}
