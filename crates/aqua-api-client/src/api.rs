//! Wire types for the backend endpoints.
//!
//! Field names follow the backend's camelCase JSON. Response fields the pipeline
//! checks itself are `Option` so an incomplete body decodes and is rejected with
//! a precise reason instead of a parse error.

use aqua_core::models::EnhancementLevel;
use serde::{Deserialize, Serialize};

/// Body of the credential (presign) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub filename: String,
    pub content_type: String,
}

/// Credential (presign) response. `url` may be absent even on HTTP 200.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    pub url: Option<String>,
    pub key: Option<String>,
    #[serde(default)]
    pub public_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    pub image_url: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub enhancement_level: EnhancementLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    pub enhanced_url: Option<String>,
    /// Milliseconds, as claimed by the service
    pub processing_time: Option<f64>,
    pub notion_logged: Option<bool>,
}
