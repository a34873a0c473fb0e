use aqua_core::models::LedgerOutcome;
use aqua_core::LedgerError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::fields::to_notion_properties;
use super::LedgerSink;

const NOTION_VERSION: &str = "2022-06-28";

/// Sink that creates one page per outcome in a Notion database.
#[derive(Clone)]
pub struct NotionLedgerSink {
    client: Client,
    base_url: String,
    api_key: String,
    database_id: String,
}

impl NotionLedgerSink {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        database_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            database_id: database_id.into(),
        })
    }
}

impl std::fmt::Debug for NotionLedgerSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionLedgerSink")
            .field("base_url", &self.base_url)
            .field("database_id", &self.database_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LedgerSink for NotionLedgerSink {
    async fn write(&self, outcome: &LedgerOutcome) -> Result<(), LedgerError> {
        let properties = to_notion_properties(outcome)?;
        let body = serde_json::json!({
            "parent": { "database_id": self.database_id },
            "properties": properties,
        });

        let response = self
            .client
            .post(format!("{}/v1/pages", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // Notion errors look like {"object":"error","code":"...","message":"..."}
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or(text);
            return Err(LedgerError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "notion"
    }
}
