use aqua_api_client::{ApiClient, ApiError};
use aqua_core::models::LedgerOutcome;
use aqua_core::LedgerError;
use async_trait::async_trait;

use super::fields::to_flat_record;
use super::LedgerSink;

/// Sink that posts the flat record to the backend's ledger endpoint.
#[derive(Clone, Debug)]
pub struct HttpLedgerSink {
    client: ApiClient,
    path: String,
}

impl HttpLedgerSink {
    pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }
}

#[async_trait]
impl LedgerSink for HttpLedgerSink {
    async fn write(&self, outcome: &LedgerOutcome) -> Result<(), LedgerError> {
        let record = to_flat_record(outcome)?;

        let body = self
            .client
            .post_json_raw(&self.path, &record)
            .await
            .map_err(|e| match e {
                ApiError::Status {
                    status, message, ..
                } => LedgerError::Rejected { status, message },
                other => LedgerError::Network(other.to_string()),
            })?;

        // The endpoint may answer 200 with `{"ok": false}`.
        let accepted = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("ok").and_then(|ok| ok.as_bool()))
            .unwrap_or(true);
        if !accepted {
            return Err(LedgerError::Rejected {
                status: 200,
                message: "ledger endpoint reported ok=false".to_string(),
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
