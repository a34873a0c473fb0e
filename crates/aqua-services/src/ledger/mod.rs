//! Best-effort outcome ledger.
//!
//! [`LedgerRecorder::record`] never fails: sink errors, timeouts and panics all
//! collapse to `false` and are logged. Pipeline success never depends on it.

pub mod fields;
mod http;
mod notion;

pub use http::HttpLedgerSink;
pub use notion::NotionLedgerSink;

use aqua_api_client::{ApiClient, Auth};
use aqua_core::models::LedgerOutcome;
use aqua_core::{LedgerBackend, LedgerError, PipelineConfig};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Destination for ledger records.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    async fn write(&self, outcome: &LedgerOutcome) -> Result<(), LedgerError>;

    /// Short sink name for logs
    fn name(&self) -> &'static str;
}

/// Wraps an optional sink and turns every failure into `false`.
#[derive(Clone)]
pub struct LedgerRecorder {
    sink: Option<Arc<dyn LedgerSink>>,
    timeout: Duration,
}

impl LedgerRecorder {
    pub fn new(sink: Arc<dyn LedgerSink>, timeout: Duration) -> Self {
        Self {
            sink: Some(sink),
            timeout,
        }
    }

    /// Recorder with no sink; every record reports `false`.
    pub fn disabled() -> Self {
        Self {
            sink: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Write one outcome. Returns whether the sink accepted it.
    pub async fn record(&self, outcome: &LedgerOutcome) -> bool {
        let Some(sink) = &self.sink else {
            tracing::debug!("Ledger disabled, skipping record");
            return false;
        };

        let write = AssertUnwindSafe(sink.write(outcome)).catch_unwind();
        let result = match tokio::time::timeout(self.timeout, write).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(LedgerError::Panicked),
            Err(_) => Err(LedgerError::Timeout(self.timeout)),
        };

        match result {
            Ok(()) => {
                tracing::debug!(sink = sink.name(), "Ledger record written");
                true
            }
            Err(e @ LedgerError::Panicked) => {
                tracing::error!(sink = sink.name(), error = %e, "Ledger write failed");
                false
            }
            Err(e) => {
                tracing::warn!(sink = sink.name(), error = %e, "Ledger write failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for LedgerRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerRecorder")
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Create a ledger recorder based on configuration
pub fn create_ledger_recorder(config: &PipelineConfig) -> Result<LedgerRecorder, LedgerError> {
    let sink: Arc<dyn LedgerSink> = match config.ledger_backend {
        LedgerBackend::None => return Ok(LedgerRecorder::disabled()),
        LedgerBackend::Http => {
            let client = ApiClient::new(
                config.api_url.clone(),
                Auth::from_config(config),
                config.ledger_timeout,
            )
            .map_err(|e| LedgerError::NotConfigured(e.to_string()))?;
            Arc::new(HttpLedgerSink::new(client, config.ledger_path.clone()))
        }
        LedgerBackend::Notion => {
            let api_key = config.notion_api_key.clone().ok_or_else(|| {
                LedgerError::NotConfigured("NOTION_API_KEY not configured".to_string())
            })?;
            let database_id = config.notion_database_id.clone().ok_or_else(|| {
                LedgerError::NotConfigured("NOTION_DB_SUBMISSIONS not configured".to_string())
            })?;
            Arc::new(NotionLedgerSink::new(
                config.notion_api_url.clone(),
                api_key,
                database_id,
                config.ledger_timeout,
            )?)
        }
    };

    Ok(LedgerRecorder::new(sink, config.ledger_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqua_core::models::LedgerStatus;

    struct StaticSink {
        fail: bool,
    }

    #[async_trait]
    impl LedgerSink for StaticSink {
        async fn write(&self, _outcome: &LedgerOutcome) -> Result<(), LedgerError> {
            if self.fail {
                return Err(LedgerError::Network("connection refused".to_string()));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    struct PanickingSink;

    #[async_trait]
    impl LedgerSink for PanickingSink {
        async fn write(&self, _outcome: &LedgerOutcome) -> Result<(), LedgerError> {
            panic!("sink exploded");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    struct SlowSink;

    #[async_trait]
    impl LedgerSink for SlowSink {
        async fn write(&self, _outcome: &LedgerOutcome) -> Result<(), LedgerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn outcome() -> LedgerOutcome {
        LedgerOutcome::new("reef.jpg", "https://cdn/reef.jpg").with_status(LedgerStatus::Enhanced)
    }

    #[tokio::test]
    async fn accepted_write_is_true() {
        let recorder = LedgerRecorder::new(
            Arc::new(StaticSink { fail: false }),
            Duration::from_secs(1),
        );
        assert!(recorder.record(&outcome()).await);
    }

    #[tokio::test]
    async fn sink_error_is_false() {
        let recorder = LedgerRecorder::new(
            Arc::new(StaticSink { fail: true }),
            Duration::from_secs(1),
        );
        assert!(!recorder.record(&outcome()).await);
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let recorder = LedgerRecorder::new(Arc::new(PanickingSink), Duration::from_secs(1));
        assert!(!recorder.record(&outcome()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_false() {
        let recorder = LedgerRecorder::new(Arc::new(SlowSink), Duration::from_secs(1));
        assert!(!recorder.record(&outcome()).await);
    }

    #[tokio::test]
    async fn disabled_recorder_is_false() {
        let recorder = LedgerRecorder::disabled();
        assert!(!recorder.is_enabled());
        assert!(!recorder.record(&outcome()).await);
    }
}
