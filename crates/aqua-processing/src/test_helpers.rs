//! Recording doubles for the pipeline seams.

use aqua_core::models::{Credential, Enhancement, EnhancementLevel, LedgerOutcome};
use aqua_core::{CredentialError, EnhancementError, LedgerError, TransferError};
use aqua_services::{EnhancementInvoker, LedgerRecorder, LedgerSink};
use aqua_storage::{CredentialBroker, DirectUploader, ProgressFn};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::batch::BatchCoordinator;
use crate::validator::FileValidator;

#[derive(Default)]
pub struct MockBroker {
    calls: AtomicUsize,
    fixed_key: Mutex<Option<String>>,
    empty_public_url: AtomicBool,
    failure: Mutex<Option<fn() -> CredentialError>>,
}

impl MockBroker {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn use_fixed_key(&self, key: &str) {
        *self.fixed_key.lock().unwrap() = Some(key.to_string());
    }

    pub fn use_empty_public_url(&self) {
        self.empty_public_url.store(true, Ordering::SeqCst);
    }

    pub fn fail_with(&self, f: fn() -> CredentialError) {
        *self.failure.lock().unwrap() = Some(f);
    }
}

#[async_trait]
impl CredentialBroker for MockBroker {
    async fn request_credential(
        &self,
        sanitized_name: &str,
        _mime_type: &str,
    ) -> Result<Credential, CredentialError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(f) = *self.failure.lock().unwrap() {
            return Err(f());
        }

        let object_key = self
            .fixed_key
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| format!("uploads/{n}/{sanitized_name}"));
        let public_url = if self.empty_public_url.load(Ordering::SeqCst) {
            String::new()
        } else {
            format!("https://cdn.test/{object_key}")
        };

        Ok(Credential {
            upload_url: format!("https://store.test/{object_key}?sig=abc"),
            object_key,
            public_url,
            expires_at: Utc::now() + chrono::Duration::minutes(15),
        })
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

#[derive(Default)]
pub struct MockUploader {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Mutex<Duration>,
    failures: Mutex<Vec<(String, fn() -> TransferError)>>,
}

impl MockUploader {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Fail uploads whose object key ends with `/{name}`.
    pub fn fail_for(&self, name: &str, f: fn() -> TransferError) {
        self.failures
            .lock()
            .unwrap()
            .push((format!("/{name}"), f));
    }
}

#[async_trait]
impl DirectUploader for MockUploader {
    async fn upload(
        &self,
        credential: Credential,
        _data: Bytes,
        _mime_type: &str,
        on_progress: Option<ProgressFn>,
    ) -> Result<(), TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(suffix, _)| credential.object_key.ends_with(suffix.as_str()))
            .map(|(_, f)| *f);
        if let Some(f) = failure {
            return Err(f());
        }

        if let Some(progress) = on_progress {
            progress(50);
            progress(100);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockInvoker {
    calls: AtomicUsize,
    failure: Mutex<Option<fn() -> EnhancementError>>,
}

impl MockInvoker {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, f: fn() -> EnhancementError) {
        *self.failure.lock().unwrap() = Some(f);
    }
}

#[async_trait]
impl EnhancementInvoker for MockInvoker {
    async fn enhance(
        &self,
        public_url: &str,
        _sanitized_name: &str,
        _level: EnhancementLevel,
        _email: Option<&str>,
    ) -> Result<Enhancement, EnhancementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if public_url.is_empty() {
            return Err(EnhancementError::InputMissing);
        }
        if let Some(f) = *self.failure.lock().unwrap() {
            return Err(f());
        }

        Ok(Enhancement {
            derived_url: format!("{public_url}?enhanced=1"),
            processing_time_ms: 42,
            reported_time_ms: None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum SinkMode {
    #[default]
    Accept,
    Panic,
    Hang,
}

#[derive(Default)]
pub struct MockSink {
    mode: SinkMode,
    calls: AtomicUsize,
    records: Mutex<Vec<LedgerOutcome>>,
}

impl MockSink {
    pub fn panicking() -> Self {
        Self {
            mode: SinkMode::Panic,
            ..Default::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            mode: SinkMode::Hang,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<LedgerOutcome> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerSink for MockSink {
    async fn write(&self, outcome: &LedgerOutcome) -> Result<(), LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            SinkMode::Accept => {
                self.records.lock().unwrap().push(outcome.clone());
                Ok(())
            }
            SinkMode::Panic => panic!("ledger sink exploded"),
            SinkMode::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// One set of doubles wired into a coordinator.
pub struct Harness {
    pub broker: Arc<MockBroker>,
    pub uploader: Arc<MockUploader>,
    pub invoker: Arc<MockInvoker>,
    pub sink: Arc<MockSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_sink(MockSink::default())
    }

    pub fn with_sink(sink: MockSink) -> Self {
        Self {
            broker: Arc::new(MockBroker::default()),
            uploader: Arc::new(MockUploader::default()),
            invoker: Arc::new(MockInvoker::default()),
            sink: Arc::new(sink),
        }
    }

    pub fn coordinator(&self) -> BatchCoordinator {
        self.coordinator_with_ledger_timeout(Duration::from_secs(5))
    }

    pub fn coordinator_with_ledger_timeout(&self, timeout: Duration) -> BatchCoordinator {
        BatchCoordinator::new(
            FileValidator::default(),
            self.broker.clone(),
            self.uploader.clone(),
            self.invoker.clone(),
            LedgerRecorder::new(self.sink.clone(), timeout),
        )
    }

    /// Calls made to any remote seam.
    pub fn total_calls(&self) -> usize {
        self.broker.calls() + self.uploader.calls() + self.invoker.calls() + self.sink.calls()
    }
}
