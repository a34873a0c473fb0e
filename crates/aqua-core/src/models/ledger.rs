use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EnhancementLevel;

/// Status written to the ledger for a processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Enhanced,
    Failed,
}

impl LedgerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::Enhanced => "enhanced",
            LedgerStatus::Failed => "failed",
        }
    }
}

/// Partially-filled record handed to the ledger.
///
/// Every field is optional at the type level; sinks decide which ones they
/// require and simply omit absent optional ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerOutcome {
    pub filename: Option<String>,
    pub email: Option<String>,
    pub original_url: Option<String>,
    pub output_url: Option<String>,
    pub status: Option<LedgerStatus>,
    pub enhancement_level: Option<EnhancementLevel>,
    pub processing_time_ms: Option<u64>,
    pub notes: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl LedgerOutcome {
    pub fn new(filename: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            original_url: Some(original_url.into()),
            recorded_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: LedgerStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn with_output_url(mut self, output_url: impl Into<String>) -> Self {
        self.output_url = Some(output_url.into());
        self
    }

    pub fn with_level(mut self, level: EnhancementLevel) -> Self {
        self.enhancement_level = Some(level);
        self
    }

    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = Some(processing_time_ms);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
