use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownEnhancementLevel;

/// Transform intensity. A closed set: anything else is rejected before a
/// request is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementLevel {
    #[default]
    Auto,
    Light,
    Medium,
    Strong,
}

impl EnhancementLevel {
    pub const ALL: [EnhancementLevel; 4] = [
        EnhancementLevel::Auto,
        EnhancementLevel::Light,
        EnhancementLevel::Medium,
        EnhancementLevel::Strong,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EnhancementLevel::Auto => "auto",
            EnhancementLevel::Light => "light",
            EnhancementLevel::Medium => "medium",
            EnhancementLevel::Strong => "strong",
        }
    }
}

impl fmt::Display for EnhancementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnhancementLevel {
    type Err = UnknownEnhancementLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(EnhancementLevel::Auto),
            "light" => Ok(EnhancementLevel::Light),
            "medium" => Ok(EnhancementLevel::Medium),
            "strong" => Ok(EnhancementLevel::Strong),
            _ => Err(UnknownEnhancementLevel(s.to_string())),
        }
    }
}

/// Result of a successful transform call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enhancement {
    pub derived_url: String,
    /// Wall-clock duration measured around the call by the client
    pub processing_time_ms: u64,
    /// Duration the service claims, kept for comparison only
    pub reported_time_ms: Option<u64>,
}
