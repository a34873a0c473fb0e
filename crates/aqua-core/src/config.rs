//! Configuration module
//!
//! Pipeline configuration read from the environment (a `.env` file is honoured),
//! covering the backend endpoints, credential and ledger backends, validation
//! limits and per-stage timeouts.

use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_PRESIGN_EXPIRY_SECS, DEFAULT_UPLOAD_PREFIX,
    MAX_BATCH_CONCURRENCY,
};
use crate::models::EnhancementLevel;

const MAX_FILE_SIZE_MB: u64 = 10;
const CREDENTIAL_TIMEOUT_SECS: u64 = 15;
const UPLOAD_TIMEOUT_SECS: u64 = 120;
const ENHANCE_TIMEOUT_SECS: u64 = 120;
const LEDGER_TIMEOUT_SECS: u64 = 10;

/// Where write credentials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialBackend {
    /// The backend's presign endpoint
    Remote,
    /// Signed locally against S3
    S3,
}

/// Where outcomes are recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    None,
    Http,
    Notion,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    // Backend API
    pub api_url: String,
    /// Sent as `X-API-Key`
    pub api_key: Option<String>,
    /// Sent as `Authorization: Bearer` when no API key is set
    pub api_token: Option<String>,
    pub presign_path: String,
    pub enhance_path: String,
    // Validation
    pub max_file_size_bytes: u64,
    pub allowed_content_types: Vec<String>,
    // Credentials
    pub credential_backend: CredentialBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub cdn_base: Option<String>,
    pub upload_prefix: String,
    pub presign_expiry_secs: u64,
    // Enhancement
    pub default_enhancement_level: EnhancementLevel,
    // Ledger
    pub ledger_backend: LedgerBackend,
    pub ledger_path: String,
    pub ledger_failed_enhancements: bool,
    pub notion_api_key: Option<String>,
    pub notion_database_id: Option<String>,
    pub notion_api_url: String,
    // Timeouts
    pub credential_timeout: Duration,
    pub upload_timeout: Duration,
    pub enhance_timeout: Duration,
    pub ledger_timeout: Duration,
    // Batch
    pub batch_concurrency: usize,
}

fn env_secs(name: &str, default: u64) -> Duration {
    Duration::from_secs(
        env::var(name)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
    )
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn megabytes_to_bytes(mb: u64) -> Result<u64, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large: {}", mb))
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            api_key: None,
            api_token: None,
            presign_path: "/api/presign-put".to_string(),
            enhance_path: "/api/enhance-image".to_string(),
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|ct| ct.to_string())
                .collect(),
            credential_backend: CredentialBackend::Remote,
            s3_bucket: None,
            s3_region: None,
            cdn_base: None,
            upload_prefix: DEFAULT_UPLOAD_PREFIX.to_string(),
            presign_expiry_secs: DEFAULT_PRESIGN_EXPIRY_SECS,
            default_enhancement_level: EnhancementLevel::Auto,
            ledger_backend: LedgerBackend::None,
            ledger_path: "/api/notion-log".to_string(),
            ledger_failed_enhancements: false,
            notion_api_key: None,
            notion_database_id: None,
            notion_api_url: "https://api.notion.com".to_string(),
            credential_timeout: Duration::from_secs(CREDENTIAL_TIMEOUT_SECS),
            upload_timeout: Duration::from_secs(UPLOAD_TIMEOUT_SECS),
            enhance_timeout: Duration::from_secs(ENHANCE_TIMEOUT_SECS),
            ledger_timeout: Duration::from_secs(LEDGER_TIMEOUT_SECS),
            batch_concurrency: 1,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_FILE_SIZE_MB);
        let max_file_size_bytes = megabytes_to_bytes(max_file_size_mb)?;

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_CONTENT_TYPES.join(","))
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let credential_backend = match env::var("CREDENTIAL_BACKEND")
            .unwrap_or_else(|_| "remote".to_string())
            .to_lowercase()
            .as_str()
        {
            "remote" => CredentialBackend::Remote,
            "s3" => CredentialBackend::S3,
            other => {
                return Err(anyhow::anyhow!(
                    "CREDENTIAL_BACKEND must be 'remote' or 's3', got '{}'",
                    other
                ))
            }
        };

        let ledger_backend = match env::var("LEDGER_BACKEND")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" | "" => LedgerBackend::None,
            "http" => LedgerBackend::Http,
            "notion" => LedgerBackend::Notion,
            other => {
                return Err(anyhow::anyhow!(
                    "LEDGER_BACKEND must be 'none', 'http' or 'notion', got '{}'",
                    other
                ))
            }
        };

        let default_enhancement_level = env::var("ENHANCEMENT_LEVEL")
            .unwrap_or_else(|_| "auto".to_string())
            .parse::<EnhancementLevel>()
            .map_err(|e| anyhow::anyhow!("ENHANCEMENT_LEVEL: {}", e))?;

        let batch_concurrency = env::var("BATCH_CONCURRENCY")
            .unwrap_or_else(|_| "1".to_string())
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("BATCH_CONCURRENCY must be a valid number"))?;

        Ok(Self {
            api_url: env::var("AQUA_API_URL")
                .or_else(|_| env::var("API_URL"))
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            api_key: env_non_empty("AQUA_API_KEY"),
            api_token: env_non_empty("AQUA_API_TOKEN"),
            presign_path: env::var("PRESIGN_PATH")
                .unwrap_or_else(|_| "/api/presign-put".to_string()),
            enhance_path: env::var("ENHANCE_PATH")
                .unwrap_or_else(|_| "/api/enhance-image".to_string()),
            max_file_size_bytes,
            allowed_content_types,
            credential_backend,
            s3_bucket: env_non_empty("S3_BUCKET"),
            s3_region: env_non_empty("S3_REGION").or_else(|| env_non_empty("AWS_REGION")),
            cdn_base: env_non_empty("CDN_BASE"),
            upload_prefix: env::var("UPLOAD_PREFIX")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_PREFIX.to_string()),
            presign_expiry_secs: env::var("PRESIGN_EXPIRY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PRESIGN_EXPIRY_SECS),
            default_enhancement_level,
            ledger_backend,
            ledger_path: env::var("LEDGER_PATH").unwrap_or_else(|_| "/api/notion-log".to_string()),
            ledger_failed_enhancements: env_flag("LEDGER_FAILED_ENHANCEMENTS", false),
            notion_api_key: env_non_empty("NOTION_API_KEY"),
            notion_database_id: env_non_empty("NOTION_DB_SUBMISSIONS"),
            notion_api_url: env::var("NOTION_API_URL")
                .unwrap_or_else(|_| "https://api.notion.com".to_string()),
            credential_timeout: env_secs("CREDENTIAL_TIMEOUT_SECS", CREDENTIAL_TIMEOUT_SECS),
            upload_timeout: env_secs("UPLOAD_TIMEOUT_SECS", UPLOAD_TIMEOUT_SECS),
            enhance_timeout: env_secs("ENHANCE_TIMEOUT_SECS", ENHANCE_TIMEOUT_SECS),
            ledger_timeout: env_secs("LEDGER_TIMEOUT_SECS", LEDGER_TIMEOUT_SECS),
            batch_concurrency,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "AQUA_API_URL must be an http(s) URL, got '{}'",
                self.api_url
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_CONTENT_TYPES must not be empty"));
        }

        if let Some(bad) = self
            .allowed_content_types
            .iter()
            .find(|ct| !ct.starts_with("image/"))
        {
            return Err(anyhow::anyhow!(
                "ALLOWED_CONTENT_TYPES may only list image types, got '{}'",
                bad
            ));
        }

        if self.credential_backend == CredentialBackend::S3
            && (self.s3_bucket.is_none() || self.s3_region.is_none())
        {
            return Err(anyhow::anyhow!(
                "CREDENTIAL_BACKEND=s3 requires S3_BUCKET and S3_REGION (or AWS_REGION) to be set"
            ));
        }

        if self.ledger_backend == LedgerBackend::Notion
            && (self.notion_api_key.is_none() || self.notion_database_id.is_none())
        {
            return Err(anyhow::anyhow!(
                "LEDGER_BACKEND=notion requires NOTION_API_KEY and NOTION_DB_SUBMISSIONS to be set"
            ));
        }

        if self.batch_concurrency == 0 || self.batch_concurrency > MAX_BATCH_CONCURRENCY {
            return Err(anyhow::anyhow!(
                "BATCH_CONCURRENCY must be between 1 and {}",
                MAX_BATCH_CONCURRENCY
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> PipelineConfig {
        PipelineConfig {
            allowed_content_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut config = base_config();
        config.credential_backend = CredentialBackend::S3;
        assert!(config.validate().is_err());

        config.s3_bucket = Some("photos".to_string());
        config.s3_region = Some("ap-northeast-2".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn notion_backend_requires_credentials() {
        let mut config = base_config();
        config.ledger_backend = LedgerBackend::Notion;
        assert!(config.validate().is_err());

        config.notion_api_key = Some("secret_abc".to_string());
        config.notion_database_id = Some("db".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_image_allow_list() {
        let mut config = base_config();
        config.allowed_content_types = vec!["application/pdf".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn concurrency_is_bounded() {
        let mut config = base_config();
        config.batch_concurrency = 0;
        assert!(config.validate().is_err());
        config.batch_concurrency = MAX_BATCH_CONCURRENCY + 1;
        assert!(config.validate().is_err());
        config.batch_concurrency = MAX_BATCH_CONCURRENCY;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_size_limit_overflow_is_an_error() {
        assert_eq!(megabytes_to_bytes(10).unwrap(), 10 * 1024 * 1024);
        assert!(megabytes_to_bytes(u64::MAX / 1024).is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.presign_expiry_secs, 900);
        assert!(config.api_key.is_none() && config.api_token.is_none());
    }
}
