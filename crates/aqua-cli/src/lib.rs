use anyhow::Context;
use aqua_api_client::{ApiClient, Auth};
use aqua_core::models::{BatchReport, SourceFile};
use aqua_core::PipelineConfig;
use aqua_processing::{guess_content_type, BatchCoordinator, FileValidator, LedgerPolicy};
use aqua_services::{create_ledger_recorder, HttpEnhancementInvoker};
use aqua_storage::{create_credential_broker, HttpDirectUploader};
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

/// Content type sent when the extension says nothing.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// File name and guessed content type of a local path.
pub fn describe_path(path: &Path) -> (String, &'static str) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let content_type = guess_content_type(&name).unwrap_or(FALLBACK_CONTENT_TYPE);
    (name, content_type)
}

/// Read a local file into a batch input.
pub async fn load_source_file(path: &Path) -> anyhow::Result<SourceFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let (name, content_type) = describe_path(path);
    Ok(SourceFile::new(name, content_type, data))
}

pub fn ledger_policy(config: &PipelineConfig) -> LedgerPolicy {
    if config.ledger_failed_enhancements {
        LedgerPolicy::RecordFailedEnhancements
    } else {
        LedgerPolicy::SkipFailed
    }
}

/// Wire every pipeline stage from configuration.
pub fn build_coordinator(config: &PipelineConfig) -> anyhow::Result<BatchCoordinator> {
    let validator = FileValidator::new(
        config.max_file_size_bytes,
        config.allowed_content_types.clone(),
    );

    let broker = create_credential_broker(config).context("Failed to create credential broker")?;
    tracing::debug!(backend = broker.backend_name(), "Credential broker ready");

    let uploader = Arc::new(
        HttpDirectUploader::new(config.upload_timeout).context("Failed to create uploader")?,
    );

    let client = ApiClient::new(
        config.api_url.clone(),
        Auth::from_config(config),
        config.enhance_timeout,
    )
    .context("Failed to create enhancement client")?;
    let invoker = Arc::new(HttpEnhancementInvoker::new(client, config.enhance_path.clone()));

    let ledger = create_ledger_recorder(config).context("Failed to create ledger recorder")?;
    if !ledger.is_enabled() {
        tracing::info!("Ledger disabled; outcomes will not be recorded");
    }

    Ok(BatchCoordinator::new(validator, broker, uploader, invoker, ledger))
}

/// Plain-text rendering of a batch report.
pub fn render_report_table(report: &BatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Batch {} ===\n", report.batch_id);
    let _ = writeln!(
        out,
        "{:>3}  {:<32} {:<10} {:<6} DETAILS",
        "#", "FILE", "STATE", "LEDGER"
    );

    for task in &report.tasks {
        let details = match task.failure() {
            Some(failure) => format!("{}/{}: {}", failure.stage, failure.kind, failure.message),
            None => task.derived_url().unwrap_or_default().to_string(),
        };
        let ledger = if task.ledger_logged() { "yes" } else { "no" };
        let _ = writeln!(
            out,
            "{:>3}  {:<32} {:<10} {:<6} {}",
            task.index(),
            truncate_string(task.raw_name(), 32),
            task.state().as_str(),
            ledger,
            truncate_string(&details, 80)
        );
    }

    let _ = writeln!(
        out,
        "\nSucceeded: {}  Failed: {}  Skipped: {}",
        report.success_count, report.failure_count, report.skipped_count
    );
    if report.cancelled {
        let _ = writeln!(out, "Batch was cancelled before every file started.");
    }
    out
}
