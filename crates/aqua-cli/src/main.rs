//! Aqua CLI: upload, enhance and log underwater photos from the command line.
//!
//! Configuration comes from the environment (see `PipelineConfig::from_env`);
//! a `.env` file in the working directory is honoured.

use anyhow::Context;
use aqua_cli::{
    build_coordinator, describe_path, init_tracing, ledger_policy, load_source_file,
    render_report_table, truncate_string,
};
use aqua_core::models::EnhancementLevel;
use aqua_core::{PipelineConfig, Violation};
use aqua_processing::{BatchEvent, BatchOptions, FileValidator};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "aqua", about = "Upload, enhance and log underwater photos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files, enhance them and record the outcome
    Enhance {
        /// Image files to process, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// auto, light, medium or strong (default: ENHANCEMENT_LEVEL)
        #[arg(long)]
        level: Option<EnhancementLevel>,
        /// Submitter email recorded in the ledger
        #[arg(long)]
        email: Option<String>,
        /// Files processed at once, 1 to 4 (default: BATCH_CONCURRENCY)
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Check files locally without uploading anything
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Serialize)]
struct ValidationRow {
    file: String,
    content_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sanitized_name: Option<String>,
    violations: Vec<Violation>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Cancel `token` on the first Ctrl-C. Files already started still finish.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; finishing files already in progress");
            token.cancel();
        }
    });
}

async fn run_enhance(
    config: &PipelineConfig,
    files: Vec<PathBuf>,
    level: Option<EnhancementLevel>,
    email: Option<String>,
    concurrency: Option<usize>,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    let coordinator = build_coordinator(config)?;

    let mut sources = Vec::with_capacity(files.len());
    for path in &files {
        sources.push(load_source_file(path).await?);
    }

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let mut options = BatchOptions::new(level.unwrap_or(config.default_enhancement_level))
        .with_concurrency(concurrency.unwrap_or(config.batch_concurrency))
        .with_ledger_policy(ledger_policy(config))
        .with_cancellation(cancel)
        .with_progress(|p| {
            tracing::info!(
                completed = p.completed,
                total = p.total,
                "Progress {:.0}%",
                p.percent()
            )
        })
        .with_events(|event| {
            if let BatchEvent::UploadProgress { index, percent } = event {
                tracing::debug!(index, percent, "Upload progress");
            }
        });
    if let Some(email) = email {
        options = options.with_email(email);
    }

    let report = coordinator.run_batch(sources, options).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print!("{}", render_report_table(&report)),
    }

    Ok(report.all_succeeded())
}

async fn run_validate(
    config: &PipelineConfig,
    files: Vec<PathBuf>,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    let validator = FileValidator::new(
        config.max_file_size_bytes,
        config.allowed_content_types.clone(),
    );

    let mut rows = Vec::with_capacity(files.len());
    for path in &files {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let (name, content_type) = describe_path(path);

        let row = match validator.validate(&name, metadata.len(), content_type) {
            Ok(sanitized) => ValidationRow {
                file: name,
                content_type,
                sanitized_name: Some(sanitized),
                violations: Vec::new(),
            },
            Err(e) => ValidationRow {
                file: name,
                content_type,
                sanitized_name: None,
                violations: e.violations,
            },
        };
        rows.push(row);
    }

    let all_valid = rows.iter().all(|r| r.violations.is_empty());

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => {
            for row in &rows {
                match &row.sanitized_name {
                    Some(sanitized) => {
                        println!("ok       {:<32} -> {}", truncate_string(&row.file, 32), sanitized)
                    }
                    None => {
                        let reasons: Vec<String> =
                            row.violations.iter().map(|v| v.to_string()).collect();
                        println!(
                            "invalid  {:<32} {}",
                            truncate_string(&row.file, 32),
                            reasons.join("; ")
                        );
                    }
                }
            }
        }
    }

    Ok(all_valid)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = PipelineConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let succeeded = match cli.command {
        Commands::Enhance {
            files,
            level,
            email,
            concurrency,
            format,
        } => run_enhance(&config, files, level, email, concurrency, format).await?,
        Commands::Validate { files, format } => run_validate(&config, files, format).await?,
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
