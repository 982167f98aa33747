//! mailroom: runs one extraction cycle per invocation, plus schema tooling.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailroom_adapter::{AdapterClient, GcsBlobStore, GcsConfig};
use mailroom_batch::{BatchConfig, BatchProcessor, CycleOutcome, CycleReport};
use mailroom_core::schema::{self, Shape};
use mailroom_core::{samples, BlobStore};
use mailroom_db::{Database, FilesystemBlobStore, PoolConfig};

use config::{AppConfig, StorageBackend};

#[derive(Parser)]
#[command(name = "mailroom")]
#[command(author, version, about = "Batch extraction for scheduled emails")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one extraction cycle
    Run,

    /// Check connectivity to the store, blob storage and extraction service
    Check,

    /// Print example request and response payloads
    Schema,

    /// Validate a JSON document
    Validate {
        /// Shape the document must have
        #[arg(short, long, value_enum)]
        kind: Kind,

        /// Path to the JSON file
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Request,
    Response,
    Result,
    File,
    Event,
}

impl From<Kind> for Shape {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Request => Shape::Request,
            Kind::Response => Shape::Response,
            Kind::Result => Shape::EmailResult,
            Kind::File => Shape::FileResult,
            Kind::Event => Shape::CalendarEvent,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Schema => {
            cmd_schema()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { kind, file } => cmd_validate(kind.into(), &file),
        Commands::Check => {
            let _guard = init_tracing();
            let processor = build_processor().await?;
            match processor.self_test().await {
                Ok(()) => {
                    println!("ok");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!(error = %e, "Self-test failed");
                    eprintln!("Error: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Run => {
            let _guard = init_tracing();
            let processor = build_processor().await?;
            let report = processor.run_cycle().await?;
            print_report(&report);
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables daily-rotated file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: info for every mailroom crate)
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "mailroom=info,mailroom_batch=info,mailroom_db=info,mailroom_adapter=info".into()
    });
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let path = Path::new(path);
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("mailroom.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

async fn build_processor() -> anyhow::Result<BatchProcessor> {
    let config = AppConfig::from_env()?;

    info!("Connecting to database...");
    let db = Database::connect_with_config(&config.database_url, PoolConfig::from_env())
        .await
        .context("connecting to database")?;
    if config.run_migrations {
        info!("Running database migrations...");
        db.migrate().await.context("running migrations")?;
    }

    let blobs: Arc<dyn BlobStore> = match config.storage_backend {
        StorageBackend::Filesystem => Arc::new(FilesystemBlobStore::new(
            config.storage_path.clone(),
            config.bucket.clone(),
        )),
        StorageBackend::Gcs => Arc::new(GcsBlobStore::new(
            GcsConfig::from_env().with_bucket(config.bucket.clone()),
        )?),
    };
    info!(
        backend = %config.storage_backend,
        bucket = %config.bucket,
        "Blob storage configured"
    );

    let service = Arc::new(AdapterClient::from_env()?);
    info!(url = %service.config().base_url, "Extraction service configured");

    Ok(
        BatchProcessor::builder(Arc::new(db.records.clone()), blobs, service)
            .with_config(BatchConfig::from_env())
            .build(),
    )
}

fn print_report(report: &CycleReport) {
    match &report.outcome {
        CycleOutcome::Idle => println!("No emails scheduled for extraction"),
        CycleOutcome::NothingSubmitted => {
            println!(
                "{} pending, none submitted ({} skipped)",
                report.pending,
                report.skipped.len()
            );
        }
        CycleOutcome::Completed {
            reconciliation,
            status,
        } => {
            println!(
                "{} submitted: {} extracted, {} left pending, {} calendar events stored",
                report.submitted,
                status.committed.len(),
                status.left_pending.len() + report.skipped.len(),
                reconciliation.side_effects.persisted
            );
            for failed in &reconciliation.primary.failed {
                println!("  {}: {}", failed.id, failed.reason);
            }
            for skipped in &report.skipped {
                println!("  {}: skipped: {}", skipped.id, skipped.violations.join("; "));
            }
        }
    }
}

fn cmd_schema() -> anyhow::Result<()> {
    println!("# Request");
    println!("{}", serde_json::to_string_pretty(&samples::example_request())?);
    println!();
    println!("# Response");
    println!("{}", serde_json::to_string_pretty(&samples::example_response())?);
    Ok(())
}

fn cmd_validate(shape: Shape, file: &Path) -> anyhow::Result<ExitCode> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", file.display()))?;

    let violations = schema::validate(shape, &value);
    if violations.is_empty() {
        println!("valid");
        return Ok(ExitCode::SUCCESS);
    }
    for violation in &violations {
        println!("{violation}");
    }
    Ok(ExitCode::FAILURE)
}
