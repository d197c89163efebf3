use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use puffpass::application::service::PaymentService;
use puffpass::config::FeeConfig;
use puffpass::domain::ports::EscrowStoreBox;
use puffpass::domain::tier::TierEngine;
use puffpass::infrastructure::in_memory::InMemoryEscrowStore;
#[cfg(feature = "storage-rocksdb")]
use puffpass::infrastructure::rocksdb::RocksDBStore;
use puffpass::interfaces::csv::payment_reader::PaymentRequestReader;
use puffpass::interfaces::csv::record_writer::EscrowRecordWriter;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the loyalty tier and progress for a cumulative activity count
    Tier {
        #[arg(allow_hyphen_values = true)]
        count: String,
    },

    /// List the benefits of a tier, one per line
    Benefits { tier: String },

    /// Price a CSV of payment requests and print the resulting records
    Fees {
        /// Input payments CSV file
        input: PathBuf,

        /// Reference time for escrow calculations (RFC 3339). Defaults to now.
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Release every escrow that is due at the reference time.
        ///
        /// Only escrows opened in an earlier run can be due, so this needs a
        /// persistent store (`--db-path`).
        #[arg(long)]
        release_due: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

fn open_store(db_path: Option<PathBuf>) -> Result<EscrowStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Box::new(RocksDBStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
            );
            Ok(Box::new(InMemoryEscrowStore::new()))
        }
        None => Ok(Box::new(InMemoryEscrowStore::new())),
    }
}

async fn run_fees(
    input: PathBuf,
    now: DateTime<Utc>,
    db_path: Option<PathBuf>,
    release_due: bool,
) -> Result<()> {
    let config = FeeConfig::from_env().into_diagnostic()?;
    let service = PaymentService::new(config, open_store(db_path)?);

    let file = File::open(input).into_diagnostic()?;
    let reader = PaymentRequestReader::new(file);
    for row in reader.requests() {
        match row {
            Ok((payment_id, request)) => {
                if let Err(e) = service.submit(payment_id, request, now).await {
                    tracing::error!(payment_id, error = %e, "Error processing payment");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error reading payment");
            }
        }
    }

    if release_due {
        let released = service.release_due(now).await.into_diagnostic()?;
        tracing::info!(count = released.len(), "Released due escrows");
    }

    let records = service.into_results().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = EscrowRecordWriter::new(stdout.lock());
    writer.write_records(records).into_diagnostic()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Tier { count } => {
            let engine = TierEngine::default();
            let progress = engine
                .classify(TierEngine::parse_count(&count).into_diagnostic()?)
                .into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&progress).into_diagnostic()?
            );
        }
        Command::Benefits { tier } => {
            let engine = TierEngine::default();
            let benefits = engine.benefits_for(&tier).into_diagnostic()?;
            let mut out = io::stdout().lock();
            for benefit in benefits {
                writeln!(out, "{}", benefit).into_diagnostic()?;
            }
        }
        Command::Fees {
            input,
            now,
            db_path,
            release_due,
        } => {
            run_fees(input, now.unwrap_or_else(Utc::now), db_path, release_due).await?;
        }
    }

    Ok(())
}
