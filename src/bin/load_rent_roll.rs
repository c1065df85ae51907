//! Load a rent roll export into the SQLite store.

use clap::Parser;
use rent_roll_query::{
    config::DEFAULT_DATABASE_URL,
    ingest::{self, InputFormat},
    store::{sqlite::DEFAULT_MAX_RAW_ROWS, SqliteRentRollStore},
    QueryServiceError,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "load-rent-roll")]
#[command(about = "Load a rent roll CSV export or JSONL file into the database")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Input file (.csv or .jsonl)
    path: PathBuf,

    /// Input format; guessed from the extension when omitted
    #[arg(short, long, value_enum)]
    format: Option<InputFormat>,

    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let format = args
        .format
        .or_else(|| InputFormat::from_path(&args.path))
        .ok_or_else(|| {
            QueryServiceError::IngestError(format!(
                "cannot tell the format of {}; pass --format",
                args.path.display()
            ))
        })?;

    let records = ingest::read_file(&args.path, format)?;
    info!(rows = records.len(), path = %args.path.display(), "Parsed rent roll");

    let store = SqliteRentRollStore::connect(&args.database_url, DEFAULT_MAX_RAW_ROWS).await?;
    let report = ingest::load_records(&store, &records).await?;
    store.close().await;

    if report.failed > 0 {
        eprintln!("{} of {} rows failed to load", report.failed, records.len());
    }

    Ok(())
}
