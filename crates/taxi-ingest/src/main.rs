//! Taxi Ingest - loads NYC TLC trip files into PostgreSQL

use anyhow::Result;
use clap::Parser;
use taxi_common::logging::{init_logging, LogConfig, LogLevel};
use taxi_ingest::{BatchDriver, IngestConfig, RecordType};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "taxi-ingest")]
#[command(author, version, about = "Load monthly taxi trip files into PostgreSQL")]
struct Cli {
    /// Record type to load; repeat for several (default: green)
    #[arg(long = "type", value_name = "TYPE")]
    record_types: Vec<RecordType>,

    /// Years to load, comma separated (default: 2019,2020)
    #[arg(long, value_delimiter = ',')]
    years: Vec<u16>,

    /// Rows per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Flags win over environment and defaults
    fn apply(self, mut config: IngestConfig) -> IngestConfig {
        if !self.record_types.is_empty() {
            config = config.with_record_types(self.record_types);
        }
        if !self.years.is_empty() {
            config = config.with_years(self.years);
        }
        if let Some(size) = self.chunk_size {
            config = config.with_chunk_size(size);
        }
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence
    let log_config = LogConfig::builder().level(log_level).build().merge_env()?;
    let _guard = init_logging(&log_config)?;

    let config = cli.apply(IngestConfig::load()?);
    config.validate()?;

    info!(
        "Loading {:?} for years {:?} into {} (schema {}, chunk size {})",
        config.record_types,
        config.years,
        config.database.display_target(),
        config.database.schema,
        config.chunk_size
    );

    let driver = BatchDriver::from_config(config)?;
    match driver.run_all().await {
        Ok(summary) => info!("Ingestion complete: {} rows inserted", summary.rows_inserted),
        Err(e) => error!("Ingestion aborted: {}", e),
    }

    Ok(())
}
