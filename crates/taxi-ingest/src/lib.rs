//! Taxi Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Batch loader for the monthly NYC TLC trip files: downloads each
//! `{type}_tripdata_{YYYY-MM}.csv.gz`, decodes it in bounded chunks, renames
//! the columns and appends the rows to PostgreSQL.
//!
//! # Pipeline
//!
//! - [`driver`]: pre-flight check, then every (type, year, month) in order
//! - [`processor`]: one file, fetch → decode → load → cleanup
//! - [`fetch`]: HTTP download into a temporary directory
//! - [`decode`]: gzip CSV to a lazy sequence of chunks
//! - [`load`] / [`storage`]: column rename and batched inserts
//! - [`columns`]: the static rename tables
//!
//! # Example
//!
//! ```no_run
//! use taxi_ingest::{config::IngestConfig, driver::BatchDriver};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::load()?;
//!     config.validate()?;
//!
//!     let driver = BatchDriver::from_config(config)?;
//!     if let Ok(summary) = driver.run_all().await {
//!         tracing::info!("{} rows", summary.rows_inserted);
//!     }
//!     Ok(())
//! }
//! ```

pub mod columns;
pub mod config;
pub mod decode;
pub mod driver;
pub mod error;
pub mod fetch;
pub mod load;
pub mod models;
pub mod processor;
pub mod storage;

pub use config::IngestConfig;
pub use driver::{BatchDriver, BatchSummary};
pub use models::{Chunk, LoadResult, Period, RecordType, SourceFile};
