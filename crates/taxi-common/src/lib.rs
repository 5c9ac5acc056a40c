//! Taxi Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the taxi data loader workspace.
//!
//! # Overview
//!
//! - **Error Handling**: `TaxiError` and the `Result` alias used for
//!   configuration and startup failures
//! - **Logging**: `tracing` subscriber setup writing `timestamp - LEVEL - message`
//!   lines to stdout and to a persistent log file
//!
//! # Example
//!
//! ```no_run
//! use taxi_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("[START] Loader starting");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, TaxiError};
