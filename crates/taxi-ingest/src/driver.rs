//! Batch driver
//!
//! Verifies the database, then walks record type × year × month strictly in
//! order, one file at a time. Only the pre-flight check can stop a run.

use std::sync::Arc;
use tracing::{error, info};

use crate::config::IngestConfig;
use crate::decode::{ChunkDecoder, GzipCsvDecoder};
use crate::error::ConnectivityError;
use crate::fetch::{HttpFetcher, TripSource};
use crate::load::ChunkLoader;
use crate::models::{format_count, LoadResult, LoadStatus, RecordType, SourceFile};
use crate::processor::FileProcessor;
use crate::storage::{PgSink, TripSink};
use taxi_common::{Result, TaxiError};

/// Totals over every file a run touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub files_attempted: usize,
    pub files_downloaded: usize,
    pub files_partial: usize,
    pub rows_inserted: u64,
}

impl BatchSummary {
    fn record(&mut self, result: &LoadResult) {
        self.files_attempted += 1;
        self.rows_inserted += result.rows_inserted;
        match result.status() {
            LoadStatus::Complete => self.files_downloaded += 1,
            LoadStatus::Partial => {
                self.files_downloaded += 1;
                self.files_partial += 1;
            },
            LoadStatus::Skipped => {},
        }
    }

    fn merge(&mut self, other: &BatchSummary) {
        self.files_attempted += other.files_attempted;
        self.files_downloaded += other.files_downloaded;
        self.files_partial += other.files_partial;
        self.rows_inserted += other.rows_inserted;
    }
}

pub struct BatchDriver {
    config: IngestConfig,
    sink: Arc<dyn TripSink>,
    processor: FileProcessor,
}

impl BatchDriver {
    /// Wire a driver from explicit collaborators
    pub fn new(
        config: IngestConfig,
        source: Arc<dyn TripSource>,
        decoder: Arc<dyn ChunkDecoder>,
        sink: Arc<dyn TripSink>,
    ) -> Self {
        let processor = FileProcessor::new(
            source,
            decoder,
            ChunkLoader::new(sink.clone()),
            config.url_prefixes.clone(),
            config.chunk_size,
            config.progress_every,
        );

        Self {
            config,
            sink,
            processor,
        }
    }

    /// HTTP source, gzip CSV decoder and PostgreSQL sink built from `config`.
    /// No network traffic happens here.
    pub fn from_config(config: IngestConfig) -> Result<Self> {
        let mut fetcher = HttpFetcher::new(config.http_timeout())
            .map_err(|e| TaxiError::Network(e.to_string()))?;
        if let Some(root) = &config.temp_root {
            fetcher = fetcher.with_temp_root(root);
        }

        let sink = PgSink::connect_lazy(&config.database)
            .map_err(|e| TaxiError::Database(e.to_string()))?;

        Ok(Self::new(
            config,
            Arc::new(fetcher),
            Arc::new(GzipCsvDecoder),
            Arc::new(sink),
        ))
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// `SELECT 1` plus a presence check on both trip tables
    pub async fn check_connectivity(&self) -> std::result::Result<(), ConnectivityError> {
        let tables: Vec<String> = RecordType::ALL.iter().map(RecordType::table_name).collect();

        self.sink.verify(&tables).await.map_err(|e| {
            error!("[ERROR] Database connection failed: {}", e);
            e
        })
    }

    /// Pre-flight check, then every configured year and month of one record
    /// type. Nothing is fetched when the check fails.
    pub async fn run(
        &self,
        record_type: RecordType,
    ) -> std::result::Result<BatchSummary, ConnectivityError> {
        self.preflight().await?;
        Ok(self.load_type(record_type).await)
    }

    /// Pre-flight check once, then each configured record type in turn.
    /// Nothing is fetched when the check fails.
    pub async fn run_all(&self) -> std::result::Result<BatchSummary, ConnectivityError> {
        self.preflight().await?;

        let mut total = BatchSummary::default();
        for record_type in &self.config.record_types {
            let summary = self.load_type(*record_type).await;
            total.merge(&summary);
        }

        info!(
            "Batch done: {} files attempted, {} downloaded, {} partial, {} rows inserted",
            total.files_attempted,
            total.files_downloaded,
            total.files_partial,
            format_count(total.rows_inserted)
        );
        Ok(total)
    }

    async fn preflight(&self) -> std::result::Result<(), ConnectivityError> {
        self.check_connectivity().await.map_err(|e| {
            error!("[ERROR] Exiting due to database connection failure");
            e
        })
    }

    async fn load_type(&self, record_type: RecordType) -> BatchSummary {
        let mut summary = BatchSummary::default();
        info!("[START] Processing {} taxi data", record_type);

        for period in self.config.periods() {
            info!("[PROCESSING] {} - {}", record_type, period);
            let result = self
                .processor
                .process(&SourceFile::new(record_type, period))
                .await;
            summary.record(&result);
        }

        info!("[FINISHED] Completed {} taxi data", record_type);
        summary
    }
}
