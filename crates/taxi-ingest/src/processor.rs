//! Single-file pipeline: fetch, decode, load, clean up
//!
//! ```text
//! Fetching ──fail──────────────────────────────┐
//!    │                                         ▼
//! Decoding ──fail──┐                          Done
//!    │             ▼                           ▲
//! Loading* ──────► Cleanup ────────────────────┘
//! ```
//!
//! A chunk that fails to load is skipped; a decode failure ends the file.
//! Cleanup runs on every path that created temporary storage.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::UrlPrefixes;
use crate::decode::ChunkDecoder;
use crate::error::{DecodeError, DownloadError};
use crate::fetch::{FetchedFile, TripSource};
use crate::load::ChunkLoader;
use crate::models::{format_count, LoadResult, SourceFile};

pub struct FileProcessor {
    source: Arc<dyn TripSource>,
    decoder: Arc<dyn ChunkDecoder>,
    loader: ChunkLoader,
    url_prefixes: UrlPrefixes,
    chunk_size: usize,
    progress_every: usize,
}

impl FileProcessor {
    pub fn new(
        source: Arc<dyn TripSource>,
        decoder: Arc<dyn ChunkDecoder>,
        loader: ChunkLoader,
        url_prefixes: UrlPrefixes,
        chunk_size: usize,
        progress_every: usize,
    ) -> Self {
        Self {
            source,
            decoder,
            loader,
            url_prefixes,
            chunk_size,
            progress_every: progress_every.max(1),
        }
    }

    /// Runs one file to completion. Never fails: every outcome is logged and
    /// reflected in the returned totals.
    pub async fn process(&self, file: &SourceFile) -> LoadResult {
        let filename = file.filename();
        let mut result = LoadResult::new(&filename);

        let prefix = self.url_prefixes.for_type(file.record_type);
        match self.source.fetch(prefix, &filename).await {
            Ok(fetched) => {
                result.downloaded = true;

                if let Err(e) = self.load_file(file, &fetched, &mut result).await {
                    result.decode_failed = true;
                    error!("[ERROR] File processing error - {}: {}", filename, e);
                }

                let temp_path = fetched.path().display().to_string();
                if let Err(e) = fetched.cleanup() {
                    error!("[ERROR] Cleanup error - {}: {}", temp_path, e);
                }
            },
            Err(e @ DownloadError::Status { .. }) => {
                error!("[ERROR] Download failed for {}", filename);
                debug!("{}", e);
            },
            Err(e) => {
                error!("[ERROR] Download error - {}: {}", filename, e);
            },
        }

        info!(
            "[COMPLETE] {}: Total {} rows inserted",
            filename,
            format_count(result.rows_inserted)
        );
        result
    }

    async fn load_file(
        &self,
        file: &SourceFile,
        fetched: &FetchedFile,
        result: &mut LoadResult,
    ) -> Result<(), DecodeError> {
        let chunks = self.decoder.open(fetched.path(), self.chunk_size)?;

        for chunk in chunks {
            let chunk = chunk?;

            match self.loader.load(chunk, file.record_type, &result.filename).await {
                Ok(rows) => {
                    result.rows_inserted += rows;
                    result.chunks_loaded += 1;
                },
                Err(_) => result.chunks_failed += 1,
            }

            if result.chunks_seen() % self.progress_every == 0 {
                info!(
                    "[PROGRESS] {}: {} rows inserted so far",
                    result.filename,
                    format_count(result.rows_inserted)
                );
            }
        }

        Ok(())
    }
}
