//! Chunk loading: rename, then append

use std::sync::Arc;
use tracing::{debug, error};

use crate::columns::map_columns;
use crate::error::LoadError;
use crate::models::{Chunk, RecordType};
use crate::storage::TripSink;

/// Applies the column mapping to a chunk and appends it to the record type's
/// table. Failures are logged here with the file they came from.
#[derive(Clone)]
pub struct ChunkLoader {
    sink: Arc<dyn TripSink>,
}

impl ChunkLoader {
    pub fn new(sink: Arc<dyn TripSink>) -> Self {
        Self { sink }
    }

    /// Returns the number of rows written; on failure nothing from this
    /// chunk was written.
    pub async fn load(
        &self,
        mut chunk: Chunk,
        record_type: RecordType,
        filename: &str,
    ) -> Result<u64, LoadError> {
        map_columns(&mut chunk, record_type);
        let table = record_type.table_name();

        match self.sink.append(&table, &chunk).await {
            Ok(rows) => {
                debug!("{}: chunk {} -> {} rows into {}", filename, chunk.index, rows, table);
                Ok(rows)
            },
            Err(e) => {
                error!("[ERROR] Processing error - {}: {}", filename, e);
                Err(e)
            },
        }
    }
}
