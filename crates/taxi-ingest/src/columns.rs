//! Source-to-destination column renaming
//!
//! The raw TLC files use mixed-case headers (`VendorID`, `PULocationID`)
//! while the destination tables use lower-case identifiers. Only the headers
//! of a chunk are touched; row data is left as decoded.

use crate::models::{Chunk, RecordType};

/// Columns shared by both trip types
const COMMON_COLUMNS: &[(&str, &str)] = &[
    ("VendorID", "vendorid"),
    ("passenger_count", "passenger_count"),
    ("trip_distance", "trip_distance"),
    ("RatecodeID", "ratecodeid"),
    ("store_and_fwd_flag", "store_and_fwd_flag"),
    ("PULocationID", "pulocationid"),
    ("DOLocationID", "dolocationid"),
    ("payment_type", "payment_type"),
    ("fare_amount", "fare_amount"),
    ("extra", "extra"),
    ("mta_tax", "mta_tax"),
    ("tip_amount", "tip_amount"),
    ("tolls_amount", "tolls_amount"),
    ("improvement_surcharge", "improvement_surcharge"),
    ("total_amount", "total_amount"),
    ("congestion_surcharge", "congestion_surcharge"),
];

const YELLOW_COLUMNS: &[(&str, &str)] = &[
    ("tpep_pickup_datetime", "tpep_pickup_datetime"),
    ("tpep_dropoff_datetime", "tpep_dropoff_datetime"),
];

const GREEN_COLUMNS: &[(&str, &str)] = &[
    ("lpep_pickup_datetime", "lpep_pickup_datetime"),
    ("lpep_dropoff_datetime", "lpep_dropoff_datetime"),
];

/// Static rename table for one record type
#[derive(Debug, Clone, Copy)]
pub struct ColumnMapping {
    record_type: RecordType,
}

impl ColumnMapping {
    pub fn for_type(record_type: RecordType) -> Self {
        Self { record_type }
    }

    /// Destination name for `source`, if the mapping knows it
    pub fn lookup(&self, source: &str) -> Option<&'static str> {
        self.entries()
            .find(|(from, _)| *from == source)
            .map(|(_, to)| *to)
    }

    /// All (source, destination) pairs
    pub fn entries(&self) -> impl Iterator<Item = &'static (&'static str, &'static str)> {
        let specific = match self.record_type {
            RecordType::Yellow => YELLOW_COLUMNS,
            RecordType::Green => GREEN_COLUMNS,
        };
        COMMON_COLUMNS.iter().chain(specific.iter())
    }

    /// Renames the known columns of `columns` in place; unknown names pass
    /// through.
    pub fn apply(&self, columns: &mut [String]) {
        for column in columns.iter_mut() {
            if let Some(target) = self.lookup(column) {
                if column.as_str() != target {
                    *column = target.to_string();
                }
            }
        }
    }
}

/// Renames the chunk's columns per `record_type`. Never fails.
pub fn map_columns(chunk: &mut Chunk, record_type: RecordType) {
    ColumnMapping::for_type(record_type).apply(&mut chunk.columns);
}
