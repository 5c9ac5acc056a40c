//! Domain types for the trip loader

use serde::{Deserialize, Serialize};
use std::fmt;
use taxi_common::TaxiError;

/// Taxi trip category; selects the column mapping, the remote URL prefix
/// and the destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Yellow,
    Green,
}

impl RecordType {
    pub const ALL: [RecordType; 2] = [RecordType::Yellow, RecordType::Green];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Yellow => "yellow",
            RecordType::Green => "green",
        }
    }

    /// Destination table name, e.g. `green_tripdata`
    pub fn table_name(&self) -> String {
        format!("{}_tripdata", self.as_str())
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = TaxiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yellow" => Ok(RecordType::Yellow),
            "green" => Ok(RecordType::Green),
            other => Err(TaxiError::UnknownRecordType(other.to_string())),
        }
    }
}

/// A (year, month) unit of the batch enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: u16,
    month: u8,
}

impl Period {
    pub fn new(year: u16, month: u8) -> Result<Self, TaxiError> {
        if !(1..=12).contains(&month) {
            return Err(TaxiError::InvalidPeriod { year, month });
        }
        Ok(Self { year, month })
    }

    /// January through December of `year`, ascending
    pub fn months(year: u16) -> impl Iterator<Item = Period> {
        (1..=12u8).map(move |month| Period { year, month })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// One monthly file on the remote host. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceFile {
    pub record_type: RecordType,
    pub period: Period,
}

impl SourceFile {
    pub fn new(record_type: RecordType, period: Period) -> Self {
        Self {
            record_type,
            period,
        }
    }

    /// e.g. `yellow_tripdata_2019-01.csv.gz`
    pub fn filename(&self) -> String {
        format!("{}_tripdata_{}.csv.gz", self.record_type, self.period)
    }

    pub fn url(&self, url_prefix: &str) -> String {
        format!("{}{}", url_prefix, self.filename())
    }
}

/// A bounded batch of rows read from one file, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Zero-based position of this chunk within its file
    pub index: usize,
    /// Column names, one per field of every row
    pub columns: Vec<String>,
    pub rows: Vec<csv::StringRecord>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome classification of a file load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Every decoded chunk was written
    Complete,
    /// A chunk failed to insert or decoding stopped early
    Partial,
    /// The file could not be downloaded
    Skipped,
}

/// Per-file running totals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub filename: String,
    pub downloaded: bool,
    pub rows_inserted: u64,
    pub chunks_loaded: usize,
    pub chunks_failed: usize,
    pub decode_failed: bool,
}

impl LoadResult {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            downloaded: false,
            rows_inserted: 0,
            chunks_loaded: 0,
            chunks_failed: 0,
            decode_failed: false,
        }
    }

    pub fn chunks_seen(&self) -> usize {
        self.chunks_loaded + self.chunks_failed
    }

    pub fn status(&self) -> LoadStatus {
        if !self.downloaded {
            LoadStatus::Skipped
        } else if self.decode_failed || self.chunks_failed > 0 {
            LoadStatus::Partial
        } else {
            LoadStatus::Complete
        }
    }
}

/// Formats a count with `,` thousands separators: `1234567` -> `1,234,567`
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
