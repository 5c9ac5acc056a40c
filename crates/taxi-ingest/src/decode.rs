//! Chunked gzip CSV decoding
//!
//! A file is decompressed and parsed incrementally; at most one chunk of rows
//! is held in memory at a time.

use csv::StringRecord;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::DecodeError;
use crate::models::Chunk;

/// Forward-only sequence of chunks from one file. Fused after the first error.
pub type ChunkStream = Box<dyn Iterator<Item = Result<Chunk, DecodeError>> + Send>;

/// Opens a local file as a sequence of chunks
pub trait ChunkDecoder: Send + Sync {
    fn open(&self, path: &Path, chunk_size: usize) -> Result<ChunkStream, DecodeError>;
}

/// Decoder for `.csv.gz` files with a header row
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCsvDecoder;

impl ChunkDecoder for GzipCsvDecoder {
    fn open(&self, path: &Path, chunk_size: usize) -> Result<ChunkStream, DecodeError> {
        let file = File::open(path)?;
        let decoder = MultiGzDecoder::new(BufReader::new(file));
        Ok(Box::new(CsvChunks::new(decoder, chunk_size)?))
    }
}

/// Splits CSV text read from `R` into chunks of `chunk_size` rows
pub struct CsvChunks<R: Read> {
    reader: csv::Reader<R>,
    columns: Vec<String>,
    chunk_size: usize,
    next_index: usize,
    done: bool,
}

impl<R: Read> CsvChunks<R> {
    /// Reads the header row eagerly so an unreadable file fails here
    pub fn new(input: R, chunk_size: usize) -> Result<Self, DecodeError> {
        if chunk_size == 0 {
            return Err(DecodeError::Corrupt("chunk size must be positive".to_string()));
        }

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
            return Err(DecodeError::MissingHeader);
        }

        Ok(Self {
            reader,
            columns,
            chunk_size,
            next_index: 0,
            done: false,
        })
    }
}

impl<R: Read> Iterator for CsvChunks<R> {
    type Item = Result<Chunk, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut rows = Vec::with_capacity(self.chunk_size.min(16_384));
        let mut record = StringRecord::new();

        while rows.len() < self.chunk_size {
            match self.reader.read_record(&mut record) {
                Ok(true) => rows.push(record.clone()),
                Ok(false) => {
                    self.done = true;
                    break;
                },
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                },
            }
        }

        if rows.is_empty() {
            return None;
        }

        let chunk = Chunk {
            index: self.next_index,
            columns: self.columns.clone(),
            rows,
        };
        self.next_index += 1;
        Some(Ok(chunk))
    }
}
