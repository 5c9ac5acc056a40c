//! Shared fakes and fixtures for the pipeline integration tests
//!
//! - `FakeSink`: in-memory `TripSink` that records what it was asked to write
//! - `LocalSource`: `TripSource` that "downloads" from an in-memory map
//! - `ScriptedDecoder`: `ChunkDecoder` that yields a fixed sequence of results
//! - `capture_logs`: thread-local subscriber writing plain lines to a buffer
//! - `paced_server`: one-shot raw HTTP server that controls body timing

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taxi_common::logging::PlainFormat;
use taxi_ingest::decode::{ChunkDecoder, ChunkStream};
use taxi_ingest::error::{ConnectivityError, DecodeError, DownloadError, LoadError};
use taxi_ingest::fetch::{FetchedFile, TripSource};
use taxi_ingest::storage::TripSink;
use taxi_ingest::Chunk;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::fmt::MakeWriter;

// ============================================================================
// Logs
// ============================================================================

#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn lines_containing(&self, needle: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route this thread's events into a buffer until the guard drops
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(buffer.clone())
        .event_format(PlainFormat)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

// ============================================================================
// Paced HTTP server
// ============================================================================

/// Answers one request with headers announcing `content_length` bytes, then
/// writes `pieces` with `gap` after each and closes the socket. Sending less
/// than announced simulates a connection dropped mid-transfer.
///
/// Returns the base URL, ending in `/`.
pub async fn paced_server(content_length: usize, pieces: Vec<Vec<u8>>, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            content_length
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();

        for piece in pieces {
            socket.write_all(&piece).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(gap).await;
        }
    });

    format!("http://{}/", addr)
}

// ============================================================================
// Fixtures
// ============================================================================

pub const YELLOW_HEADER: &str =
    "VendorID,tpep_pickup_datetime,tpep_dropoff_datetime,passenger_count,trip_distance";

pub const GREEN_HEADER: &str =
    "VendorID,lpep_pickup_datetime,lpep_dropoff_datetime,passenger_count,trip_distance";

/// A trip CSV with `rows` data rows under `header`
pub fn trip_csv(header: &str, rows: usize) -> String {
    let mut text = String::with_capacity(rows * 64);
    text.push_str(header);
    text.push('\n');
    for i in 0..rows {
        text.push_str(&format!(
            "{},2019-01-01 00:{:02}:00,2019-01-01 01:{:02}:00,{},{}.{}\n",
            i % 2 + 1,
            i % 60,
            i % 60,
            i % 6 + 1,
            i % 20,
            i % 10
        ));
    }
    text
}

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

pub fn chunk(index: usize, rows: usize) -> Chunk {
    Chunk {
        index,
        columns: vec!["VendorID".into(), "trip_distance".into()],
        rows: (0..rows)
            .map(|i| csv::StringRecord::from(vec!["1".to_string(), format!("{}.0", i)]))
            .collect(),
    }
}

// ============================================================================
// Sink
// ============================================================================

/// What one successful append looked like
#[derive(Debug, Clone)]
pub struct Appended {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: usize,
}

type AppendPolicy = Box<dyn Fn(&str, &Chunk) -> Result<(), LoadError> + Send + Sync>;

pub struct FakeSink {
    pub verify_error: Option<String>,
    pub verify_calls: AtomicUsize,
    pub appended: Mutex<Vec<Appended>>,
    pub append_calls: AtomicUsize,
    policy: AppendPolicy,
}

impl FakeSink {
    pub fn accepting() -> Self {
        Self::with_policy(|_, _| Ok(()))
    }

    pub fn unreachable(message: &str) -> Self {
        Self {
            verify_error: Some(message.to_string()),
            ..Self::accepting()
        }
    }

    /// `policy` decides per append whether it is rejected
    pub fn with_policy<F>(policy: F) -> Self
    where
        F: Fn(&str, &Chunk) -> Result<(), LoadError> + Send + Sync + 'static,
    {
        Self {
            verify_error: None,
            verify_calls: AtomicUsize::new(0),
            appended: Mutex::new(Vec::new()),
            append_calls: AtomicUsize::new(0),
            policy: Box::new(policy),
        }
    }

    pub fn appended(&self) -> Vec<Appended> {
        self.appended.lock().unwrap().clone()
    }

    pub fn rows_written(&self) -> usize {
        self.appended().iter().map(|a| a.rows).sum()
    }
}

#[async_trait]
impl TripSink for FakeSink {
    async fn verify(&self, _tables: &[String]) -> Result<(), ConnectivityError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        match &self.verify_error {
            Some(message) => Err(ConnectivityError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }

    async fn append(&self, table: &str, chunk: &Chunk) -> Result<u64, LoadError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        (self.policy)(table, chunk)?;
        self.appended.lock().unwrap().push(Appended {
            table: table.to_string(),
            columns: chunk.columns.clone(),
            rows: chunk.len(),
        });
        Ok(chunk.len() as u64)
    }
}

// ============================================================================
// Source
// ============================================================================

/// Serves files from memory; names it does not know fail like an HTTP 404.
#[derive(Default)]
pub struct LocalSource {
    files: HashMap<String, Vec<u8>>,
    broken: HashSet<String>,
    pub calls: AtomicUsize,
    pub requested: Mutex<Vec<String>>,
    pub temp_dirs: Mutex<Vec<PathBuf>>,
}

impl LocalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, filename: &str, content: Vec<u8>) -> Self {
        self.files.insert(filename.to_string(), content);
        self
    }

    /// `filename` fails as if the connection dropped mid-transfer
    pub fn with_broken_file(mut self, filename: &str) -> Self {
        self.broken.insert(filename.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn temp_dirs(&self) -> Vec<PathBuf> {
        self.temp_dirs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TripSource for LocalSource {
    async fn fetch(&self, url_prefix: &str, filename: &str) -> Result<FetchedFile, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(filename.to_string());

        if self.broken.contains(filename) {
            return Err(DownloadError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }

        let Some(content) = self.files.get(filename) else {
            return Err(DownloadError::Status {
                url: format!("{}{}", url_prefix, filename),
                status: 404,
            });
        };

        let dir = tempfile::tempdir()?;
        let path = dir.path().join(filename);
        std::fs::write(&path, content)?;
        self.temp_dirs.lock().unwrap().push(dir.path().to_path_buf());

        Ok(FetchedFile::new(dir, path, content.len() as u64))
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// One step of a scripted decode
#[derive(Debug, Clone)]
pub enum Step {
    Rows(usize),
    Fail(&'static str),
}

/// Ignores the file and replays `steps`
pub struct ScriptedDecoder {
    steps: Vec<Step>,
    pub opened: Mutex<Vec<PathBuf>>,
}

impl ScriptedDecoder {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            opened: Mutex::new(Vec::new()),
        }
    }
}

impl ChunkDecoder for ScriptedDecoder {
    fn open(&self, path: &Path, _chunk_size: usize) -> Result<ChunkStream, DecodeError> {
        assert!(path.exists(), "decoder opened a missing file");
        self.opened.lock().unwrap().push(path.to_path_buf());

        let items: Vec<Result<Chunk, DecodeError>> = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| match step {
                Step::Rows(n) => Ok(chunk(i, *n)),
                Step::Fail(message) => Err(DecodeError::Corrupt(message.to_string())),
            })
            .collect();

        Ok(Box::new(items.into_iter()))
    }
}
