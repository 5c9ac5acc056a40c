//! Remote file download into per-file temporary storage

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use crate::error::{CleanupError, DownloadError};

/// Read buffer size used while streaming a response body to disk
pub const DOWNLOAD_BUFFER_SIZE: usize = 8192;

/// A downloaded file living in its own temporary directory.
///
/// The caller owns the directory. Call [`FetchedFile::cleanup`] to remove it
/// and observe failures; dropping the value removes it silently.
#[derive(Debug)]
pub struct FetchedFile {
    dir: TempDir,
    path: PathBuf,
    bytes: u64,
}

impl FetchedFile {
    /// Wraps a file already written inside `dir`
    pub fn new(dir: TempDir, path: PathBuf, bytes: u64) -> Self {
        Self { dir, path, bytes }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Size of the downloaded body in bytes
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Deletes the file, then its directory
    pub fn cleanup(self) -> Result<(), CleanupError> {
        let FetchedFile { dir, path, .. } = self;

        std::fs::remove_file(&path).map_err(|source| CleanupError::RemoveFile {
            path: path.clone(),
            source,
        })?;

        let dir_path = dir.path().to_path_buf();
        dir.close().map_err(|source| CleanupError::RemoveDir {
            path: dir_path,
            source,
        })
    }
}

/// Source of raw trip files
#[async_trait]
pub trait TripSource: Send + Sync {
    /// Retrieves `{url_prefix}{filename}` into fresh temporary storage
    async fn fetch(&self, url_prefix: &str, filename: &str) -> Result<FetchedFile, DownloadError>;
}

/// HTTP implementation of [`TripSource`]
pub struct HttpFetcher {
    client: Client,
    temp_root: Option<PathBuf>,
    buffer_size: usize,
}

impl HttpFetcher {
    /// Create a fetcher that gives up when connecting, or waiting for the
    /// next piece of a body, takes longer than `timeout`. A transfer that
    /// keeps receiving data is never cut off.
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(concat!("taxi-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            temp_root: None,
            buffer_size: DOWNLOAD_BUFFER_SIZE,
        })
    }

    /// Create temporary directories under `root` instead of the system default
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    fn create_temp_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("taxi-ingest-");
        match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    async fn stream_to_file(&self, response: reqwest::Response, path: &Path) -> Result<u64, DownloadError> {
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let reader = StreamReader::new(stream);
        tokio::pin!(reader);

        let mut file = tokio::fs::File::create(path).await?;
        let mut buf = vec![0u8; self.buffer_size];
        let mut written = 0u64;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            written += n as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl TripSource for HttpFetcher {
    async fn fetch(&self, url_prefix: &str, filename: &str) -> Result<FetchedFile, DownloadError> {
        let url = format!("{}{}", url_prefix, filename);
        info!("[INFO] Downloading {}", filename);

        let response = self.client.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(DownloadError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let dir = self.create_temp_dir()?;
        let path = dir.path().join(filename);

        // On error `dir` is dropped here, taking the partial file with it
        let bytes = self.stream_to_file(response, &path).await?;

        debug!("Wrote {} bytes to {}", bytes, path.display());
        info!("[SUCCESS] Downloaded {}", filename);

        Ok(FetchedFile::new(dir, path, bytes))
    }
}
