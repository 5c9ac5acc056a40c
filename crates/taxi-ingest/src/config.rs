//! Configuration management
//!
//! Everything the batch needs is collected into one immutable
//! [`IngestConfig`] before the driver is built: defaults below, then `.env`
//! and process environment, then command-line overrides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use taxi_common::{Result, TaxiError};

use crate::models::{Period, RecordType};

// ============================================================================
// Defaults
// ============================================================================

/// Release download prefix for yellow trip files.
pub const DEFAULT_YELLOW_URL: &str =
    "https://github.com/DataTalksClub/nyc-tlc-data/releases/download/yellow/";

/// Release download prefix for green trip files.
pub const DEFAULT_GREEN_URL: &str =
    "https://github.com/DataTalksClub/nyc-tlc-data/releases/download/green/";

/// Years loaded when nothing else is configured.
pub const DEFAULT_YEARS: [u16; 2] = [2019, 2020];

/// Record type loaded when nothing else is configured.
pub const DEFAULT_RECORD_TYPE: RecordType = RecordType::Green;

/// Rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Connect and read-inactivity timeout for downloads, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// A `[PROGRESS]` line is logged every this many chunks.
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

pub const DEFAULT_DB_SCHEME: &str = "postgresql";
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_SCHEMA: &str = "public";

/// Persistent pool connections.
pub const DEFAULT_DB_POOL_SIZE: u32 = 5;

/// Connections allowed above the pool size under load.
pub const DEFAULT_DB_MAX_OVERFLOW: u32 = 10;

/// Seconds to wait for a pooled connection.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Database connection parameters
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub scheme: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    /// Schema holding `yellow_tripdata` and `green_tripdata`
    pub schema: String,
    pub pool_size: u32,
    pub max_overflow: u32,
    pub connect_timeout_secs: u64,
    /// Full connection string; wins over the individual fields when set
    #[serde(skip_serializing)]
    pub url_override: Option<String>,
}

impl DatabaseConfig {
    /// `{scheme}://{user}:{password}@{host}:{port}/{database}`
    pub fn url(&self) -> String {
        match &self.url_override {
            Some(url) => url.clone(),
            None => format!(
                "{}://{}:{}@{}:{}/{}",
                self.scheme, self.user, self.password, self.host, self.port, self.database
            ),
        }
    }

    /// Connection target safe to log
    pub fn display_target(&self) -> String {
        match &self.url_override {
            Some(_) => "DATABASE_URL".to_string(),
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }

    pub fn max_connections(&self) -> u32 {
        self.pool_size + self.max_overflow
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("scheme", &self.scheme)
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("pool_size", &self.pool_size)
            .field("max_overflow", &self.max_overflow)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_DB_SCHEME.to_string(),
            user: String::new(),
            password: String::new(),
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            database: String::new(),
            schema: DEFAULT_DB_SCHEMA.to_string(),
            pool_size: DEFAULT_DB_POOL_SIZE,
            max_overflow: DEFAULT_DB_MAX_OVERFLOW,
            connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
            url_override: None,
        }
    }
}

/// Remote prefix per record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPrefixes {
    pub yellow: String,
    pub green: String,
}

impl UrlPrefixes {
    pub fn for_type(&self, record_type: RecordType) -> &str {
        match record_type {
            RecordType::Yellow => &self.yellow,
            RecordType::Green => &self.green,
        }
    }

    /// Both record types served from `base`, e.g. a mock server:
    /// `{base}/yellow/` and `{base}/green/`
    pub fn under(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            yellow: format!("{}/yellow/", base),
            green: format!("{}/green/", base),
        }
    }
}

impl Default for UrlPrefixes {
    fn default() -> Self {
        Self {
            yellow: DEFAULT_YELLOW_URL.to_string(),
            green: DEFAULT_GREEN_URL.to_string(),
        }
    }
}

/// Complete configuration of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub record_types: Vec<RecordType>,
    pub years: Vec<u16>,
    pub chunk_size: usize,
    pub database: DatabaseConfig,
    pub url_prefixes: UrlPrefixes,
    pub http_timeout_secs: u64,
    pub progress_every: usize,
    /// Parent for per-file temporary directories; system temp dir when unset
    pub temp_root: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            record_types: vec![DEFAULT_RECORD_TYPE],
            years: DEFAULT_YEARS.to_vec(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            database: DatabaseConfig::default(),
            url_prefixes: UrlPrefixes::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            progress_every: DEFAULT_PROGRESS_EVERY,
            temp_root: None,
        }
    }
}

impl IngestConfig {
    /// Load configuration from `.env`, the environment and defaults
    ///
    /// Environment variables:
    /// - `TAXI_DB_USER`, `TAXI_DB_PASSWORD`, `TAXI_DB_HOST`, `TAXI_DB_PORT`,
    ///   `TAXI_DB_NAME`, `TAXI_DB_SCHEMA`, `TAXI_DB_POOL_SIZE`,
    ///   `TAXI_DB_MAX_OVERFLOW`
    /// - `DATABASE_URL`: full connection string, overrides the fields above
    /// - `TAXI_RECORD_TYPES`: comma separated, e.g. `yellow,green`
    /// - `TAXI_YEARS`: comma separated, e.g. `2019,2020`
    /// - `TAXI_CHUNK_SIZE`, `TAXI_HTTP_TIMEOUT_SECS`, `TAXI_PROGRESS_EVERY`
    /// - `TAXI_YELLOW_URL`, `TAXI_GREEN_URL`
    /// - `TAXI_TEMP_DIR`
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from defaults plus whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let db = &mut config.database;

        if let Some(user) = lookup("TAXI_DB_USER") {
            db.user = user;
        }
        if let Some(password) = lookup("TAXI_DB_PASSWORD") {
            db.password = password;
        }
        if let Some(host) = lookup("TAXI_DB_HOST") {
            db.host = host;
        }
        if let Some(port) = lookup("TAXI_DB_PORT") {
            db.port = parse_value("TAXI_DB_PORT", &port)?;
        }
        if let Some(name) = lookup("TAXI_DB_NAME") {
            db.database = name;
        }
        if let Some(schema) = lookup("TAXI_DB_SCHEMA") {
            db.schema = schema;
        }
        if let Some(size) = lookup("TAXI_DB_POOL_SIZE") {
            db.pool_size = parse_value("TAXI_DB_POOL_SIZE", &size)?;
        }
        if let Some(overflow) = lookup("TAXI_DB_MAX_OVERFLOW") {
            db.max_overflow = parse_value("TAXI_DB_MAX_OVERFLOW", &overflow)?;
        }
        db.url_override = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        if let Some(types) = lookup("TAXI_RECORD_TYPES") {
            config.record_types = parse_list("TAXI_RECORD_TYPES", &types)?;
        }
        if let Some(years) = lookup("TAXI_YEARS") {
            config.years = parse_list("TAXI_YEARS", &years)?;
        }
        if let Some(size) = lookup("TAXI_CHUNK_SIZE") {
            config.chunk_size = parse_value("TAXI_CHUNK_SIZE", &size)?;
        }
        if let Some(secs) = lookup("TAXI_HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = parse_value("TAXI_HTTP_TIMEOUT_SECS", &secs)?;
        }
        if let Some(every) = lookup("TAXI_PROGRESS_EVERY") {
            config.progress_every = parse_value("TAXI_PROGRESS_EVERY", &every)?;
        }
        if let Some(url) = lookup("TAXI_YELLOW_URL") {
            config.url_prefixes.yellow = url;
        }
        if let Some(url) = lookup("TAXI_GREEN_URL") {
            config.url_prefixes.green = url;
        }
        if let Some(dir) = lookup("TAXI_TEMP_DIR") {
            config.temp_root = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    pub fn with_record_types(mut self, record_types: Vec<RecordType>) -> Self {
        self.record_types = record_types;
        self
    }

    pub fn with_years(mut self, years: Vec<u16>) -> Self {
        self.years = years;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_url_prefixes(mut self, url_prefixes: UrlPrefixes) -> Self {
        self.url_prefixes = url_prefixes;
        self
    }

    pub fn with_progress_every(mut self, progress_every: usize) -> Self {
        self.progress_every = progress_every;
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Every (year, month) of the configured years, ascending
    pub fn periods(&self) -> Vec<Period> {
        let mut years = self.years.clone();
        years.sort_unstable();
        years.dedup();
        years.into_iter().flat_map(Period::months).collect()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.record_types.is_empty() {
            return Err(TaxiError::Config("At least one record type is required".into()));
        }

        if self.years.is_empty() {
            return Err(TaxiError::Config("At least one year is required".into()));
        }

        if self.chunk_size == 0 {
            return Err(TaxiError::Config("Chunk size must be greater than 0".into()));
        }

        if self.progress_every == 0 {
            return Err(TaxiError::Config("Progress interval must be greater than 0".into()));
        }

        if self.http_timeout_secs == 0 {
            return Err(TaxiError::Config("HTTP timeout must be greater than 0".into()));
        }

        let db = &self.database;
        if db.url_override.is_none() {
            if db.host.trim().is_empty() {
                return Err(TaxiError::Config("Database host cannot be empty".into()));
            }
            if db.database.trim().is_empty() {
                return Err(TaxiError::Config(
                    "Database name cannot be empty (set TAXI_DB_NAME or DATABASE_URL)".into(),
                ));
            }
        }

        if db.pool_size == 0 {
            return Err(TaxiError::Config("Database pool size must be greater than 0".into()));
        }

        if db.schema.trim().is_empty() {
            return Err(TaxiError::Config("Database schema cannot be empty".into()));
        }

        for record_type in &self.record_types {
            if self.url_prefixes.for_type(*record_type).is_empty() {
                return Err(TaxiError::Config(format!(
                    "No URL prefix configured for {} trips",
                    record_type
                )));
            }
        }

        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TaxiError::invalid_value(key, value))
}

fn parse_list<T: std::str::FromStr>(key: &str, value: &str) -> Result<Vec<T>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_value(key, item))
        .collect()
}
