use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{Result, SigscanError};
use crate::governor::{DEFAULT_BACKPRESSURE_DELAY, DEFAULT_PRESSURE_RATIO};
use crate::types::{
    default_cutoff, default_epoch_start, MemoMode, SyncWindow, DEFAULT_MAX_FILE_BYTES,
    DEFAULT_PAGE_SIZE,
};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Remote store
    pub sparql_endpoint: String,
    pub sparql_sudo: bool,
    pub document_base_url: String,

    // Local storage
    pub cache_dir: PathBuf,
    pub share_root: PathBuf,

    // Sync window
    pub epoch_start: DateTime<Utc>,
    pub cutoff: DateTime<Utc>,
    pub page_size: usize,

    // Classification
    pub max_file_bytes: u64,
    pub memo_mode: MemoMode,

    // Backpressure
    pub memory_ceiling_bytes: Option<u64>,
    pub memory_pressure_ratio: f64,
    pub backpressure_delay: Duration,

    // Bulk reprocess
    pub reprocess_chunk_size: usize,
    pub reprocess_pause: Duration,

    // Web server
    pub api_host: String,
    pub api_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Only `SPARQL_ENDPOINT` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            sparql_endpoint: required_env("SPARQL_ENDPOINT")?,
            sparql_sudo: parsed_env("SPARQL_SUDO", true)?,
            document_base_url: env::var("DOCUMENT_BASE_URL")
                .unwrap_or_else(|_| "https://kaleidos-test.vlaanderen.be/document/".to_string()),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/cache")),
            share_root: env::var("SHARE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/share")),
            epoch_start: datetime_env("EPOCH_START", default_epoch_start())?,
            cutoff: datetime_env("CUTOFF", default_cutoff())?,
            page_size: parsed_env("PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            max_file_bytes: parsed_env("MAX_FILE_BYTES", DEFAULT_MAX_FILE_BYTES)?,
            memo_mode: parsed_env("MEMO_MODE", MemoMode::WholeBatch)?,
            memory_ceiling_bytes: optional_env("MEMORY_CEILING_BYTES")?,
            memory_pressure_ratio: parsed_env("MEMORY_PRESSURE_RATIO", DEFAULT_PRESSURE_RATIO)?,
            backpressure_delay: optional_env("BACKPRESSURE_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_BACKPRESSURE_DELAY),
            reprocess_chunk_size: parsed_env("REPROCESS_CHUNK_SIZE", 10)?,
            reprocess_pause: Duration::from_millis(parsed_env("REPROCESS_PAUSE_MS", 1000)?),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: parsed_env("API_PORT", 80)?,
        })
    }

    pub fn sync_window(&self) -> SyncWindow {
        SyncWindow {
            epoch_start: self.epoch_start,
            cutoff: self.cutoff,
            page_size: self.page_size,
        }
    }
}

fn required_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| SigscanError::Config(format!("{key} environment variable is required")))
}

fn optional_env<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SigscanError::Config(format!("{key} has an invalid value '{raw}'"))),
        Err(_) => Ok(None),
    }
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    Ok(optional_env(key)?.unwrap_or(default))
}

fn datetime_env(key: &str, default: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match env::var(key) {
        Ok(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SigscanError::Config(format!("{key} must be RFC 3339: {e}"))),
        Err(_) => Ok(default),
    }
}
