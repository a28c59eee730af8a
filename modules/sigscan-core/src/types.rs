use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Opaque name of a physical file resource, e.g. `share://abc.pdf`.
pub type Identifier = String;

/// Records requested per page when walking the remote store.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Files above this many bytes are never opened.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Earliest creation time the store can hold.
pub fn default_epoch_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 10, 2, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Pieces created on or after this instant are handled elsewhere.
pub fn default_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 12, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// One row of the ordered piece listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceRecord {
    pub identifier: Identifier,
    pub created_at: DateTime<Utc>,
}

impl PieceRecord {
    pub fn new(identifier: impl Into<Identifier>, created_at: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            created_at,
        }
    }
}

/// Bounds of one page query. Both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub lower_exclusive: DateTime<Utc>,
    pub upper_exclusive: DateTime<Utc>,
    pub page_size: usize,
}

/// Fixed time range and page size a sync walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub epoch_start: DateTime<Utc>,
    pub cutoff: DateTime<Utc>,
    pub page_size: usize,
}

impl Default for SyncWindow {
    fn default() -> Self {
        Self {
            epoch_start: default_epoch_start(),
            cutoff: default_cutoff(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Everything known after the last completed sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub watermark: DateTime<Utc>,
    pub identifiers: Vec<Identifier>,
}

/// Result of classifying a single identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    TooLarge,
    Signed,
    Unsigned,
    /// Probe or inspection failed. Never written to any artifact.
    #[serde(skip)]
    Error(String),
}

impl Outcome {
    pub fn category(&self) -> Option<Category> {
        match self {
            Outcome::TooLarge => Some(Category::TooLarge),
            Outcome::Signed => Some(Category::Signed),
            Outcome::Unsigned | Outcome::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

/// Outcomes that get their own output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Signed,
    TooLarge,
}

impl Category {
    pub fn file_name(self) -> &'static str {
        match self {
            Category::Signed => "signed-uris",
            Category::TooLarge => "too-large-uris",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Signed => write!(f, "signed"),
            Category::TooLarge => write!(f, "too_large"),
        }
    }
}

/// How the pipeline decides that classification work is already done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoMode {
    /// An existing Signed artifact stands for the whole corpus up to the cutoff.
    /// Pieces created after that artifact was written are not picked up until
    /// the artifact is removed.
    #[default]
    WholeBatch,
    /// Outcomes are kept per identifier; only unseen identifiers are classified.
    PerIdentifier,
}

impl std::str::FromStr for MemoMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whole-batch" | "whole_batch" => Ok(MemoMode::WholeBatch),
            "per-identifier" | "per_identifier" => Ok(MemoMode::PerIdentifier),
            other => Err(format!("unknown memo mode '{other}'")),
        }
    }
}
