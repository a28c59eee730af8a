//! On-disk cursor and identifier cache.
//!
//! The snapshot lives in one JSON file replaced by write-to-temp + rename, so a
//! reader sees either the previous or the next state, never a mix. Caches written
//! by the older two-file layout (`pieces` + `last_created`) are still readable and
//! get migrated on the next save.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{Result, SigscanError};
use crate::types::{CacheSnapshot, Identifier};

const SNAPSHOT_FILE: &str = "pieces.snapshot.json";
const LEGACY_IDENTIFIERS_FILE: &str = "pieces";
const LEGACY_WATERMARK_FILE: &str = "last_created";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    /// `None` means no sync has ever completed.
    pub async fn load(&self) -> Result<Option<CacheSnapshot>> {
        let path = self.snapshot_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: CacheSnapshot =
                    serde_json::from_slice(&bytes).map_err(|e| SigscanError::CorruptCache {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.load_legacy().await,
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the whole snapshot. Always a full rewrite, never an append.
    pub async fn save(&self, identifiers: &[Identifier], watermark: DateTime<Utc>) -> Result<()> {
        let snapshot = CacheSnapshot {
            watermark,
            identifiers: identifiers.to_vec(),
        };
        let bytes = serde_json::to_vec(&snapshot)?;
        write_atomic(&self.snapshot_path(), &bytes).await?;
        info!(
            count = identifiers.len(),
            watermark = %watermark,
            "Saved piece cache"
        );
        Ok(())
    }

    async fn load_legacy(&self) -> Result<Option<CacheSnapshot>> {
        let watermark_path = self.dir.join(LEGACY_WATERMARK_FILE);
        let raw = match tokio::fs::read_to_string(&watermark_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let watermark = DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SigscanError::CorruptCache {
                path: watermark_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let identifiers_path = self.dir.join(LEGACY_IDENTIFIERS_FILE);
        let identifiers = match tokio::fs::read_to_string(&identifiers_path).await {
            Ok(content) => parse_lines(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    path = %identifiers_path.display(),
                    "Legacy watermark present without identifier list"
                );
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            count = identifiers.len(),
            watermark = %watermark,
            "Loaded legacy two-file piece cache"
        );
        Ok(Some(CacheSnapshot {
            watermark,
            identifiers,
        }))
    }
}

/// One value per line, blank lines skipped.
pub(crate) fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Write to a sibling temp file, flush it to disk, then rename over the target.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
    }
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lines_skips_blanks() {
        assert_eq!(parse_lines("a\n\n b \n\nc"), vec!["a", "b", "c"]);
        assert!(parse_lines("").is_empty());
    }

    #[tokio::test]
    async fn missing_directory_means_never_synced() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nope"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_creates_the_cache_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("cache"));
        let ts = crate::types::default_epoch_start();

        store.save(&["share://a".to_string()], ts).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.identifiers, vec!["share://a"]);
        assert_eq!(loaded.watermark, ts);
        assert!(!store.snapshot_path().with_extension("tmp").exists());
    }
}
