use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use tracing::info;

use crate::error::{Result, SigscanError};
use crate::snapshot::{parse_lines, write_atomic};
use crate::types::{Category, Identifier, Outcome};

const LEDGER_FILE: &str = "outcomes.json";

/// Per-category result files, plus the per-identifier outcome ledger.
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, category: Category) -> PathBuf {
        self.dir.join(category.file_name())
    }

    pub async fn has(&self, category: Category) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(category)).await?)
    }

    /// Identifiers of a category, in the order they were written.
    /// A missing artifact reads as empty.
    pub async fn read(&self, category: Category) -> Result<Vec<Identifier>> {
        match tokio::fs::read_to_string(self.path(category)).await {
            Ok(content) => Ok(parse_lines(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// One identifier per line, discovery order, repeats dropped.
    pub async fn write(&self, category: Category, identifiers: &[Identifier]) -> Result<()> {
        let mut seen = HashSet::with_capacity(identifiers.len());
        let mut body = String::new();
        for id in identifiers {
            if seen.insert(id.as_str()) {
                body.push_str(id);
                body.push('\n');
            }
        }
        write_atomic(&self.path(category), body.as_bytes()).await?;
        info!(
            category = %category,
            count = seen.len(),
            path = %self.path(category).display(),
            "Wrote output artifact"
        );
        Ok(())
    }

    /// Drop a category's artifact. A missing artifact is not an error.
    pub async fn remove(&self, category: Category) -> Result<()> {
        let path = self.path(category);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(category = %category, path = %path.display(), "Removed stale output artifact");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn load_ledger(&self) -> Result<BTreeMap<Identifier, Outcome>> {
        let path = self.dir.join(LEDGER_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| SigscanError::CorruptCache {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Errors are never recorded, so those identifiers are retried next run.
    pub async fn save_ledger(&self, ledger: &BTreeMap<Identifier, Outcome>) -> Result<()> {
        let persisted: BTreeMap<&Identifier, &Outcome> =
            ledger.iter().filter(|(_, o)| !o.is_error()).collect();
        let bytes = serde_json::to_vec(&persisted)?;
        write_atomic(&self.dir.join(LEDGER_FILE), &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_keeps_order_and_drops_repeats() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let ids: Vec<String> = ["c", "a", "c", "b"].iter().map(|s| s.to_string()).collect();

        assert!(!store.has(Category::Signed).await.unwrap());
        store.write(Category::Signed, &ids).await.unwrap();

        assert!(store.has(Category::Signed).await.unwrap());
        assert!(!store.has(Category::TooLarge).await.unwrap());
        assert_eq!(store.read(Category::Signed).await.unwrap(), vec!["c", "a", "b"]);
        let raw = std::fs::read_to_string(store.path(Category::Signed)).unwrap();
        assert_eq!(raw, "c\na\nb\n");
    }

    #[tokio::test]
    async fn remove_drops_artifact_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        store.write(Category::TooLarge, &["a".to_string()]).await.unwrap();

        store.remove(Category::TooLarge).await.unwrap();
        assert!(!store.has(Category::TooLarge).await.unwrap());

        store.remove(Category::TooLarge).await.unwrap();
    }

    #[tokio::test]
    async fn ledger_skips_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let mut ledger = BTreeMap::new();
        ledger.insert("x".to_string(), Outcome::Signed);
        ledger.insert("y".to_string(), Outcome::Error("boom".into()));
        ledger.insert("z".to_string(), Outcome::Unsigned);

        store.save_ledger(&ledger).await.unwrap();
        let loaded = store.load_ledger().await.unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("x"), Some(&Outcome::Signed));
        assert_eq!(loaded.get("z"), Some(&Outcome::Unsigned));
        assert!(!loaded.contains_key("y"));
    }
}
