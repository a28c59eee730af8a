use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{Result, SigscanError};

const SHARE_SCHEME: &str = "share://";

/// Access to the bytes behind an identifier.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Size in bytes, without reading the content.
    async fn size(&self, identifier: &str) -> Result<u64>;

    async fn read(&self, identifier: &str) -> Result<Vec<u8>>;
}

/// `share://` identifiers backed by a mounted directory.
#[derive(Debug, Clone)]
pub struct ShareStore {
    root: PathBuf,
}

impl ShareStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, identifier: &str) -> Result<PathBuf> {
        let relative = identifier
            .strip_prefix(SHARE_SCHEME)
            .filter(|rest| !rest.is_empty() && !rest.split('/').any(|part| part == ".."))
            .ok_or_else(|| SigscanError::UnsupportedIdentifier(identifier.to_string()))?;
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ResourceStore for ShareStore {
    async fn size(&self, identifier: &str) -> Result<u64> {
        let meta = tokio::fs::metadata(self.path_for(identifier)?).await?;
        Ok(meta.len())
    }

    async fn read(&self, identifier: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.path_for(identifier)?).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_share_uris_under_root() {
        let store = ShareStore::new("/share");
        assert_eq!(
            store.path_for("share://2020/a.pdf").unwrap(),
            PathBuf::from("/share/2020/a.pdf")
        );
    }

    #[test]
    fn rejects_other_schemes_and_traversal() {
        let store = ShareStore::new("/share");
        assert!(store.path_for("http://x/a.pdf").is_err());
        assert!(store.path_for("share://").is_err());
        assert!(store.path_for("share://../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn size_and_read_use_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.pdf"), b"12345").unwrap();
        let store = ShareStore::new(dir.path());

        assert_eq!(store.size("share://doc.pdf").await.unwrap(), 5);
        assert_eq!(store.read("share://doc.pdf").await.unwrap(), b"12345");
        assert!(store.size("share://missing.pdf").await.is_err());
    }
}
