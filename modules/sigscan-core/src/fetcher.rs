use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::graph::PieceSource;
use crate::snapshot::SnapshotStore;
use crate::types::{Identifier, PageRequest, SyncWindow};

/// Walks the remote listing from the persisted watermark up to the cutoff and
/// folds new identifiers into the local cache.
pub struct IncrementalFetcher {
    source: Arc<dyn PieceSource>,
    store: SnapshotStore,
    window: SyncWindow,
}

impl IncrementalFetcher {
    pub fn new(source: Arc<dyn PieceSource>, store: SnapshotStore, window: SyncWindow) -> Self {
        Self {
            source,
            store,
            window,
        }
    }

    /// Every known identifier up to the cutoff: previously cached ones first,
    /// then newly discovered ones in creation order. The merged list and the
    /// advanced watermark are persisted before returning.
    ///
    /// A failing page query aborts the sync and leaves the cache untouched.
    pub async fn sync(&self) -> Result<Vec<Identifier>> {
        let (mut identifiers, prior) = match self.store.load().await? {
            Some(snapshot) => {
                info!(
                    cached = snapshot.identifiers.len(),
                    watermark = %snapshot.watermark,
                    "Resuming piece sync from watermark"
                );
                (snapshot.identifiers, snapshot.watermark)
            }
            None => {
                info!(start = %self.window.epoch_start, "No piece cache, starting full backfill");
                (Vec::new(), self.window.epoch_start)
            }
        };

        let mut start = prior;
        let mut fetched = 0usize;
        let mut pages = 0usize;
        loop {
            let request = PageRequest {
                lower_exclusive: start,
                upper_exclusive: self.window.cutoff,
                page_size: self.window.page_size,
            };
            let page = self.source.fetch_page(request).await?;
            pages += 1;

            let Some(last) = page.last() else {
                break;
            };
            let full_page = page.len() >= self.window.page_size;
            if full_page && page.len() > 1 && page[page.len() - 2].created_at == last.created_at {
                // The next lower bound is exclusive, so same-timestamp records
                // past this page boundary will not be returned.
                warn!(
                    created = %last.created_at,
                    "Page boundary splits records sharing a creation time"
                );
            }

            start = last.created_at;
            fetched += page.len();
            identifiers.extend(page.into_iter().map(|r| r.identifier));

            if !full_page {
                break;
            }
        }

        let watermark = start.max(prior);
        info!(
            new = fetched,
            total = identifiers.len(),
            pages,
            watermark = %watermark,
            "Piece sync complete"
        );

        self.store.save(&identifiers, watermark).await?;
        Ok(identifiers)
    }
}
