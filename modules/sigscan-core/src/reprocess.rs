use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::graph::PieceDirectory;
use crate::types::Identifier;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReprocessStats {
    pub reinserted: usize,
    pub missing: usize,
    pub failed: usize,
    pub chunks: usize,
}

/// Reinsert the piece behind every identifier, `chunk_size` at a time with a
/// pause between chunks. Per-item failures are logged and counted.
pub async fn reprocess_signed(
    directory: &dyn PieceDirectory,
    identifiers: &[Identifier],
    chunk_size: usize,
    pause: Duration,
) -> ReprocessStats {
    let mut stats = ReprocessStats::default();
    let chunks: Vec<&[Identifier]> = identifiers.chunks(chunk_size.max(1)).collect();
    let total = chunks.len();

    for (index, chunk) in chunks.into_iter().enumerate() {
        for physical_uri in chunk {
            match directory.piece_uri(physical_uri).await {
                Ok(Some(piece)) => match directory.reinsert_piece(&piece).await {
                    Ok(()) => stats.reinserted += 1,
                    Err(e) => {
                        warn!(physical_uri = %physical_uri, piece = %piece, error = %e, "Failed to reinsert piece");
                        stats.failed += 1;
                    }
                },
                Ok(None) => {
                    warn!(physical_uri = %physical_uri, "No piece found for file");
                    stats.missing += 1;
                }
                Err(e) => {
                    warn!(physical_uri = %physical_uri, error = %e, "Piece lookup failed");
                    stats.failed += 1;
                }
            }
        }
        stats.chunks += 1;
        info!(chunk = index + 1, of = total, "Reprocessed chunk");

        if index + 1 < total {
            tokio::time::sleep(pause).await;
        }
    }

    stats
}
