use std::sync::Arc;

use tracing::warn;

use crate::error::{Result, SigscanError};
use crate::inspector::DocumentInspector;
use crate::resource::ResourceStore;
use crate::types::Outcome;

pub struct Classifier {
    resources: Arc<dyn ResourceStore>,
    inspector: Arc<dyn DocumentInspector>,
    max_file_bytes: u64,
}

impl Classifier {
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        inspector: Arc<dyn DocumentInspector>,
        max_file_bytes: u64,
    ) -> Self {
        Self {
            resources,
            inspector,
            max_file_bytes,
        }
    }

    /// Never fails: probe and inspection errors become `Outcome::Error`.
    pub async fn classify(&self, identifier: &str) -> Outcome {
        match self.try_classify(identifier).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(identifier, error = %e, "Failed to classify document, skipping");
                Outcome::Error(e.to_string())
            }
        }
    }

    async fn try_classify(&self, identifier: &str) -> Result<Outcome> {
        let size = self.resources.size(identifier).await?;
        if size > self.max_file_bytes {
            return Ok(Outcome::TooLarge);
        }

        let bytes = self.resources.read(identifier).await?;
        // Parsing is CPU-bound; keep it off the async workers.
        let inspector = Arc::clone(&self.inspector);
        let inspection = tokio::task::spawn_blocking(move || inspector.inspect(&bytes))
            .await
            .map_err(|e| SigscanError::Pdf(format!("inspection task failed: {e}")))??;
        Ok(if inspection.has_signature_field {
            Outcome::Signed
        } else {
            Outcome::Unsigned
        })
    }
}
