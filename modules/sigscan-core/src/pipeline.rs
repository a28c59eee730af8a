use std::collections::BTreeMap;
use std::fmt;

use tracing::info;

use crate::classifier::Classifier;
use crate::error::Result;
use crate::fetcher::IncrementalFetcher;
use crate::governor::BackpressureGovernor;
use crate::outputs::OutputStore;
use crate::types::{Category, Identifier, MemoMode, Outcome};

/// Where a run's results came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOrigin {
    /// An existing Signed artifact was read back; nothing was fetched or classified.
    FromArtifacts,
    Computed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub origin: RunOrigin,
    pub signed: Vec<Identifier>,
    pub too_large: Vec<Identifier>,
    pub unsigned: usize,
    pub errors: usize,
    /// Identifiers whose outcome came from the ledger instead of a fresh inspection.
    pub reused: usize,
    pub pauses: usize,
}

impl PipelineReport {
    fn from_artifacts(signed: Vec<Identifier>, too_large: Vec<Identifier>) -> Self {
        Self {
            origin: RunOrigin::FromArtifacts,
            signed,
            too_large,
            unsigned: 0,
            errors: 0,
            reused: 0,
            pauses: 0,
        }
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signed={} too_large={} unsigned={} errors={} reused={} pauses={}",
            self.signed.len(),
            self.too_large.len(),
            self.unsigned,
            self.errors,
            self.reused,
            self.pauses
        )
    }
}

/// Sync, classify, persist. One pass at a time; callers serialize access.
pub struct Pipeline {
    fetcher: IncrementalFetcher,
    classifier: Classifier,
    governor: BackpressureGovernor,
    outputs: OutputStore,
    memo_mode: MemoMode,
}

impl Pipeline {
    pub fn new(
        fetcher: IncrementalFetcher,
        classifier: Classifier,
        governor: BackpressureGovernor,
        outputs: OutputStore,
        memo_mode: MemoMode,
    ) -> Self {
        Self {
            fetcher,
            classifier,
            governor,
            outputs,
            memo_mode,
        }
    }

    pub async fn run(&self) -> Result<PipelineReport> {
        match self.memo_mode {
            MemoMode::WholeBatch => self.run_whole_batch().await,
            MemoMode::PerIdentifier => self.run_per_identifier().await,
        }
    }

    async fn run_whole_batch(&self) -> Result<PipelineReport> {
        if self.outputs.has(Category::Signed).await? {
            let signed = self.outputs.read(Category::Signed).await?;
            let too_large = self.outputs.read(Category::TooLarge).await?;
            info!(
                signed = signed.len(),
                "Signed artifact already present, skipping sync and classification"
            );
            return Ok(PipelineReport::from_artifacts(signed, too_large));
        }

        let identifiers = self.fetcher.sync().await?;
        info!(count = identifiers.len(), "Checking which files are signed");

        let mut ledger = BTreeMap::new();
        let mut pauses = 0;
        for id in &identifiers {
            let outcome = self.classifier.classify(id).await;
            ledger.insert(id.clone(), outcome);
            if self.governor.throttle().await {
                pauses += 1;
            }
        }

        let mut report = self.persist(&identifiers, &ledger).await?;
        report.pauses = pauses;
        Ok(report)
    }

    async fn run_per_identifier(&self) -> Result<PipelineReport> {
        let identifiers = self.fetcher.sync().await?;
        let mut ledger = self.outputs.load_ledger().await?;

        let mut reused = 0;
        let mut pauses = 0;
        for id in &identifiers {
            if ledger.contains_key(id) {
                reused += 1;
                continue;
            }
            let outcome = self.classifier.classify(id).await;
            ledger.insert(id.clone(), outcome);
            if self.governor.throttle().await {
                pauses += 1;
            }
        }
        info!(
            total = identifiers.len(),
            reused,
            classified = identifiers.len() - reused,
            "Classification pass complete"
        );

        self.outputs.save_ledger(&ledger).await?;
        let mut report = self.persist(&identifiers, &ledger).await?;
        report.reused = reused;
        report.pauses = pauses;
        Ok(report)
    }

    /// Write each non-empty category in discovery order. An empty category
    /// removes any artifact left by an earlier run, so an empty Signed set never
    /// short-circuits a later run and a stale TooLarge list does not survive.
    async fn persist(
        &self,
        identifiers: &[Identifier],
        ledger: &BTreeMap<Identifier, Outcome>,
    ) -> Result<PipelineReport> {
        let mut signed = Vec::new();
        let mut too_large = Vec::new();
        let mut unsigned = 0;
        let mut errors = 0;
        for id in identifiers {
            let Some(outcome) = ledger.get(id) else {
                continue;
            };
            match outcome.category() {
                Some(Category::Signed) => signed.push(id.clone()),
                Some(Category::TooLarge) => too_large.push(id.clone()),
                None if outcome.is_error() => errors += 1,
                None => unsigned += 1,
            }
        }

        for (category, ids) in [(Category::Signed, &signed), (Category::TooLarge, &too_large)] {
            if ids.is_empty() {
                self.outputs.remove(category).await?;
            } else {
                self.outputs.write(category, ids).await?;
            }
        }

        let report = PipelineReport {
            origin: RunOrigin::Computed,
            signed,
            too_large,
            unsigned,
            errors,
            reused: 0,
            pauses: 0,
        };
        info!("Pipeline run complete. {report}");
        Ok(report)
    }
}
