pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod governor;
pub mod graph;
pub mod inspector;
pub mod outputs;
pub mod pipeline;
pub mod reprocess;
pub mod resource;
pub mod snapshot;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use classifier::Classifier;
pub use config::Config;
pub use error::{Result, SigscanError};
pub use fetcher::IncrementalFetcher;
pub use governor::{BackpressureGovernor, MemoryProbe, ProcessMemoryProbe};
pub use graph::{PieceDirectory, PieceGraph, PieceSource};
pub use inspector::{DocumentInspector, Inspection, PdfInspector};
pub use outputs::OutputStore;
pub use pipeline::{Pipeline, PipelineReport, RunOrigin};
pub use reprocess::{reprocess_signed, ReprocessStats};
pub use resource::{ResourceStore, ShareStore};
pub use snapshot::SnapshotStore;
pub use types::*;
