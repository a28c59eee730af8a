// Test mocks for the sync and classification pipeline.
//
// One mock per trait boundary:
// - MockSource (PieceSource): in-memory ordered records, counts page queries
// - MockDirectory (PieceDirectory): file → piece/url map, records reinserts
// - MockResources (ResourceStore): identifier → bytes, records reads
// - MockInspector (DocumentInspector): bytes → signed / unsigned / failure
// - FixedMemory (MemoryProbe): constant reading
//
// Plus helpers for timestamps and a calm governor.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::error::{Result, SigscanError};
use crate::governor::{BackpressureGovernor, MemoryProbe};
use crate::graph::{PieceDirectory, PieceSource};
use crate::inspector::{DocumentInspector, Inspection};
use crate::resource::ResourceStore;
use crate::types::{default_epoch_start, PageRequest, PieceRecord};

/// `days` after the default epoch start.
pub fn day(days: i64) -> DateTime<Utc> {
    default_epoch_start() + ChronoDuration::days(days)
}

/// Governor that never pauses.
pub fn calm_governor() -> BackpressureGovernor {
    BackpressureGovernor::new(
        Box::new(FixedMemory::new(0, 1)),
        0.7,
        Duration::ZERO,
    )
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// Answers page queries from an in-memory list, honoring the exclusive bounds,
/// ascending order and page size. Clones share state.
#[derive(Clone, Default)]
pub struct MockSource {
    records: Arc<Mutex<Vec<PieceRecord>>>,
    requests: Arc<Mutex<Vec<PageRequest>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, identifier: &str, created_at: DateTime<Utc>) -> Self {
        self.push(identifier, created_at);
        self
    }

    /// Simulate new pieces appearing in the store between runs.
    pub fn push(&self, identifier: &str, created_at: DateTime<Utc>) {
        let mut records = self.records.lock().unwrap();
        records.push(PieceRecord::new(identifier, created_at));
        records.sort_by_key(|r| r.created_at);
    }

    pub fn fail_queries(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PieceSource for MockSource {
    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<PieceRecord>> {
        self.requests.lock().unwrap().push(request);
        if *self.failing.lock().unwrap() {
            return Err(SigscanError::Config("mock source unavailable".to_string()));
        }
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.created_at > request.lower_exclusive && r.created_at < request.upper_exclusive)
            .take(request.page_size)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockDirectory
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockDirectory {
    pieces: HashMap<String, (String, Option<String>)>,
    failing_reinserts: HashSet<String>,
    reinserted: Arc<Mutex<Vec<String>>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_piece(mut self, physical_uri: &str, piece_uri: &str, url: Option<&str>) -> Self {
        self.pieces.insert(
            physical_uri.to_string(),
            (piece_uri.to_string(), url.map(String::from)),
        );
        self
    }

    pub fn failing_reinsert(mut self, piece_uri: &str) -> Self {
        self.failing_reinserts.insert(piece_uri.to_string());
        self
    }

    pub fn reinserted(&self) -> Vec<String> {
        self.reinserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PieceDirectory for MockDirectory {
    async fn piece_url(&self, physical_uri: &str) -> Result<Option<String>> {
        Ok(self
            .pieces
            .get(physical_uri)
            .and_then(|(_, url)| url.clone()))
    }

    async fn piece_uri(&self, physical_uri: &str) -> Result<Option<String>> {
        Ok(self.pieces.get(physical_uri).map(|(piece, _)| piece.clone()))
    }

    async fn reinsert_piece(&self, piece_uri: &str) -> Result<()> {
        if self.failing_reinserts.contains(piece_uri) {
            return Err(SigscanError::Config(format!("mock reinsert failed for {piece_uri}")));
        }
        self.reinserted.lock().unwrap().push(piece_uri.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockResources
// ---------------------------------------------------------------------------

/// Identifier → bytes. Unregistered identifiers fail like a missing file.
#[derive(Clone, Default)]
pub struct MockResources {
    files: HashMap<String, Vec<u8>>,
    reads: Arc<Mutex<Vec<String>>>,
}

impl MockResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, identifier: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(identifier.to_string(), bytes);
        self
    }

    /// Identifiers whose content was read, in order.
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }

    fn lookup(&self, identifier: &str) -> Result<&Vec<u8>> {
        self.files.get(identifier).ok_or_else(|| {
            SigscanError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such resource: {identifier}"),
            ))
        })
    }
}

#[async_trait]
impl ResourceStore for MockResources {
    async fn size(&self, identifier: &str) -> Result<u64> {
        Ok(self.lookup(identifier)?.len() as u64)
    }

    async fn read(&self, identifier: &str) -> Result<Vec<u8>> {
        let bytes = self.lookup(identifier)?.clone();
        self.reads.lock().unwrap().push(identifier.to_string());
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// MockInspector
// ---------------------------------------------------------------------------

/// Content-keyed inspector: registered signed bytes report a signature,
/// registered failing bytes error, everything else is unsigned.
#[derive(Clone, Default)]
pub struct MockInspector {
    signed: HashSet<Vec<u8>>,
    failing: HashSet<Vec<u8>>,
}

impl MockInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed(mut self, bytes: &[u8]) -> Self {
        self.signed.insert(bytes.to_vec());
        self
    }

    pub fn failing(mut self, bytes: &[u8]) -> Self {
        self.failing.insert(bytes.to_vec());
        self
    }
}

impl DocumentInspector for MockInspector {
    fn inspect(&self, bytes: &[u8]) -> Result<Inspection> {
        if self.failing.contains(bytes) {
            return Err(SigscanError::Pdf("mock parse failure".to_string()));
        }
        Ok(Inspection {
            has_signature_field: self.signed.contains(bytes),
        })
    }
}

// ---------------------------------------------------------------------------
// FixedMemory
// ---------------------------------------------------------------------------

pub struct FixedMemory {
    used: u64,
    ceiling: u64,
}

impl FixedMemory {
    pub fn new(used: u64, ceiling: u64) -> Self {
        Self { used, ceiling }
    }
}

impl MemoryProbe for FixedMemory {
    fn used_bytes(&self) -> u64 {
        self.used
    }

    fn ceiling_bytes(&self) -> u64 {
        self.ceiling
    }
}
