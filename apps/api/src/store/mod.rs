//! Versioned Result Store — append-only analysis history per (user, company).
//!
//! Two backends implement the same `EntryBackend` contract: an index (PostgreSQL, or an
//! in-memory arena when no database is configured) and a structured file tree. Appends go
//! to both under a per-key lock; reads prefer the index and fall back to scanning files.
//! Both resolve "latest" with the same ordering: timestamp descending, then sequence
//! descending.

pub mod fs;
pub mod memory;
pub mod postgres;
pub mod timestamp;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::ComponentReport;
use crate::errors::EngineError;
use crate::matching::ComparisonResult;
use crate::scoring::{AtsResult, Recommendation};

pub use fs::FsBackend;
pub use memory::MemoryIndex;
pub use postgres::PgIndex;

// ────────────────────────────────────────────────────────────────────────────
// Keys and entry model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Comparison,
    ComponentAnalysis,
    AtsCalculation,
    Recommendation,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::Comparison,
        AnalysisKind::ComponentAnalysis,
        AnalysisKind::AtsCalculation,
        AnalysisKind::Recommendation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Comparison => "comparison",
            AnalysisKind::ComponentAnalysis => "component_analysis",
            AnalysisKind::AtsCalculation => "ats_calculation",
            AnalysisKind::Recommendation => "recommendation",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown analysis kind '{s}'"))
    }
}

/// Identifies one versioned log. The company name is slugged so it is safe as a path
/// segment and stable across spelling variants ("Acme Corp" == "acme-corp").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogKey {
    pub user_id: Uuid,
    pub company: String,
}

impl LogKey {
    pub fn new(user_id: Uuid, company: &str) -> Result<Self, EngineError> {
        let company = slugify(company);
        if company.is_empty() {
            return Err(EngineError::MalformedInput(
                "company must contain at least one letter or digit".to_string(),
            ));
        }
        Ok(Self { user_id, company })
    }
}

impl fmt::Display for LogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.company)
    }
}

fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvType {
    Original,
    Tailored,
}

impl CvType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CvType::Original => "original",
            CvType::Tailored => "tailored",
        }
    }
}

impl fmt::Display for CvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CvType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(CvType::Original),
            "tailored" => Ok(CvType::Tailored),
            other => Err(format!("unknown cv type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AnalysisPayload {
    Comparison(ComparisonResult),
    ComponentAnalysis(ComponentReport),
    AtsCalculation(AtsResult),
    Recommendation(Recommendation),
}

impl AnalysisPayload {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisPayload::Comparison(_) => AnalysisKind::Comparison,
            AnalysisPayload::ComponentAnalysis(_) => AnalysisKind::ComponentAnalysis,
            AnalysisPayload::AtsCalculation(_) => AnalysisKind::AtsCalculation,
            AnalysisPayload::Recommendation(_) => AnalysisKind::Recommendation,
        }
    }
}

/// Optional back-references to the files an entry was produced from or produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRefs {
    pub source_file_id: Option<String>,
    pub output_file_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub kind: AnalysisKind,
    /// Fixed-width `timestamp::FORMAT`; empty only for legacy index rows without one.
    pub timestamp: String,
    /// Monotonic per log key; breaks timestamp ties.
    pub sequence: i64,
    pub payload: AnalysisPayload,
    #[serde(flatten)]
    pub refs: FileRefs,
}

impl AnalysisEntry {
    pub fn meta(&self) -> VersionMeta {
        VersionMeta {
            entry_id: self.entry_id,
            kind: self.kind,
            timestamp: self.timestamp.clone(),
            sequence: self.sequence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMeta {
    pub entry_id: Uuid,
    pub kind: AnalysisKind,
    pub timestamp: String,
    pub sequence: i64,
}

/// The mutable "current preferred file" record for one (company, cv_type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvPointer {
    pub user_id: Uuid,
    pub company: String,
    pub cv_type: CvType,
    pub file_id: String,
    pub updated_at: DateTime<Utc>,
}

/// Newest position in a log: the entry with the highest sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHead {
    pub sequence: i64,
    pub timestamp: String,
}

/// The single ordering contract shared by every backend: newest first.
pub fn newest_first(a: &VersionMeta, b: &VersionMeta) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.sequence.cmp(&a.sequence))
}

// ────────────────────────────────────────────────────────────────────────────
// Backend contract
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait EntryBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn insert(&self, entry: &AnalysisEntry) -> Result<(), StoreError>;

    /// Removes a single entry; used to roll back a half-finished append.
    async fn remove(&self, key: &LogKey, kind: AnalysisKind, entry_id: Uuid)
        -> Result<(), StoreError>;

    async fn latest(
        &self,
        key: &LogKey,
        kind: AnalysisKind,
    ) -> Result<Option<AnalysisEntry>, StoreError>;

    /// All versions of one kind, ordered by `newest_first`.
    async fn list(&self, key: &LogKey, kind: AnalysisKind) -> Result<Vec<VersionMeta>, StoreError>;

    async fn head(&self, key: &LogKey) -> Result<Option<LogHead>, StoreError>;

    /// Deletes a whole log and its pointers. Returns the number of entries removed.
    async fn purge(&self, key: &LogKey) -> Result<usize, StoreError>;

    async fn set_pointer(&self, pointer: &CvPointer) -> Result<(), StoreError>;

    async fn pointer(&self, key: &LogKey, cv_type: CvType)
        -> Result<Option<CvPointer>, StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// VersionedResultStore
// ────────────────────────────────────────────────────────────────────────────

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct VersionedResultStore {
    index: Arc<dyn EntryBackend>,
    files: Arc<dyn EntryBackend>,
    locks: Mutex<HashMap<LogKey, Arc<Mutex<()>>>>,
    clock: Clock,
}

impl VersionedResultStore {
    pub fn new(index: Arc<dyn EntryBackend>, files: Arc<dyn EntryBackend>) -> Self {
        Self::with_clock(index, files, Arc::new(Utc::now))
    }

    pub fn with_clock(
        index: Arc<dyn EntryBackend>,
        files: Arc<dyn EntryBackend>,
        clock: Clock,
    ) -> Self {
        Self {
            index,
            files,
            locks: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// The append lock for one log. Entries nobody holds are pruned while the map is locked,
    /// so a key never has two live mutexes.
    async fn key_lock(&self, key: &LogKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.retain(|k, lock| k == key || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Appends one entry and returns its id. The kind is taken from the payload.
    ///
    /// The file is written first, then the index; if the index write fails the file is
    /// removed again so no half-recorded entry survives.
    pub async fn append(
        &self,
        key: &LogKey,
        payload: AnalysisPayload,
        refs: FileRefs,
    ) -> Result<Uuid, EngineError> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let head = self.head(key).await?;
        let entry = AnalysisEntry {
            entry_id: Uuid::new_v4(),
            user_id: key.user_id,
            company: key.company.clone(),
            kind: payload.kind(),
            timestamp: timestamp::next((self.clock)(), head.as_ref().map(|h| h.timestamp.as_str())),
            sequence: head.map_or(1, |h| h.sequence + 1),
            payload,
            refs,
        };

        self.files
            .insert(&entry)
            .await
            .map_err(|e| EngineError::StoreWrite(format!("{}: {e}", self.files.name())))?;

        if let Err(e) = self.index.insert(&entry).await {
            if let Err(undo) = self.files.remove(key, entry.kind, entry.entry_id).await {
                warn!(
                    "Failed to roll back entry {} for {key} after index error: {undo}",
                    entry.entry_id
                );
            }
            return Err(EngineError::StoreWrite(format!("{}: {e}", self.index.name())));
        }

        info!(
            "Appended {} entry {} (seq {}) for {key}",
            entry.kind, entry.entry_id, entry.sequence
        );
        Ok(entry.entry_id)
    }

    /// Highest sequence across both backends, so a lost index never reuses a sequence.
    async fn head(&self, key: &LogKey) -> Result<Option<LogHead>, EngineError> {
        let from_files = self
            .files
            .head(key)
            .await
            .map_err(|e| EngineError::StoreWrite(format!("{}: {e}", self.files.name())))?;
        let from_index = match self.index.head(key).await {
            Ok(h) => h,
            Err(e) => {
                warn!("{} head lookup failed for {key}: {e}", self.index.name());
                None
            }
        };
        Ok(match (from_files, from_index) {
            (Some(a), Some(b)) => Some(if b.sequence > a.sequence { b } else { a }),
            (a, b) => a.or(b),
        })
    }

    /// Newest entry of one kind across the index and the file tree.
    ///
    /// An in-memory index starts empty after a restart while the file tree keeps older
    /// entries. Both are consulted; the newer answer wins.
    pub async fn latest(
        &self,
        key: &LogKey,
        kind: AnalysisKind,
    ) -> Result<AnalysisEntry, EngineError> {
        let indexed = match self.index.latest(key, kind).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("{} lookup failed for {key}/{kind}, scanning files: {e}", self.index.name());
                None
            }
        };
        let scanned = match self.files.latest(key, kind).await {
            Ok(entry) => entry,
            Err(e) if indexed.is_some() => {
                warn!("{} scan failed for {key}/{kind}: {e}", self.files.name());
                None
            }
            Err(e) => return Err(EngineError::StoreRead(format!("{}: {e}", self.files.name()))),
        };

        match (indexed, scanned) {
            (Some(a), Some(b)) => Ok(if newest_first(&b.meta(), &a.meta()).is_lt() { b } else { a }),
            (a, b) => a.or(b).ok_or_else(|| not_found(key, kind.as_str())),
        }
    }

    /// Version metadata for one kind, newest first. Empty logs are `NotFound`.
    ///
    /// The index and the file scan are merged by entry id.
    pub async fn list_versions(
        &self,
        key: &LogKey,
        kind: AnalysisKind,
    ) -> Result<Vec<VersionMeta>, EngineError> {
        let mut versions = match self.index.list(key, kind).await {
            Ok(versions) => versions,
            Err(e) => {
                warn!("{} listing failed for {key}/{kind}, scanning files: {e}", self.index.name());
                Vec::new()
            }
        };
        match self.files.list(key, kind).await {
            Ok(scanned) => {
                let known: HashSet<Uuid> = versions.iter().map(|v| v.entry_id).collect();
                versions.extend(scanned.into_iter().filter(|v| !known.contains(&v.entry_id)));
            }
            Err(e) if !versions.is_empty() => {
                warn!("{} scan failed for {key}/{kind}: {e}", self.files.name());
            }
            Err(e) => return Err(EngineError::StoreRead(format!("{}: {e}", self.files.name()))),
        }

        if versions.is_empty() {
            return Err(not_found(key, kind.as_str()));
        }
        versions.sort_by(newest_first);
        Ok(versions)
    }

    /// Points (company, cv_type) at a file. Last write wins.
    pub async fn set_pointer(
        &self,
        key: &LogKey,
        cv_type: CvType,
        file_id: &str,
    ) -> Result<CvPointer, EngineError> {
        if file_id.trim().is_empty() {
            return Err(EngineError::MalformedInput("file_id must not be empty".to_string()));
        }

        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let pointer = CvPointer {
            user_id: key.user_id,
            company: key.company.clone(),
            cv_type,
            file_id: file_id.trim().to_string(),
            updated_at: (self.clock)(),
        };
        for backend in [&self.files, &self.index] {
            backend
                .set_pointer(&pointer)
                .await
                .map_err(|e| EngineError::StoreWrite(format!("{}: {e}", backend.name())))?;
        }

        info!("Pointer {cv_type} for {key} -> {}", pointer.file_id);
        Ok(pointer)
    }

    pub async fn pointer(&self, key: &LogKey, cv_type: CvType) -> Result<CvPointer, EngineError> {
        match self.index.pointer(key, cv_type).await {
            Ok(Some(pointer)) => return Ok(pointer),
            Ok(None) => {}
            Err(e) => warn!("{} pointer lookup failed for {key}: {e}", self.index.name()),
        }

        self.files
            .pointer(key, cv_type)
            .await
            .map_err(|e| EngineError::StoreRead(format!("{}: {e}", self.files.name())))?
            .ok_or_else(|| not_found(key, &format!("{cv_type} pointer")))
    }

    /// Removes a whole log. Returns how many entries were deleted.
    pub async fn cleanup(&self, key: &LogKey) -> Result<usize, EngineError> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let from_index = self
            .index
            .purge(key)
            .await
            .map_err(|e| EngineError::StoreWrite(format!("{}: {e}", self.index.name())))?;
        let from_files = self
            .files
            .purge(key)
            .await
            .map_err(|e| EngineError::StoreWrite(format!("{}: {e}", self.files.name())))?;
        let removed = from_index.max(from_files);

        info!("Cleaned up {removed} entries for {key}");
        Ok(removed)
    }
}

fn not_found(key: &LogKey, what: &str) -> EngineError {
    EngineError::NotFound {
        user_id: key.user_id,
        company: key.company.clone(),
        kind: what.to_string(),
    }
}
