//! In-memory index: an insertion-ordered arena of entries.
//! Used when no database is configured, and by the tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    newest_first, AnalysisEntry, AnalysisKind, CvPointer, CvType, EntryBackend, LogHead, LogKey,
    StoreError, VersionMeta,
};

#[derive(Default)]
pub struct MemoryIndex {
    entries: RwLock<Vec<AnalysisEntry>>,
    pointers: RwLock<HashMap<(LogKey, CvType), CvPointer>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn belongs(entry: &AnalysisEntry, key: &LogKey) -> bool {
    entry.user_id == key.user_id && entry.company == key.company
}

#[async_trait]
impl EntryBackend for MemoryIndex {
    fn name(&self) -> &'static str {
        "memory index"
    }

    async fn insert(&self, entry: &AnalysisEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.entry_id == entry.entry_id) {
            return Err(StoreError::Corrupt(format!(
                "entry {} already indexed",
                entry.entry_id
            )));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn remove(
        &self,
        key: &LogKey,
        kind: AnalysisKind,
        entry_id: Uuid,
    ) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .retain(|e| !(belongs(e, key) && e.kind == kind && e.entry_id == entry_id));
        Ok(())
    }

    async fn latest(
        &self,
        key: &LogKey,
        kind: AnalysisKind,
    ) -> Result<Option<AnalysisEntry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| belongs(e, key) && e.kind == kind)
            .min_by(|a, b| newest_first(&a.meta(), &b.meta()))
            .cloned())
    }

    async fn list(&self, key: &LogKey, kind: AnalysisKind) -> Result<Vec<VersionMeta>, StoreError> {
        let entries = self.entries.read().await;
        let mut versions: Vec<VersionMeta> = entries
            .iter()
            .filter(|e| belongs(e, key) && e.kind == kind)
            .map(AnalysisEntry::meta)
            .collect();
        versions.sort_by(newest_first);
        Ok(versions)
    }

    async fn head(&self, key: &LogKey) -> Result<Option<LogHead>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| belongs(e, key))
            .max_by_key(|e| e.sequence)
            .map(|e| LogHead {
                sequence: e.sequence,
                timestamp: e.timestamp.clone(),
            }))
    }

    async fn purge(&self, key: &LogKey) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| !belongs(e, key));
        let removed = before - entries.len();

        self.pointers.write().await.retain(|(k, _), _| k != key);
        Ok(removed)
    }

    async fn set_pointer(&self, pointer: &CvPointer) -> Result<(), StoreError> {
        let key = LogKey {
            user_id: pointer.user_id,
            company: pointer.company.clone(),
        };
        self.pointers
            .write()
            .await
            .insert((key, pointer.cv_type), pointer.clone());
        Ok(())
    }

    async fn pointer(
        &self,
        key: &LogKey,
        cv_type: CvType,
    ) -> Result<Option<CvPointer>, StoreError> {
        Ok(self
            .pointers
            .read()
            .await
            .get(&(key.clone(), cv_type))
            .cloned())
    }
}
