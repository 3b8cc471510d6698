//! File-tree backend.
//!
//! Layout: `<root>/<user_id>/<company>/<kind>/<timestamp>__<sequence>__<entry_id>.json`
//! plus `<root>/<user_id>/<company>/pointers/<cv_type>.json`. Every file is written to a
//! temp file in the target directory and renamed into place, so a reader sees either the
//! whole entry or nothing. Ordering is recovered from file names alone.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{
    newest_first, timestamp, AnalysisEntry, AnalysisKind, CvPointer, CvType, EntryBackend,
    LogHead, LogKey, StoreError, VersionMeta,
};

const POINTER_DIR: &str = "pointers";

pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn log_dir(&self, key: &LogKey) -> PathBuf {
        self.root.join(key.user_id.to_string()).join(&key.company)
    }

    fn kind_dir(&self, key: &LogKey, kind: AnalysisKind) -> PathBuf {
        self.log_dir(key).join(kind.as_str())
    }

    fn pointer_path(&self, key: &LogKey, cv_type: CvType) -> PathBuf {
        self.log_dir(key)
            .join(POINTER_DIR)
            .join(format!("{}.json", cv_type.as_str()))
    }

    /// Every well-formed entry file of one kind, newest first.
    async fn scan(
        &self,
        key: &LogKey,
        kind: AnalysisKind,
    ) -> Result<Vec<(VersionMeta, PathBuf)>, StoreError> {
        let dir = self.kind_dir(key, kind);
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        while let Some(dirent) = reader.next_entry().await? {
            let name = dirent.file_name();
            // Temp files and anything else foreign to the layout are skipped.
            if let Some(meta) = name.to_str().and_then(|n| parse_file_name(kind, n)) {
                found.push((meta, dirent.path()));
            }
        }
        found.sort_by(|(a, _), (b, _)| newest_first(a, b));
        Ok(found)
    }
}

pub fn entry_file_name(entry: &AnalysisEntry) -> String {
    format!(
        "{}__{:010}__{}.json",
        entry.timestamp, entry.sequence, entry.entry_id
    )
}

fn parse_file_name(kind: AnalysisKind, name: &str) -> Option<VersionMeta> {
    let stem = name.strip_suffix(".json")?;
    let mut parts = stem.split("__");
    let ts = parts.next()?;
    let sequence = parts.next()?.parse::<i64>().ok()?;
    let entry_id = parts.next()?.parse::<Uuid>().ok()?;
    if parts.next().is_some() || timestamp::parse(ts).is_none() {
        return None;
    }
    Some(VersionMeta {
        entry_id,
        kind,
        timestamp: ts.to_string(),
        sequence,
    })
}

/// Writes `bytes` to `dir/name` through a synced temp file and an atomic rename.
async fn write_atomic(dir: PathBuf, name: String, bytes: Vec<u8>) -> Result<(), StoreError> {
    tokio::task::spawn_blocking(move || -> io::Result<()> {
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(dir.join(name)).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl EntryBackend for FsBackend {
    fn name(&self) -> &'static str {
        "file tree"
    }

    async fn insert(&self, entry: &AnalysisEntry) -> Result<(), StoreError> {
        let key = LogKey {
            user_id: entry.user_id,
            company: entry.company.clone(),
        };
        let bytes = serde_json::to_vec_pretty(entry)?;
        write_atomic(self.kind_dir(&key, entry.kind), entry_file_name(entry), bytes).await?;
        debug!("Wrote {} entry file for {key}", entry.kind);
        Ok(())
    }

    async fn remove(
        &self,
        key: &LogKey,
        kind: AnalysisKind,
        entry_id: Uuid,
    ) -> Result<(), StoreError> {
        for (meta, path) in self.scan(key, kind).await? {
            if meta.entry_id == entry_id {
                tokio::fs::remove_file(path).await?;
            }
        }
        Ok(())
    }

    async fn latest(
        &self,
        key: &LogKey,
        kind: AnalysisKind,
    ) -> Result<Option<AnalysisEntry>, StoreError> {
        let Some((meta, path)) = self.scan(key, kind).await?.into_iter().next() else {
            return Ok(None);
        };
        let entry: Option<AnalysisEntry> = read_json(&path).await?;
        match entry {
            Some(entry) if entry.entry_id == meta.entry_id => Ok(Some(entry)),
            Some(entry) => Err(StoreError::Corrupt(format!(
                "{} holds entry {}",
                path.display(),
                entry.entry_id
            ))),
            // Removed between scan and read.
            None => Ok(None),
        }
    }

    async fn list(&self, key: &LogKey, kind: AnalysisKind) -> Result<Vec<VersionMeta>, StoreError> {
        Ok(self
            .scan(key, kind)
            .await?
            .into_iter()
            .map(|(meta, _)| meta)
            .collect())
    }

    async fn head(&self, key: &LogKey) -> Result<Option<LogHead>, StoreError> {
        let mut head: Option<LogHead> = None;
        for kind in AnalysisKind::ALL {
            for (meta, _) in self.scan(key, kind).await? {
                if head.as_ref().map_or(true, |h| meta.sequence > h.sequence) {
                    head = Some(LogHead {
                        sequence: meta.sequence,
                        timestamp: meta.timestamp,
                    });
                }
            }
        }
        Ok(head)
    }

    async fn purge(&self, key: &LogKey) -> Result<usize, StoreError> {
        let mut removed = 0;
        for kind in AnalysisKind::ALL {
            removed += self.scan(key, kind).await?.len();
        }
        match tokio::fs::remove_dir_all(self.log_dir(key)).await {
            Ok(()) => Ok(removed),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(removed),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_pointer(&self, pointer: &CvPointer) -> Result<(), StoreError> {
        let key = LogKey {
            user_id: pointer.user_id,
            company: pointer.company.clone(),
        };
        let bytes = serde_json::to_vec_pretty(pointer)?;
        write_atomic(
            self.log_dir(&key).join(POINTER_DIR),
            format!("{}.json", pointer.cv_type.as_str()),
            bytes,
        )
        .await
    }

    async fn pointer(
        &self,
        key: &LogKey,
        cv_type: CvType,
    ) -> Result<Option<CvPointer>, StoreError> {
        read_json(&self.pointer_path(key, cv_type)).await
    }
}
