//! PostgreSQL index.
//!
//! Inserts run in a transaction holding a transaction-scoped advisory lock on the log key,
//! so appends from several processes to the same (user, company) serialize in the database
//! as well as in-process. `UNIQUE (user_id, company, sequence)` rejects any sequence reuse.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{
    AnalysisEntry, AnalysisKind, AnalysisPayload, CvPointer, CvType, EntryBackend, FileRefs,
    LogHead, LogKey, StoreError, VersionMeta,
};

#[derive(Clone)]
pub struct PgIndex {
    pool: PgPool,
}

impl PgIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct EntryRow {
    entry_id: Uuid,
    user_id: Uuid,
    company: String,
    kind: String,
    sequence: i64,
    analysis_timestamp: Option<String>,
    payload: Json<AnalysisPayload>,
    source_file_id: Option<String>,
    output_file_id: Option<String>,
}

impl TryFrom<EntryRow> for AnalysisEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse::<AnalysisKind>().map_err(StoreError::Corrupt)?;
        Ok(Self {
            entry_id: row.entry_id,
            user_id: row.user_id,
            company: row.company,
            kind,
            // Legacy rows without a timestamp sort after every timestamped row.
            timestamp: row.analysis_timestamp.unwrap_or_default(),
            sequence: row.sequence,
            payload: row.payload.0,
            refs: FileRefs {
                source_file_id: row.source_file_id,
                output_file_id: row.output_file_id,
            },
        })
    }
}

#[derive(FromRow)]
struct MetaRow {
    entry_id: Uuid,
    sequence: i64,
    analysis_timestamp: Option<String>,
}

#[derive(FromRow)]
struct PointerRow {
    user_id: Uuid,
    company: String,
    cv_type: String,
    file_id: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PointerRow> for CvPointer {
    type Error = StoreError;

    fn try_from(row: PointerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.user_id,
            company: row.company,
            cv_type: row.cv_type.parse::<CvType>().map_err(StoreError::Corrupt)?,
            file_id: row.file_id,
            updated_at: row.updated_at,
        })
    }
}

fn lock_name(key: &LogKey) -> String {
    format!("analysis_log:{key}")
}

#[async_trait]
impl EntryBackend for PgIndex {
    fn name(&self) -> &'static str {
        "postgres index"
    }

    async fn insert(&self, entry: &AnalysisEntry) -> Result<(), StoreError> {
        let key = LogKey {
            user_id: entry.user_id,
            company: entry.company.clone(),
        };
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(lock_name(&key))
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO analysis_entries
                (entry_id, user_id, company, kind, sequence, analysis_timestamp,
                 payload, source_file_id, output_file_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.user_id)
        .bind(&entry.company)
        .bind(entry.kind.as_str())
        .bind(entry.sequence)
        .bind(&entry.timestamp)
        .bind(Json(&entry.payload))
        .bind(&entry.refs.source_file_id)
        .bind(&entry.refs.output_file_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove(
        &self,
        key: &LogKey,
        kind: AnalysisKind,
        entry_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM analysis_entries
             WHERE user_id = $1 AND company = $2 AND kind = $3 AND entry_id = $4",
        )
        .bind(key.user_id)
        .bind(&key.company)
        .bind(kind.as_str())
        .bind(entry_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest(
        &self,
        key: &LogKey,
        kind: AnalysisKind,
    ) -> Result<Option<AnalysisEntry>, StoreError> {
        let row: Option<EntryRow> = sqlx::query_as(
            r#"
            SELECT entry_id, user_id, company, kind, sequence, analysis_timestamp,
                   payload, source_file_id, output_file_id
            FROM analysis_entries
            WHERE user_id = $1 AND company = $2 AND kind = $3
            ORDER BY analysis_timestamp DESC NULLS LAST, sequence DESC
            LIMIT 1
            "#,
        )
        .bind(key.user_id)
        .bind(&key.company)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(AnalysisEntry::try_from).transpose()
    }

    async fn list(&self, key: &LogKey, kind: AnalysisKind) -> Result<Vec<VersionMeta>, StoreError> {
        let rows: Vec<MetaRow> = sqlx::query_as(
            r#"
            SELECT entry_id, sequence, analysis_timestamp
            FROM analysis_entries
            WHERE user_id = $1 AND company = $2 AND kind = $3
            ORDER BY analysis_timestamp DESC NULLS LAST, sequence DESC
            "#,
        )
        .bind(key.user_id)
        .bind(&key.company)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| VersionMeta {
                entry_id: row.entry_id,
                kind,
                timestamp: row.analysis_timestamp.unwrap_or_default(),
                sequence: row.sequence,
            })
            .collect())
    }

    async fn head(&self, key: &LogKey) -> Result<Option<LogHead>, StoreError> {
        let row: Option<MetaRow> = sqlx::query_as(
            r#"
            SELECT entry_id, sequence, analysis_timestamp
            FROM analysis_entries
            WHERE user_id = $1 AND company = $2
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(key.user_id)
        .bind(&key.company)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| LogHead {
            sequence: row.sequence,
            timestamp: row.analysis_timestamp.unwrap_or_default(),
        }))
    }

    async fn purge(&self, key: &LogKey) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM analysis_entries WHERE user_id = $1 AND company = $2")
            .bind(key.user_id)
            .bind(&key.company)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM cv_pointers WHERE user_id = $1 AND company = $2")
            .bind(key.user_id)
            .bind(&key.company)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(removed as usize)
    }

    async fn set_pointer(&self, pointer: &CvPointer) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO cv_pointers (user_id, company, cv_type, file_id, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, company, cv_type) DO UPDATE SET
                file_id = EXCLUDED.file_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(pointer.user_id)
        .bind(&pointer.company)
        .bind(pointer.cv_type.as_str())
        .bind(&pointer.file_id)
        .bind(pointer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pointer(
        &self,
        key: &LogKey,
        cv_type: CvType,
    ) -> Result<Option<CvPointer>, StoreError> {
        let row: Option<PointerRow> = sqlx::query_as(
            r#"
            SELECT user_id, company, cv_type, file_id, updated_at
            FROM cv_pointers
            WHERE user_id = $1 AND company = $2 AND cv_type = $3
            "#,
        )
        .bind(key.user_id)
        .bind(&key.company)
        .bind(cv_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CvPointer::try_from).transpose()
    }
}
