//! Resume record operations: load, save, clear, purge, list.

use anyhow::{bail, Result};
use sqlx::Row;
use std::time::Duration;

use super::db::{unix_timestamp, ResumeStore};
use super::types::{resume_identity, ResumeRecord, ResumeState};
use crate::catalog::FileRecord;

impl ResumeStore {
    /// Load the persisted offset for `record`.
    ///
    /// Returns the default (0, 0) when nothing is stored. Rows for the same
    /// path whose size or mtime no longer match the file are stale: they are
    /// deleted and (0, 0) is returned.
    pub async fn load(&self, record: &FileRecord) -> Result<ResumeState> {
        let identity = resume_identity(record);
        let path = record.path.to_string_lossy().into_owned();
        let size = record.size as i64;
        let mtime = record.modified_nanos();

        let rows = sqlx::query(
            r#"
            SELECT identity, file_size, file_mtime_ns, uploaded_bytes, chunk_size
            FROM resume_state
            WHERE file_path = ?1 OR identity = ?2
            "#,
        )
        .bind(&path)
        .bind(&identity)
        .fetch_all(&self.pool)
        .await?;

        let mut found = ResumeState::default();
        let mut stale: Vec<String> = Vec::new();
        for row in rows {
            let row_identity: String = row.get("identity");
            let row_size: i64 = row.get("file_size");
            let row_mtime: i64 = row.get("file_mtime_ns");
            let uploaded: i64 = row.get("uploaded_bytes");
            let chunk: i64 = row.get("chunk_size");
            let current = row_identity == identity
                && row_size == size
                && row_mtime == mtime
                && uploaded >= 0
                && uploaded <= size;
            if current {
                found = ResumeState {
                    uploaded_bytes: uploaded as u64,
                    chunk_size: chunk.max(0) as u64,
                };
            } else {
                stale.push(row_identity);
            }
        }

        for id in &stale {
            sqlx::query("DELETE FROM resume_state WHERE identity = ?1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        if !stale.is_empty() {
            tracing::info!(
                "discarded {} stale resume record(s) for {}",
                stale.len(),
                record.path.display()
            );
        }

        Ok(found)
    }

    /// Upsert the acknowledged offset for `record`. The write is committed
    /// before this returns. Saving `uploaded_bytes == size` clears the row.
    pub async fn save(&self, record: &FileRecord, uploaded_bytes: u64, chunk_size: u64) -> Result<()> {
        if uploaded_bytes > record.size {
            bail!(
                "refusing to persist offset {} beyond file size {}",
                uploaded_bytes,
                record.size
            );
        }
        if uploaded_bytes == record.size {
            return self.clear(record).await;
        }
        sqlx::query(
            r#"
            INSERT INTO resume_state (
                identity, file_path, file_size, file_mtime_ns,
                uploaded_bytes, chunk_size, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(identity) DO UPDATE SET
                uploaded_bytes = excluded.uploaded_bytes,
                chunk_size = excluded.chunk_size,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(resume_identity(record))
        .bind(record.path.to_string_lossy().into_owned())
        .bind(record.size as i64)
        .bind(record.modified_nanos())
        .bind(uploaded_bytes as i64)
        .bind(chunk_size as i64)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove the row for `record` (no-op if absent).
    pub async fn clear(&self, record: &FileRecord) -> Result<()> {
        sqlx::query("DELETE FROM resume_state WHERE identity = ?1")
            .bind(resume_identity(record))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete rows not written for longer than `max_age`. Returns the number removed.
    pub async fn purge_older_than(&self, max_age: Duration) -> Result<u64> {
        let cutoff = unix_timestamp() - max_age.as_secs() as i64;
        let r = sqlx::query("DELETE FROM resume_state WHERE updated_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    /// All pending records, most recently updated first.
    pub async fn list(&self) -> Result<Vec<ResumeRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT file_path, file_size, uploaded_bytes, chunk_size, updated_at
            FROM resume_state
            ORDER BY updated_at DESC, file_path ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let file_size: i64 = row.get("file_size");
            let uploaded: i64 = row.get("uploaded_bytes");
            let chunk: i64 = row.get("chunk_size");
            out.push(ResumeRecord {
                file_path: row.get("file_path"),
                file_size: file_size.max(0) as u64,
                uploaded_bytes: uploaded.max(0) as u64,
                chunk_size: chunk.max(0) as u64,
                updated_at: row.get("updated_at"),
            });
        }
        Ok(out)
    }
}
