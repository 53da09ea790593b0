//! SQLite-backed session store.

use crate::error::{StoreError, StoreResult};
use crate::store::{ChunkAdded, CompleteOutcome, SessionStore};
use async_trait::async_trait;
use backlot_core::{SessionId, StudioId, UploadSession, UploaderId};
use bytes::Bytes;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS upload_sessions (
    session_id BLOB PRIMARY KEY,
    studio_id TEXT NOT NULL,
    uploader TEXT NOT NULL,
    file_name TEXT NOT NULL,
    content_type TEXT NOT NULL,
    description TEXT,
    total_size INTEGER NOT NULL,
    total_chunks INTEGER NOT NULL,
    completing INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS upload_chunks (
    session_id BLOB NOT NULL,
    chunk_index INTEGER NOT NULL,
    data BLOB NOT NULL,
    received_at TEXT NOT NULL,
    PRIMARY KEY (session_id, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_upload_sessions_completed_at
    ON upload_sessions (completed_at);
CREATE INDEX IF NOT EXISTS idx_upload_sessions_created_at
    ON upload_sessions (created_at);
"#;

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: Uuid,
    studio_id: String,
    uploader: String,
    file_name: String,
    content_type: String,
    description: Option<String>,
    total_size: i64,
    total_chunks: i64,
    completing: bool,
    created_at: OffsetDateTime,
    completed_at: Option<OffsetDateTime>,
}

impl SessionRow {
    fn into_session(self, received: BTreeSet<u32>) -> StoreResult<UploadSession> {
        Ok(UploadSession {
            id: SessionId::from(self.session_id),
            studio_id: StudioId::parse(&self.studio_id)
                .map_err(|e| StoreError::Internal(format!("bad studio_id in row: {e}")))?,
            uploader: UploaderId::parse(&self.uploader)
                .map_err(|e| StoreError::Internal(format!("bad uploader in row: {e}")))?,
            file_name: self.file_name,
            content_type: self.content_type,
            description: self.description,
            total_size: self.total_size as u64,
            total_chunks: self.total_chunks as u32,
            received,
            completing: self.completing,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

/// Durable session store backed by SQLite.
///
/// Chunk insert-if-absent is provided by `INSERT OR IGNORE` under the
/// `(session_id, chunk_index)` primary key, so concurrent writes for the
/// same index cannot race: the first writer's bytes win.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path and run migrations.
    pub async fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under request concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        // A gate persisted across a restart belongs to a completion attempt
        // that died with the previous process. Release it so the session is
        // retriable and the sweep can reclaim it once its TTL passes.
        let released = sqlx::query("UPDATE upload_sessions SET completing = 0 WHERE completing = 1")
            .execute(&pool)
            .await?
            .rows_affected();
        if released > 0 {
            tracing::warn!(released, "Released stale completion gates from a previous run");
        }

        tracing::debug!(path = %path.display(), "SQLite session store ready");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn load_session(&self, id: SessionId) -> StoreResult<Option<UploadSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM upload_sessions WHERE session_id = ?",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let indices: Vec<(i64,)> = sqlx::query_as(
            "SELECT chunk_index FROM upload_chunks WHERE session_id = ? ORDER BY chunk_index",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let received: BTreeSet<u32> = indices.into_iter().map(|(i,)| i as u32).collect();
        Ok(Some(row.into_session(received)?))
    }

    async fn require_session(&self, id: SessionId) -> StoreResult<UploadSession> {
        self.load_session(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create(&self, session: &UploadSession) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO upload_sessions (
                session_id, studio_id, uploader, file_name, content_type,
                description, total_size, total_chunks, completing,
                created_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.studio_id.as_str())
        .bind(session.uploader.as_str())
        .bind(&session.file_name)
        .bind(&session.content_type)
        .bind(&session.description)
        .bind(session.total_size as i64)
        .bind(i64::from(session.total_chunks))
        .bind(session.completing)
        .bind(session.created_at)
        .bind(session.completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(session.id.to_string()));
        }
        Ok(())
    }

    async fn get(&self, id: SessionId) -> StoreResult<Option<UploadSession>> {
        self.load_session(id).await
    }

    async fn add_chunk(&self, id: SessionId, index: u32, bytes: Bytes) -> StoreResult<ChunkAdded> {
        // Atomic insert-if-absent, guarded so completed sessions stay immutable.
        // OR IGNORE swallows the primary-key conflict when the index already
        // exists; the EXISTS guard refuses writes once completed_at is set.
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO upload_chunks (session_id, chunk_index, data, received_at)
            SELECT ?1, ?2, ?3, ?4
            WHERE EXISTS (
                SELECT 1 FROM upload_sessions
                WHERE session_id = ?1 AND completed_at IS NULL
            )
            "#,
        )
        .bind(id.as_uuid())
        .bind(i64::from(index))
        .bind(bytes.as_ref())
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        let session = self.require_session(id).await?;

        if !inserted {
            if session.is_completed() {
                return Err(StoreError::Completed(id.to_string()));
            }
            if !session.received.contains(&index) {
                // Guard matched nothing and the index is absent: should not happen.
                return Err(StoreError::Internal(format!(
                    "chunk {index} for session {id} was neither inserted nor present"
                )));
            }
        }

        Ok(ChunkAdded {
            duplicate: !inserted,
            session,
        })
    }

    async fn chunk_data(&self, id: SessionId) -> StoreResult<BTreeMap<u32, Bytes>> {
        // Existence check first so an empty result is distinguishable from
        // a missing session.
        self.require_session(id).await?;

        let rows: Vec<(i64, Vec<u8>)> = sqlx::query_as(
            "SELECT chunk_index, data FROM upload_chunks WHERE session_id = ? ORDER BY chunk_index",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(index, data)| (index as u32, Bytes::from(data)))
            .collect())
    }

    async fn begin_complete(&self, id: SessionId) -> StoreResult<CompleteOutcome> {
        // The UPDATE acquires SQLite's write lock, so only one concurrent
        // caller can flip the gate.
        let result = sqlx::query(
            "UPDATE upload_sessions SET completing = 1 \
             WHERE session_id = ? AND completed_at IS NULL AND completing = 0",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            let session = self.require_session(id).await?;
            return Ok(CompleteOutcome::Acquired(session));
        }

        match self.load_session(id).await? {
            None => Ok(CompleteOutcome::NotFound),
            Some(session) if session.is_completed() => Ok(CompleteOutcome::AlreadyCompleted),
            Some(_) => Ok(CompleteOutcome::InProgress),
        }
    }

    async fn finish_complete(
        &self,
        id: SessionId,
        completed_at: OffsetDateTime,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE upload_sessions SET completed_at = ?, completing = 0 \
             WHERE session_id = ? AND completed_at IS NULL",
        )
        .bind(completed_at)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.load_session(id).await? {
                None => Err(StoreError::NotFound(id.to_string())),
                Some(_) => Err(StoreError::Completed(id.to_string())),
            };
        }
        Ok(())
    }

    async fn abort_complete(&self, id: SessionId) -> StoreResult<()> {
        sqlx::query("UPDATE upload_sessions SET completing = 0 WHERE session_id = ?")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> StoreResult<()> {
        // Both DELETEs in one transaction so a failure rolls back cleanly.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM upload_chunks WHERE session_id = ?")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM upload_sessions WHERE session_id = ?")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn reclaimable_sessions(
        &self,
        completed_before: OffsetDateTime,
        created_before: OffsetDateTime,
        limit: u32,
    ) -> StoreResult<Vec<SessionId>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT session_id FROM upload_sessions
            WHERE (completed_at IS NOT NULL AND completed_at < ?)
               OR (completed_at IS NULL AND completing = 0 AND created_at < ?)
            ORDER BY created_at
            LIMIT ?
            "#,
        )
        .bind(completed_before)
        .bind(created_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| SessionId::from(id)).collect())
    }
}
