//! src/services/sqlite_index.rs
//!
//! SqliteIndex: `MetadataIndex` backed by a SQLx SQLite pool. The schema is
//! embedded from `migrations/0001_init.sql` and applied idempotently.

use crate::{
    models::file_record::{FileRecord, NewFileRecord},
    services::metadata_index::{IndexError, IndexResult, MetadataIndex},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;

const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone)]
pub struct SqliteIndex {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteIndex {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Run the embedded schema statements one by one.
    pub async fn migrate(&self) -> IndexResult<()> {
        let statements = INIT_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("Running {} migration statements...", statements.len());
        for stmt in statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await.map_err(classify)?;
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataIndex for SqliteIndex {
    async fn insert(&self, record: NewFileRecord) -> IndexResult<FileRecord> {
        let result = sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO file_records (request_descriptor, stored_name, registered_at)
            VALUES (?, ?, ?)
            RETURNING id, request_descriptor, stored_name, registered_at
            "#,
        )
        .bind(&record.request_descriptor)
        .bind(&record.stored_name)
        .bind(record.registered_at)
        .fetch_one(&*self.db)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(err) if is_unique_violation(&err) => {
                Err(IndexError::DuplicateName(record.stored_name))
            }
            Err(err) => Err(classify(err)),
        }
    }

    async fn find_by_name(&self, stored_name: &str) -> IndexResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, request_descriptor, stored_name, registered_at
             FROM file_records WHERE stored_name = ?",
        )
        .bind(stored_name)
        .fetch_optional(&*self.db)
        .await
        .map_err(classify)
    }

    async fn range_query(
        &self,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
        limit: u32,
    ) -> IndexResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, request_descriptor, stored_name, registered_at
             FROM file_records
             WHERE registered_at >= ? AND registered_at <= ?
             ORDER BY id ASC
             LIMIT ?",
        )
        .bind(lower)
        .bind(upper)
        .bind(i64::from(limit))
        .fetch_all(&*self.db)
        .await
        .map_err(classify)
    }

    async fn delete_by_names(&self, names: &[String]) -> IndexResult<u64> {
        if names.is_empty() {
            return Ok(0);
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("DELETE FROM file_records WHERE stored_name IN (");
        let mut separated = builder.separated(", ");
        for name in names {
            separated.push_bind(name);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&*self.db).await.map_err(classify)?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> IndexResult<()> {
        match sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await
        {
            Ok(1) => Ok(()),
            Ok(v) => Err(IndexError::Unavailable(format!("unexpected result: {}", v))),
            Err(err) => Err(classify(err)),
        }
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

/// Connection-level failures mean the index cannot be reached at all.
fn classify(err: sqlx::Error) -> IndexError {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => IndexError::Unavailable(err.to_string()),
        other => IndexError::Sqlx(other),
    }
}
