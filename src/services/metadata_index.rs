//! Metadata index abstraction over the `file_records` table.

use crate::models::file_record::{FileRecord, NewFileRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("stored name `{0}` already registered")]
    DuplicateName(String),
    #[error("metadata index unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;

#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Insert a record and return it with its assigned id.
    async fn insert(&self, record: NewFileRecord) -> IndexResult<FileRecord>;

    async fn find_by_name(&self, stored_name: &str) -> IndexResult<Option<FileRecord>>;

    /// Records with `lower <= registered_at <= upper`, in id order, at most `limit`.
    async fn range_query(
        &self,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
        limit: u32,
    ) -> IndexResult<Vec<FileRecord>>;

    /// Remove every record whose stored name is in `names`. Returns rows removed.
    async fn delete_by_names(&self, names: &[String]) -> IndexResult<u64>;

    async fn health_check(&self) -> IndexResult<()>;
}
