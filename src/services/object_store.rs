//! Blob backend abstraction.
//!
//! Blobs are addressed by `(partition, name)`. Individual blob removals never
//! raise: `remove_batch` reports one outcome per requested name and only fails
//! as a whole when the backend cannot be reached.

use crate::models::partition::PartitionKey;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object store unavailable: {0}")]
    BackendUnavailable(String),
    #[error("failed to write `{name}` to partition `{partition}`: {reason}")]
    Write {
        partition: PartitionKey,
        name: String,
        reason: String,
    },
    #[error("partition `{name}` invalid: {reason}")]
    InvalidPartition { name: String, reason: String },
    #[error("invalid object name `{0}`")]
    InvalidObjectName(String),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Result of removing a single blob inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub name: String,
    pub error: Option<String>,
}

impl RemovalOutcome {
    pub fn removed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the partition if it is missing. Calling it again is a no-op.
    async fn ensure_partition(&self, partition: &PartitionKey) -> ObjectStoreResult<()>;

    /// Write `data` as `name` inside `partition`. Not retried.
    async fn put(&self, partition: &PartitionKey, name: &str, data: Bytes)
    -> ObjectStoreResult<()>;

    /// Best-effort bulk removal, one outcome per requested name.
    async fn remove_batch(
        &self,
        partition: &PartitionKey,
        names: &[String],
    ) -> ObjectStoreResult<Vec<RemovalOutcome>>;

    /// Names of all blobs currently stored in `partition`.
    async fn list(&self, partition: &PartitionKey) -> ObjectStoreResult<Vec<String>>;

    async fn health_check(&self) -> ObjectStoreResult<()>;
}
