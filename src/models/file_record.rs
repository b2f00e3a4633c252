//! Represents a registered frame: one row of the metadata index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored frame as recorded in the metadata index.
///
/// The record does not carry its partition. The partition is recomputed from
/// `registered_at` whenever the blob has to be located again.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// Surrogate key assigned by the index on insert. Never reused.
    pub id: i64,

    /// Summary of the originating request (URL + submitted filenames).
    /// Kept for provenance only.
    pub request_descriptor: String,

    /// Generated object name, `{uuid}.jpg`. Unique across the index.
    pub stored_name: String,

    /// When the batch this frame belongs to was accepted.
    pub registered_at: DateTime<Utc>,
}

/// A record that has not been inserted yet.
#[derive(Clone, Debug)]
pub struct NewFileRecord {
    pub request_descriptor: String,
    pub stored_name: String,
    pub registered_at: DateTime<Utc>,
}
