//! Day partitioning for the object store.
//!
//! Every blob lives in a bucket named after the UTC calendar day its batch was
//! registered on. The mapping is pure, so the bucket of an existing record can
//! always be recomputed from `registered_at`.

use crate::models::partition::PartitionKey;
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;

/// Format used for partition names (`YYYYMMDD`).
pub const PARTITION_FORMAT: &str = "%Y%m%d";

/// Source of "now". Injected so partition logic is testable across day boundaries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, truncated to microseconds so it round-trips through the index.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

#[derive(Clone)]
pub struct BucketNamer {
    clock: Arc<dyn Clock>,
}

impl BucketNamer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Partition holding blobs registered at `timestamp`.
    pub fn partition_for(timestamp: DateTime<Utc>) -> PartitionKey {
        PartitionKey::new(timestamp.format(PARTITION_FORMAT).to_string())
    }

    pub fn current_partition(&self) -> PartitionKey {
        Self::partition_for(self.now())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
