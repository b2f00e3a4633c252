//! Orphan sweep for one partition.
//!
//! Ingest writes the blob before the index row and never rolls back, so a
//! failed insert leaves an unregistered blob behind. The sweep lists a
//! partition, reports blobs with no record and can remove them.
//!
//! Run it against partitions with no ingest in flight: a blob stored a moment
//! before its row is inserted looks exactly like an orphan.

use crate::{
    context::RequestContext,
    errors::InboxResult,
    models::partition::PartitionKey,
    services::{metadata_index::MetadataIndex, object_store::ObjectStore},
};
use std::sync::Arc;
use tracing::{Instrument, info, warn};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub orphans: Vec<String>,
    /// Orphans actually removed (empty unless removal was requested).
    pub removed: Vec<String>,
}

#[derive(Clone)]
pub struct ReconcileService {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn MetadataIndex>,
}

impl ReconcileService {
    pub fn new(store: Arc<dyn ObjectStore>, index: Arc<dyn MetadataIndex>) -> Self {
        Self { store, index }
    }

    pub async fn sweep(
        &self,
        ctx: &RequestContext,
        partition: &PartitionKey,
        remove: bool,
    ) -> InboxResult<SweepReport> {
        async {
            let names = self.store.list(partition).await?;
            let mut report = SweepReport {
                scanned: names.len(),
                ..SweepReport::default()
            };

            for name in names {
                if self.index.find_by_name(&name).await?.is_none() {
                    report.orphans.push(name);
                }
            }
            info!(
                "partition '{}': {} blobs scanned, {} orphans",
                partition,
                report.scanned,
                report.orphans.len()
            );

            if remove && !report.orphans.is_empty() {
                for outcome in self.store.remove_batch(partition, &report.orphans).await? {
                    match outcome.error {
                        None => report.removed.push(outcome.name),
                        Some(err) => warn!("could not remove orphan '{}': {}", outcome.name, err),
                    }
                }
            }
            Ok(report)
        }
        .instrument(ctx.span().clone())
        .await
    }
}
