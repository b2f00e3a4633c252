//! Grouped cross-partition deletion.
//!
//! Requested names are resolved through the index, grouped by the partition
//! recomputed from each record's `registered_at`, and removed one group per
//! object-store call. A group's index rows are dropped only when every blob in
//! the group was removed without error; otherwise the whole group keeps its rows.

use crate::{
    context::RequestContext,
    errors::{InboxError, InboxResult},
    models::partition::PartitionKey,
    services::{
        bucket_namer::BucketNamer, metadata_index::MetadataIndex, object_store::ObjectStore,
    },
};
use futures::future::join_all;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use tracing::{Instrument, debug, info, warn};

/// What happened to one partition group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    /// Blobs removed and `rows_removed` index rows dropped.
    Purged { rows_removed: u64 },
    /// At least one blob could not be removed; index rows kept.
    Blocked { failed: Vec<String> },
    /// The object store could not run the removal at all; index rows kept.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub partition: PartitionKey,
    pub names: Vec<String>,
    pub outcome: GroupOutcome,
}

#[derive(Debug, Default)]
pub struct DeletionReport {
    /// Requested names with no record in the index.
    pub not_found: Vec<String>,
    pub groups: Vec<GroupReport>,
}

impl DeletionReport {
    pub fn purged_names(&self) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|g| matches!(g.outcome, GroupOutcome::Purged { .. }))
            .flat_map(|g| g.names.iter().map(String::as_str))
            .collect()
    }

    pub fn rows_removed(&self) -> u64 {
        self.groups
            .iter()
            .map(|g| match g.outcome {
                GroupOutcome::Purged { rows_removed } => rows_removed,
                _ => 0,
            })
            .sum()
    }
}

#[derive(Clone)]
pub struct DeletionService {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn MetadataIndex>,
}

impl DeletionService {
    pub fn new(store: Arc<dyn ObjectStore>, index: Arc<dyn MetadataIndex>) -> Self {
        Self { store, index }
    }

    /// Delete the given stored names from both the object store and the index.
    ///
    /// Fails with `NoMatchingRecords` when none of the names is registered, and
    /// with `BackendUnavailable` when the index cannot be read or a group could
    /// not be processed at all. Per-blob failures only block their own group.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        names: &[String],
    ) -> InboxResult<DeletionReport> {
        self.delete_names(names)
            .instrument(ctx.span().clone())
            .await
    }

    async fn delete_names(&self, names: &[String]) -> InboxResult<DeletionReport> {
        let requested: BTreeSet<&str> = names.iter().map(String::as_str).collect();

        let mut report = DeletionReport::default();
        let mut groups: BTreeMap<PartitionKey, Vec<String>> = BTreeMap::new();
        for name in requested {
            match self.index.find_by_name(name).await? {
                Some(record) => groups
                    .entry(BucketNamer::partition_for(record.registered_at))
                    .or_default()
                    .push(record.stored_name),
                None => report.not_found.push(name.to_string()),
            }
        }

        if groups.is_empty() {
            debug!("none of {} requested names is registered", names.len());
            return Err(InboxError::NoMatchingRecords);
        }

        report.groups = join_all(
            groups
                .into_iter()
                .map(|(partition, names)| self.delete_group(partition, names)),
        )
        .await
        .into_iter()
        .collect::<InboxResult<Vec<_>>>()?;

        info!(
            "deleted {} records, {} names not found, {} groups blocked",
            report.rows_removed(),
            report.not_found.len(),
            report
                .groups
                .iter()
                .filter(|g| !matches!(g.outcome, GroupOutcome::Purged { .. }))
                .count()
        );
        debug!("purged {:?}", report.purged_names());

        if let Some(reason) = report.groups.iter().find_map(|g| match &g.outcome {
            GroupOutcome::Unavailable { reason } => Some(reason.clone()),
            _ => None,
        }) {
            return Err(InboxError::BackendUnavailable(reason));
        }
        Ok(report)
    }

    async fn delete_group(
        &self,
        partition: PartitionKey,
        names: Vec<String>,
    ) -> InboxResult<GroupReport> {
        debug!("removing {:?} from partition '{}'", names, partition);

        let outcome = match self.store.remove_batch(&partition, &names).await {
            Err(err) => {
                warn!("partition '{}' removal did not run: {}", partition, err);
                GroupOutcome::Unavailable {
                    reason: err.to_string(),
                }
            }
            Ok(results) => {
                let failed: Vec<String> = results
                    .iter()
                    .filter(|r| r.is_error())
                    .inspect(|r| {
                        debug!(
                            "error deleting object '{}': {}",
                            r.name,
                            r.error.as_deref().unwrap_or_default()
                        )
                    })
                    .map(|r| r.name.clone())
                    .collect();

                if failed.is_empty() {
                    debug!("no errors deleting objects from partition '{}'", partition);
                    let rows_removed = self.index.delete_by_names(&names).await?;
                    GroupOutcome::Purged { rows_removed }
                } else {
                    GroupOutcome::Blocked { failed }
                }
            }
        };

        Ok(GroupReport {
            partition,
            names,
            outcome,
        })
    }
}
