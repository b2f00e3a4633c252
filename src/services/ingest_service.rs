//! Batch upload: store each frame, then register it in the index.
//!
//! Per file the sequence is `Pending → Stored → Indexed`. A failed write ends
//! in `StoreFailed`, a failed insert in `IndexFailed` (the blob stays behind
//! unregistered). Neither aborts the batch. Only an unreachable object store
//! (partition creation) fails the whole call.

use crate::{
    context::RequestContext,
    errors::{InboxError, InboxResult},
    models::{
        file_record::{FileRecord, NewFileRecord},
        partition::PartitionKey,
    },
    services::{
        bucket_namer::BucketNamer, metadata_index::MetadataIndex, object_store::ObjectStore,
    },
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

pub const MAX_BATCH_SIZE: usize = 15;

/// Every stored frame gets this extension regardless of what was uploaded.
pub const STORED_EXTENSION: &str = "jpg";

/// One uploaded file as delivered by the transport.
#[derive(Clone, Debug)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub data: Bytes,
}

#[derive(Clone, Debug)]
pub struct IngestBatch {
    /// URL of the originating request, kept in the provenance descriptor.
    pub request_url: String,
    pub files: Vec<IncomingFile>,
}

/// Terminal state of one file in a batch.
#[derive(Debug)]
pub enum FileOutcome {
    Indexed(FileRecord),
    StoreFailed { reason: String },
    IndexFailed { stored_name: String, reason: String },
}

#[derive(Debug)]
pub struct IngestReport {
    pub registered_at: DateTime<Utc>,
    pub partition: PartitionKey,
    /// Outcomes in submission order.
    pub outcomes: Vec<FileOutcome>,
}

impl IngestReport {
    /// Stored names of the files that reached `Indexed`.
    pub fn stored_names(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                FileOutcome::Indexed(record) => Some(record.stored_name.clone()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn MetadataIndex>,
    namer: BucketNamer,
}

impl IngestService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        index: Arc<dyn MetadataIndex>,
        namer: BucketNamer,
    ) -> Self {
        Self {
            store,
            index,
            namer,
        }
    }

    pub async fn ingest(
        &self,
        ctx: &RequestContext,
        batch: IngestBatch,
    ) -> InboxResult<IngestReport> {
        self.ingest_batch(batch).instrument(ctx.span().clone()).await
    }

    async fn ingest_batch(&self, batch: IngestBatch) -> InboxResult<IngestReport> {
        let count = batch.files.len();
        if !(1..=MAX_BATCH_SIZE).contains(&count) {
            return Err(InboxError::InvalidBatchSize {
                got: count,
                max: MAX_BATCH_SIZE,
            });
        }

        let registered_at = self.namer.now();
        let request_descriptor = describe_request(&batch);
        debug!("{}", request_descriptor);

        // The partition comes from the shared timestamp so deletion can find it again.
        let partition = BucketNamer::partition_for(registered_at);
        self.store.ensure_partition(&partition).await?;

        let outcomes = join_all(batch.files.into_iter().map(|file| {
            self.ingest_file(&partition, &request_descriptor, registered_at, file)
        }))
        .await;

        let report = IngestReport {
            registered_at,
            partition,
            outcomes,
        };
        info!(
            "registered {} of {} files at {} in partition '{}'",
            report.stored_names().len(),
            count,
            report.registered_at,
            report.partition
        );
        let orphans: Vec<&str> = report
            .outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                FileOutcome::IndexFailed { stored_name, .. } => Some(stored_name.as_str()),
                _ => None,
            })
            .collect();
        if !orphans.is_empty() {
            warn!("stored but unregistered objects: {:?}", orphans);
        }
        Ok(report)
    }

    async fn ingest_file(
        &self,
        partition: &PartitionKey,
        request_descriptor: &str,
        registered_at: DateTime<Utc>,
        file: IncomingFile,
    ) -> FileOutcome {
        let stored_name = generate_stored_name();
        let original = file.file_name.as_deref().unwrap_or("<unnamed>");

        if let Err(err) = self.store.put(partition, &stored_name, file.data).await {
            debug!("error storing '{}' in object storage: {}", original, err);
            return FileOutcome::StoreFailed {
                reason: err.to_string(),
            };
        }
        debug!(
            "'{}' uploaded as object '{}' to partition '{}'",
            original, stored_name, partition
        );

        let record = NewFileRecord {
            request_descriptor: request_descriptor.to_string(),
            stored_name: stored_name.clone(),
            registered_at,
        };
        match self.index.insert(record).await {
            Ok(record) => FileOutcome::Indexed(record),
            Err(err) => {
                debug!("object '{}' stored but not registered: {}", stored_name, err);
                FileOutcome::IndexFailed {
                    stored_name,
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// `{uuid-v4}.jpg`
pub fn generate_stored_name() -> String {
    format!("{}.{}", Uuid::new_v4(), STORED_EXTENSION)
}

/// Request URL followed by the client-supplied filenames.
fn describe_request(batch: &IngestBatch) -> String {
    let names: Vec<&str> = batch
        .files
        .iter()
        .map(|f| f.file_name.as_deref().unwrap_or(""))
        .collect();
    format!(
        "{} {}",
        batch.request_url,
        json!({ "names_of_posted_files": names })
    )
}
