//! InboxService: the shared router state. Wires one object store and one
//! metadata index into the ingest, query, delete and sweep orchestrators.

use crate::services::{
    bucket_namer::BucketNamer, deletion_service::DeletionService, ingest_service::IngestService,
    metadata_index::MetadataIndex, object_store::ObjectStore, query_service::QueryService,
    reconcile_service::ReconcileService,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct InboxService {
    pub store: Arc<dyn ObjectStore>,
    pub index: Arc<dyn MetadataIndex>,
    pub ingest: IngestService,
    pub query: QueryService,
    pub deletion: DeletionService,
    pub reconcile: ReconcileService,
}

impl InboxService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        index: Arc<dyn MetadataIndex>,
        namer: BucketNamer,
    ) -> Self {
        Self {
            ingest: IngestService::new(store.clone(), index.clone(), namer),
            query: QueryService::new(index.clone()),
            deletion: DeletionService::new(store.clone(), index.clone()),
            reconcile: ReconcileService::new(store.clone(), index.clone()),
            store,
            index,
        }
    }
}
