pub mod bucket_namer;
pub mod deletion_service;
pub mod fs_object_store;
pub mod inbox_service;
pub mod ingest_service;
#[cfg(test)]
pub mod memory_object_store;
pub mod metadata_index;
pub mod object_store;
pub mod query_service;
pub mod reconcile_service;
pub mod sqlite_index;
