//! In-memory implementation of `ObjectStore` for tests, with failure injection.

use crate::{
    models::partition::PartitionKey,
    services::object_store::{ObjectStore, ObjectStoreError, ObjectStoreResult, RemovalOutcome},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::{BTreeMap, HashSet},
    sync::Mutex,
};

#[derive(Default)]
pub struct MemoryObjectStore {
    // partition -> name -> bytes
    data: Mutex<BTreeMap<PartitionKey, BTreeMap<String, Bytes>>>,
    failing_puts: Mutex<usize>,
    failing_removals: Mutex<HashSet<String>>,
    unavailable: Mutex<bool>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` calls to `put` fail with a write error.
    pub fn fail_next_puts(&self, count: usize) {
        *self.failing_puts.lock().unwrap() = count;
    }

    /// Removing `name` reports an error instead of deleting it.
    pub fn fail_removal_of(&self, name: &str) {
        self.failing_removals.lock().unwrap().insert(name.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn partition_count(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    pub fn object_count(&self) -> usize {
        self.data.lock().unwrap().values().map(BTreeMap::len).sum()
    }

    pub fn contains(&self, partition: &PartitionKey, name: &str) -> bool {
        self.data
            .lock()
            .unwrap()
            .get(partition)
            .is_some_and(|objects| objects.contains_key(name))
    }

    pub fn get(&self, partition: &PartitionKey, name: &str) -> Option<Bytes> {
        self.data
            .lock()
            .unwrap()
            .get(partition)
            .and_then(|objects| objects.get(name).cloned())
    }

    fn check_available(&self) -> ObjectStoreResult<()> {
        if *self.unavailable.lock().unwrap() {
            return Err(ObjectStoreError::BackendUnavailable(
                "memory store switched off".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_partition(&self, partition: &PartitionKey) -> ObjectStoreResult<()> {
        self.check_available()?;
        self.data
            .lock()
            .unwrap()
            .entry(partition.clone())
            .or_default();
        Ok(())
    }

    async fn put(
        &self,
        partition: &PartitionKey,
        name: &str,
        data: Bytes,
    ) -> ObjectStoreResult<()> {
        {
            let mut failing = self.failing_puts.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(ObjectStoreError::Write {
                    partition: partition.clone(),
                    name: name.to_string(),
                    reason: "injected write failure".into(),
                });
            }
        }

        let mut store = self.data.lock().unwrap();
        let objects = store
            .get_mut(partition)
            .ok_or_else(|| ObjectStoreError::Write {
                partition: partition.clone(),
                name: name.to_string(),
                reason: "partition does not exist".into(),
            })?;
        objects.insert(name.to_string(), data);
        Ok(())
    }

    async fn remove_batch(
        &self,
        partition: &PartitionKey,
        names: &[String],
    ) -> ObjectStoreResult<Vec<RemovalOutcome>> {
        self.check_available()?;
        let failing = self.failing_removals.lock().unwrap().clone();
        let mut store = self.data.lock().unwrap();

        let outcomes = names
            .iter()
            .map(|name| match store.get_mut(partition) {
                None => RemovalOutcome::failed(name.as_str(), "no such partition"),
                Some(_) if failing.contains(name) => {
                    RemovalOutcome::failed(name.as_str(), "injected removal failure")
                }
                Some(objects) => {
                    objects.remove(name);
                    RemovalOutcome::removed(name.as_str())
                }
            })
            .collect();
        Ok(outcomes)
    }

    async fn list(&self, partition: &PartitionKey) -> ObjectStoreResult<Vec<String>> {
        self.check_available()?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(partition)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> ObjectStoreResult<()> {
        self.check_available()
    }
}
