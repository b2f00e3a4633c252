//! src/services/fs_object_store.rs
//!
//! FsObjectStore: local-disk blob backend. Each partition is a directory under
//! `base_path`, and blobs are sharded beneath
//! `base_path/{partition}/{shard}/{shard}/{name}` to keep directories small.

use crate::{
    models::partition::PartitionKey,
    services::object_store::{ObjectStore, ObjectStoreError, ObjectStoreResult, RemovalOutcome},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_NAME_LEN: usize = 255;
const PARTITION_NAME_MIN_LEN: usize = 3;
const PARTITION_NAME_MAX_LEN: usize = 63;
const TMP_PREFIX: &str = ".tmp-";

#[derive(Clone, Debug)]
pub struct FsObjectStore {
    /// Root directory holding one sub-directory per partition.
    base_path: PathBuf,
}

impl FsObjectStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Rejects empty names, path separators, `..` and control bytes.
    fn ensure_name_safe(name: &str) -> ObjectStoreResult<()> {
        let invalid = name.is_empty()
            || name.len() > MAX_OBJECT_NAME_LEN
            || name.starts_with('.')
            || name.contains("..")
            || name
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\');
        if invalid {
            return Err(ObjectStoreError::InvalidObjectName(name.to_string()));
        }
        Ok(())
    }

    /// Partition names become directory names: lowercase letters, digits,
    /// dots and hyphens, 3–63 characters, alphanumeric at both ends.
    fn ensure_partition_safe(partition: &PartitionKey) -> ObjectStoreResult<()> {
        let name = partition.as_str();
        let invalid = |reason: &str| ObjectStoreError::InvalidPartition {
            name: name.to_string(),
            reason: reason.into(),
        };

        if name.len() < PARTITION_NAME_MIN_LEN || name.len() > PARTITION_NAME_MAX_LEN {
            return Err(invalid("must be between 3 and 63 characters"));
        }
        if !name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
        {
            return Err(invalid(
                "allowed characters are lowercase letters, digits, dots, and hyphens",
            ));
        }
        if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) || name.contains("..") {
            return Err(invalid("must start and end with a lowercase letter or digit"));
        }
        Ok(())
    }

    fn partition_root(&self, partition: &PartitionKey) -> PathBuf {
        self.base_path.join(partition.as_str())
    }

    /// First two bytes of MD5(partition/name) as lowercase hex.
    fn object_shards(partition: &PartitionKey, name: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", partition, name));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, partition: &PartitionKey, name: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(partition, name);
        let mut path = self.partition_root(partition);
        path.push(shard_a);
        path.push(shard_b);
        path.push(name);
        path
    }

    async fn partition_exists(&self, partition: &PartitionKey) -> ObjectStoreResult<bool> {
        match fs::metadata(self.partition_root(partition)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(unavailable(err)),
        }
    }

    /// Write through a temp file, fsync, then rename into place.
    async fn write_object(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::other("object path missing parent directory"))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!("{}{}", TMP_PREFIX, Uuid::new_v4()));
        let result = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(data).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, path).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        result
    }

    async fn remove_one(&self, partition: &PartitionKey, name: &str) -> RemovalOutcome {
        if let Err(err) = Self::ensure_name_safe(name) {
            return RemovalOutcome::failed(name, err.to_string());
        }

        let file_path = self.object_path(partition, name);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return RemovalOutcome::failed(name, err.to_string()),
        }

        if let Some(parent) = file_path.parent() {
            prune_empty_dirs(parent, &self.partition_root(partition)).await;
        }
        RemovalOutcome::removed(name)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn ensure_partition(&self, partition: &PartitionKey) -> ObjectStoreResult<()> {
        Self::ensure_partition_safe(partition)?;
        if self.partition_exists(partition).await? {
            debug!("partition '{}' already exists", partition);
            return Ok(());
        }

        fs::create_dir_all(self.partition_root(partition))
            .await
            .map_err(unavailable)?;
        debug!("partition '{}' successfully created", partition);
        Ok(())
    }

    async fn put(
        &self,
        partition: &PartitionKey,
        name: &str,
        data: Bytes,
    ) -> ObjectStoreResult<()> {
        Self::ensure_partition_safe(partition)?;
        Self::ensure_name_safe(name)?;

        let path = self.object_path(partition, name);
        self.write_object(&path, &data)
            .await
            .map_err(|err| ObjectStoreError::Write {
                partition: partition.clone(),
                name: name.to_string(),
                reason: err.to_string(),
            })?;

        debug!(
            "stored {} bytes as '{}' in partition '{}'",
            data.len(),
            name,
            partition
        );
        Ok(())
    }

    async fn remove_batch(
        &self,
        partition: &PartitionKey,
        names: &[String],
    ) -> ObjectStoreResult<Vec<RemovalOutcome>> {
        self.health_check().await?;

        let missing_partition = match Self::ensure_partition_safe(partition) {
            Err(err) => Some(err.to_string()),
            Ok(()) => {
                let exists = self.partition_exists(partition).await?;
                (!exists).then(|| format!("partition `{}` not found", partition))
            }
        };

        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            let outcome = match &missing_partition {
                Some(reason) => RemovalOutcome::failed(name.as_str(), reason.as_str()),
                None => self.remove_one(partition, name).await,
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn list(&self, partition: &PartitionKey) -> ObjectStoreResult<Vec<String>> {
        Self::ensure_partition_safe(partition)?;
        let root = self.partition_root(partition);
        if !self.partition_exists(partition).await? {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for shard_a in read_dirs(&root).await.map_err(unavailable)? {
            for shard_b in read_dirs(&shard_a).await.map_err(unavailable)? {
                let mut entries = fs::read_dir(&shard_b).await.map_err(unavailable)?;
                while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if !name.starts_with(TMP_PREFIX) {
                        names.push(name);
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn health_check(&self) -> ObjectStoreResult<()> {
        match fs::metadata(&self.base_path).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ObjectStoreError::BackendUnavailable(format!(
                "{} is not a directory",
                self.base_path.display()
            ))),
            Err(err) => Err(unavailable(err)),
        }
    }
}

fn unavailable(err: io::Error) -> ObjectStoreError {
    ObjectStoreError::BackendUnavailable(err.to_string())
}

/// Sub-directories of `dir`.
async fn read_dirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

/// Remove empty directories from `start` upwards, stopping below `stop`.
async fn prune_empty_dirs(start: &Path, stop: &Path) {
    let mut current = start.to_path_buf();
    while current.starts_with(stop) && current != stop {
        match fs::remove_dir(&current).await {
            Ok(_) => {
                if let Some(parent) = current.parent() {
                    current = parent.to_path_buf();
                } else {
                    break;
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => break,
            Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
            Err(err) => {
                debug!("failed to prune directory {}: {}", current.display(), err);
                break;
            }
        }
    }
}
