//! Watched KV views
//!
//! The watch transport itself lives outside this crate; fetchers only need
//! read access to the latest value of every key of a bucket. [`MemoryKvStore`]
//! is the in-process implementation used by single-process deployments and tests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

use lumaflow_common::{Error, Result};

/// Latest values of a watched bucket.
pub trait KvWatch: Send + Sync {
    fn bucket(&self) -> &str;

    fn get(&self, key: &str) -> Option<Bytes>;

    fn entries(&self) -> Vec<(String, Bytes)>;
}

/// Opens watches on named buckets.
#[async_trait]
pub trait WatchFactory: Send + Sync {
    async fn new_watch(&self, pipeline: &str, bucket: &str) -> Result<Arc<dyn KvWatch>>;
}

#[derive(Debug)]
pub struct MemoryBucket {
    name: String,
    entries: DashMap<String, Bytes>,
}

impl MemoryBucket {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: DashMap::new(),
        }
    }

    pub fn put(&self, key: &str, value: impl Into<Bytes>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvWatch for MemoryBucket {
    fn bucket(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn entries(&self) -> Vec<(String, Bytes)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}

/// Buckets must be created before they can be watched.
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    buckets: Arc<DashMap<String, Arc<MemoryBucket>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_bucket(&self, name: &str) -> Arc<MemoryBucket> {
        self.buckets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryBucket::new(name)))
            .clone()
    }

    pub fn bucket(&self, name: &str) -> Option<Arc<MemoryBucket>> {
        self.buckets.get(name).map(|b| Arc::clone(b.value()))
    }

    pub fn delete_bucket(&self, name: &str) {
        self.buckets.remove(name);
    }
}

#[async_trait]
impl WatchFactory for MemoryKvStore {
    async fn new_watch(&self, pipeline: &str, bucket: &str) -> Result<Arc<dyn KvWatch>> {
        let watch: Arc<dyn KvWatch> = self.bucket(bucket).ok_or_else(|| {
            Error::watch(bucket, format!("bucket not found for pipeline {pipeline}"))
        })?;
        debug!(pipeline, bucket, "watching bucket");
        Ok(watch)
    }
}
