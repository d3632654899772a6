#![allow(dead_code)]

use async_trait::async_trait;
use embedstore_core::{
    BlobReader, BlobStore, BlobWriter, BucketStat, EmbedError, EmbeddedStorage, MemoryBlobStore,
    Result,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Blob store wrapper with switchable faults and canned statistics
#[derive(Default)]
pub struct ScriptedBlobStore {
    pub inner: MemoryBlobStore,
    pub fail_exists: AtomicBool,
    pub fail_unlink: AtomicBool,
    pub fail_stat: AtomicBool,
    pub fail_flush: AtomicBool,
    pub stats: Mutex<Option<Vec<BucketStat>>>,
    pub unlinked: Mutex<Vec<String>>,
    pub stat_requests: Mutex<Vec<Option<String>>>,
}

impl ScriptedBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_stats(&self, sizes: &[u64]) {
        let stats = sizes
            .iter()
            .enumerate()
            .map(|(index, size)| BucketStat {
                bucket_index: index as u16,
                size: *size,
                entries: 1,
            })
            .collect();
        *self.stats.lock().unwrap() = Some(stats);
    }
}

fn simulated(operation: &'static str) -> EmbedError {
    EmbedError::backend(
        operation,
        std::io::Error::other(format!("simulated {} fault", operation)),
    )
}

#[async_trait]
impl BlobStore for ScriptedBlobStore {
    async fn exists(&self, fingerprint: &str) -> Result<bool> {
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(simulated("exists"));
        }
        self.inner.exists(fingerprint).await
    }

    async fn create_read_stream(&self, fingerprint: &str) -> Result<BlobReader> {
        self.inner.create_read_stream(fingerprint).await
    }

    async fn create_write_stream(&self, fingerprint: &str) -> Result<BlobWriter> {
        self.inner.create_write_stream(fingerprint).await
    }

    async fn unlink(&self, fingerprint: &str) -> Result<()> {
        if self.fail_unlink.load(Ordering::SeqCst) {
            return Err(simulated("unlink"));
        }
        self.unlinked.lock().unwrap().push(fingerprint.to_string());
        self.inner.unlink(fingerprint).await
    }

    async fn stat(&self, fingerprint: Option<&str>) -> Result<Vec<BucketStat>> {
        if self.fail_stat.load(Ordering::SeqCst) {
            return Err(simulated("stat"));
        }
        self.stat_requests
            .lock()
            .unwrap()
            .push(fingerprint.map(str::to_string));
        if let Some(stats) = self.stats.lock().unwrap().clone() {
            return Ok(stats);
        }
        self.inner.stat(fingerprint).await
    }

    async fn flush(&self) -> Result<()> {
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(simulated("flush"));
        }
        self.inner.flush().await
    }
}

pub fn scripted_storage() -> (TempDir, Arc<ScriptedBlobStore>, EmbeddedStorage) {
    let temp = TempDir::new().unwrap();
    let blobs = ScriptedBlobStore::new();
    let storage = EmbeddedStorage::with_blob_store(temp.path(), blobs.clone()).unwrap();
    (temp, blobs, storage)
}
