//! In-memory blob store (for tests and embedding)

use crate::error::{EmbedError, Result};
use crate::storage::blob_store::{BlobReader, BlobStore, BlobWriter, BucketStat};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

type BlobMap = Arc<RwLock<HashMap<String, Bytes>>>;

/// Blob store kept in a single in-memory bucket
///
/// Not persistent. A write stream becomes visible once it is shut down.
#[derive(Default, Clone)]
pub struct MemoryBlobStore {
    blobs: BlobMap,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, fingerprint: &str) -> Option<Bytes> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(fingerprint)
            .cloned()
    }

    pub fn insert(&self, fingerprint: impl Into<String>, data: impl Into<Bytes>) {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fingerprint.into(), data.into());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, fingerprint: &str) -> Result<bool> {
        Ok(self.get(fingerprint).is_some())
    }

    async fn create_read_stream(&self, fingerprint: &str) -> Result<BlobReader> {
        let data = self.get(fingerprint).ok_or_else(|| {
            EmbedError::backend(
                "open read stream",
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("blob not found: {}", fingerprint),
                ),
            )
        })?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn create_write_stream(&self, fingerprint: &str) -> Result<BlobWriter> {
        Ok(Box::new(MemoryBlobWriter {
            fingerprint: fingerprint.to_string(),
            buffer: Vec::new(),
            blobs: self.blobs.clone(),
        }))
    }

    async fn unlink(&self, fingerprint: &str) -> Result<()> {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(fingerprint);
        Ok(())
    }

    async fn stat(&self, fingerprint: Option<&str>) -> Result<Vec<BucketStat>> {
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        let (size, entries) = match fingerprint {
            Some(fingerprint) => blobs
                .get(fingerprint)
                .map(|data| (data.len() as u64, 1))
                .unwrap_or((0, 0)),
            None => (
                blobs.values().map(|data| data.len() as u64).sum(),
                blobs.len() as u64,
            ),
        };

        Ok(vec![BucketStat {
            bucket_index: 0,
            size,
            entries,
        }])
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

struct MemoryBlobWriter {
    fingerprint: String,
    buffer: Vec<u8>,
    blobs: BlobMap,
}

impl AsyncWrite for MemoryBlobWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.get_mut().buffer.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let data = Bytes::from(std::mem::take(&mut this.buffer));
        this.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(this.fingerprint.clone(), data);
        Poll::Ready(Ok(()))
    }
}
