use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BlobWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Usage figures for one bucket of a blob store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStat {
    pub bucket_index: u16,
    pub size: u64,
    pub entries: u64,
}

/// Binary payload storage addressed by fingerprint
///
/// Implementations serialize their own internal bucket access; callers only
/// sequence calls within one operation.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, fingerprint: &str) -> Result<bool>;

    async fn create_read_stream(&self, fingerprint: &str) -> Result<BlobReader>;

    async fn create_write_stream(&self, fingerprint: &str) -> Result<BlobWriter>;

    /// Remove a blob. Removing a blob that does not exist succeeds.
    async fn unlink(&self, fingerprint: &str) -> Result<()>;

    /// Bucket statistics: every bucket for `None`, the bucket holding the
    /// fingerprint otherwise.
    async fn stat(&self, fingerprint: Option<&str>) -> Result<Vec<BucketStat>>;

    /// Push buffered writes to durable storage
    async fn flush(&self) -> Result<()>;
}
