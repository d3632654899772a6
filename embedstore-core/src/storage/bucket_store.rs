use crate::config::validate_bucket_count;
use crate::error::{EmbedError, Result};
use crate::paths::ensure_directory;
use crate::storage::blob_store::{BlobReader, BlobStore, BlobWriter, BucketStat};
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, ready};
use tokio::fs;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

/// BucketBlobStore keeps blobs as plain files spread over a fixed set of buckets.
/// Layout: {base_path}/{bucket:03}/{fingerprint}
///
/// Each write stream fills its own `{fingerprint}.{n}.tmp`, fsyncs it and
/// renames it into place on shutdown, so a blob exists only once its writer
/// has been shut down and the last writer to finish replaces it whole.
pub struct BucketBlobStore {
    base_path: PathBuf,
    buckets: Vec<Mutex<()>>,
    next_temp_id: AtomicU64,
}

const TEMP_SUFFIX: &str = ".tmp";

impl BucketBlobStore {
    pub fn new(base_path: PathBuf, bucket_count: u16) -> Result<Self> {
        validate_bucket_count(bucket_count)?;
        let base_path = ensure_directory(&base_path)?;
        let buckets = (0..bucket_count).map(|_| Mutex::new(())).collect();

        tracing::info!(
            "Opened bucket blob store at {:?} with {} buckets",
            base_path,
            bucket_count
        );
        Ok(Self {
            base_path,
            buckets,
            next_temp_id: AtomicU64::new(0),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn bucket_count(&self) -> u16 {
        self.buckets.len() as u16
    }

    /// Bucket holding a fingerprint: its first hex byte, or its first raw
    /// byte when it does not start with hex, modulo the bucket count.
    pub fn bucket_index(&self, fingerprint: &str) -> Result<u16> {
        check_fingerprint(fingerprint)?;

        let lead = fingerprint
            .get(..2)
            .and_then(|prefix| u8::from_str_radix(prefix, 16).ok())
            .unwrap_or_else(|| fingerprint.as_bytes()[0]);

        Ok(lead as u16 % self.bucket_count())
    }

    fn bucket_dir(&self, bucket_index: u16) -> PathBuf {
        self.base_path.join(format!("{:03}", bucket_index))
    }

    fn blob_path(&self, fingerprint: &str) -> Result<(u16, PathBuf)> {
        let bucket_index = self.bucket_index(fingerprint)?;
        let path = self.bucket_dir(bucket_index).join(fingerprint);
        Ok((bucket_index, path))
    }

    async fn bucket_stat(&self, bucket_index: u16) -> Result<BucketStat> {
        let bucket_dir = self.bucket_dir(bucket_index);
        let mut stat = BucketStat {
            bucket_index,
            ..BucketStat::default()
        };

        let mut entries = match fs::read_dir(&bucket_dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(stat),
            Err(error) => return Err(EmbedError::backend("stat", error)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|error| EmbedError::backend("stat", error))?
        {
            let meta = entry
                .metadata()
                .await
                .map_err(|error| EmbedError::backend("stat", error))?;
            let in_flight = entry.file_name().to_string_lossy().ends_with(TEMP_SUFFIX);
            if meta.is_file() && !in_flight {
                stat.size += meta.len();
                stat.entries += 1;
            }
        }

        Ok(stat)
    }
}

#[async_trait]
impl BlobStore for BucketBlobStore {
    async fn exists(&self, fingerprint: &str) -> Result<bool> {
        let (_, path) = self.blob_path(fingerprint)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(EmbedError::backend("exists", error)),
        }
    }

    async fn create_read_stream(&self, fingerprint: &str) -> Result<BlobReader> {
        let (_, path) = self.blob_path(fingerprint)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|error| EmbedError::backend("open read stream", error))?;
        Ok(Box::new(file))
    }

    async fn create_write_stream(&self, fingerprint: &str) -> Result<BlobWriter> {
        let (bucket_index, path) = self.blob_path(fingerprint)?;
        let temp_id = self.next_temp_id.fetch_add(1, Ordering::Relaxed);
        let temp_name = format!("{}.{}{}", fingerprint, temp_id, TEMP_SUFFIX);
        let temp_path = path.with_file_name(temp_name);
        let _guard = self.buckets[bucket_index as usize].lock().await;

        fs::create_dir_all(self.bucket_dir(bucket_index))
            .await
            .map_err(|error| EmbedError::backend("open write stream", error))?;
        let file = fs::File::create(&temp_path)
            .await
            .map_err(|error| EmbedError::backend("open write stream", error))?;

        tracing::debug!(
            "Opened write stream for blob {} (bucket {})",
            fingerprint,
            bucket_index
        );
        Ok(Box::new(BucketBlobWriter {
            file: Some(file),
            temp_path,
            final_path: path,
            commit: None,
            committed: false,
        }))
    }

    async fn unlink(&self, fingerprint: &str) -> Result<()> {
        let (bucket_index, path) = self.blob_path(fingerprint)?;
        let _guard = self.buckets[bucket_index as usize].lock().await;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Unlinked blob {} (bucket {})", fingerprint, bucket_index);
                Ok(())
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(EmbedError::backend("unlink", error)),
        }
    }

    async fn stat(&self, fingerprint: Option<&str>) -> Result<Vec<BucketStat>> {
        if let Some(fingerprint) = fingerprint {
            let bucket_index = self.bucket_index(fingerprint)?;
            let _guard = self.buckets[bucket_index as usize].lock().await;
            return Ok(vec![self.bucket_stat(bucket_index).await?]);
        }

        let mut stats = Vec::with_capacity(self.buckets.len());
        for (bucket_index, lock) in self.buckets.iter().enumerate() {
            let _guard = lock.lock().await;
            stats.push(self.bucket_stat(bucket_index as u16).await?);
        }
        Ok(stats)
    }

    async fn flush(&self) -> Result<()> {
        for (bucket_index, lock) in self.buckets.iter().enumerate() {
            let bucket_dir = self.bucket_dir(bucket_index as u16);
            let _guard = lock.lock().await;

            let dir = match fs::File::open(&bucket_dir).await {
                Ok(dir) => dir,
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => continue,
                Err(error) => return Err(EmbedError::backend("flush", error)),
            };
            dir.sync_all()
                .await
                .map_err(|error| EmbedError::backend("flush", error))?;
        }
        Ok(())
    }
}

type CommitFuture = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

struct BucketBlobWriter {
    file: Option<fs::File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    commit: Option<CommitFuture>,
    committed: bool,
}

impl AsyncWrite for BucketBlobWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut().file.as_mut() {
            Some(file) => Pin::new(file).poll_write(cx, buf),
            None => Poll::Ready(Err(closed_writer())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut().file.as_mut() {
            Some(file) => Pin::new(file).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        if this.committed {
            return Poll::Ready(Ok(()));
        }

        if this.commit.is_none() {
            let Some(file) = this.file.as_mut() else {
                return Poll::Ready(Err(closed_writer()));
            };
            ready!(Pin::new(file).poll_shutdown(cx))?;
            if let Some(file) = this.file.take() {
                this.commit = Some(Box::pin(commit_blob(
                    file,
                    this.temp_path.clone(),
                    this.final_path.clone(),
                )));
            }
        }

        let Some(commit) = this.commit.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        let result = ready!(commit.as_mut().poll(cx));
        this.commit = None;
        this.committed = result.is_ok();
        Poll::Ready(result)
    }
}

async fn commit_blob(
    file: fs::File,
    temp_path: PathBuf,
    final_path: PathBuf,
) -> std::io::Result<()> {
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, final_path).await
}

fn closed_writer() -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "blob write stream already shut down",
    )
}

impl Drop for BucketBlobWriter {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

fn check_fingerprint(fingerprint: &str) -> Result<()> {
    let invalid = fingerprint.is_empty()
        || fingerprint == "."
        || fingerprint == ".."
        || fingerprint.ends_with(TEMP_SUFFIX)
        || fingerprint.contains(['/', '\\', '\0']);

    if invalid {
        return Err(EmbedError::backend(
            "resolve fingerprint",
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid fingerprint: {:?}", fingerprint),
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::compute_fingerprint;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_bucket_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = BucketBlobStore::new(temp_dir.path().to_path_buf(), 256).unwrap();

        let fingerprint = compute_fingerprint("test item");
        assert!(!store.exists(&fingerprint).await.unwrap());

        // Write blob
        let mut writer = store.create_write_stream(&fingerprint).await.unwrap();
        writer.write_all(b"test shard content").await.unwrap();
        assert!(!store.exists(&fingerprint).await.unwrap());
        writer.shutdown().await.unwrap();
        assert!(store.exists(&fingerprint).await.unwrap());

        // Read blob
        let mut reader = store.create_read_stream(&fingerprint).await.unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.unwrap();
        assert_eq!(data, b"test shard content");

        // Stats for its bucket
        let stats = store.stat(Some(&fingerprint)).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].bucket_index, store.bucket_index(&fingerprint).unwrap());
        assert_eq!(stats[0].size, 18);
        assert_eq!(stats[0].entries, 1);

        store.flush().await.unwrap();

        // Unlink, twice
        store.unlink(&fingerprint).await.unwrap();
        store.unlink(&fingerprint).await.unwrap();
        assert!(!store.exists(&fingerprint).await.unwrap());
    }

    #[tokio::test]
    async fn test_stat_reports_every_bucket() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = BucketBlobStore::new(temp_dir.path().to_path_buf(), 4).unwrap();

        for fingerprint in ["00aa", "01bb", "05cc"] {
            let mut writer = store.create_write_stream(fingerprint).await.unwrap();
            writer.write_all(&[7u8; 100]).await.unwrap();
            writer.shutdown().await.unwrap();
        }

        let stats = store.stat(None).await.unwrap();
        assert_eq!(stats.len(), 4);
        // 0x00 and 0x01 land in buckets 0 and 1, 0x05 wraps to bucket 1
        assert_eq!(stats[0].size, 100);
        assert_eq!(stats[1].size, 200);
        assert_eq!(stats[2].size, 0);
        assert_eq!(stats.iter().map(|stat| stat.size).sum::<u64>(), 300);
    }

    #[tokio::test]
    async fn test_abandoned_writer_leaves_no_blob() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = BucketBlobStore::new(temp_dir.path().to_path_buf(), 16).unwrap();

        let mut writer = store.create_write_stream("abcdef").await.unwrap();
        writer.write_all(b"partial").await.unwrap();
        drop(writer);

        assert!(!store.exists("abcdef").await.unwrap());
        let stats = store.stat(None).await.unwrap();
        assert_eq!(stats.iter().map(|stat| stat.entries).sum::<u64>(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_writers_replace_blob_whole() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = BucketBlobStore::new(temp_dir.path().to_path_buf(), 16).unwrap();
        let fingerprint = compute_fingerprint("shared item");

        let mut first = store.create_write_stream(&fingerprint).await.unwrap();
        let mut second = store.create_write_stream(&fingerprint).await.unwrap();
        first.write_all(b"AAAAAAAA").await.unwrap();
        second.write_all(b"BB").await.unwrap();
        second.shutdown().await.unwrap();
        first.shutdown().await.unwrap();

        let mut data = Vec::new();
        let mut reader = store.create_read_stream(&fingerprint).await.unwrap();
        reader.read_to_end(&mut data).await.unwrap();
        assert_eq!(data, b"AAAAAAAA");

        let stats = store.stat(Some(&fingerprint)).await.unwrap();
        assert_eq!(stats[0].entries, 1);
        assert_eq!(stats[0].size, 8);
    }

    #[tokio::test]
    async fn test_dropped_writer_keeps_other_writer_intact() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = BucketBlobStore::new(temp_dir.path().to_path_buf(), 16).unwrap();
        let fingerprint = compute_fingerprint("shared item");

        let mut first = store.create_write_stream(&fingerprint).await.unwrap();
        let mut second = store.create_write_stream(&fingerprint).await.unwrap();
        first.write_all(b"abandoned").await.unwrap();
        drop(first);

        second.write_all(b"kept").await.unwrap();
        second.shutdown().await.unwrap();

        let mut data = Vec::new();
        let mut reader = store.create_read_stream(&fingerprint).await.unwrap();
        reader.read_to_end(&mut data).await.unwrap();
        assert_eq!(data, b"kept");
    }

    #[tokio::test]
    async fn test_writer_rejects_writes_after_commit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = BucketBlobStore::new(temp_dir.path().to_path_buf(), 16).unwrap();

        let mut writer = store.create_write_stream("abcdef").await.unwrap();
        writer.write_all(b"synced").await.unwrap();
        writer.shutdown().await.unwrap();
        writer.shutdown().await.unwrap();

        assert!(writer.write_all(b"late").await.is_err());
        let (_, blob_path) = store.blob_path("abcdef").unwrap();
        assert_eq!(std::fs::read(blob_path).unwrap(), b"synced");
    }

    #[tokio::test]
    async fn test_stat_skips_in_flight_writes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = BucketBlobStore::new(temp_dir.path().to_path_buf(), 16).unwrap();

        let mut writer = store.create_write_stream("abcdef").await.unwrap();
        writer.write_all(&[1u8; 100]).await.unwrap();
        writer.flush().await.unwrap();

        let stats = store.stat(None).await.unwrap();
        assert_eq!(stats.iter().map(|stat| stat.size).sum::<u64>(), 0);
        assert_eq!(stats.iter().map(|stat| stat.entries).sum::<u64>(), 0);

        writer.shutdown().await.unwrap();
        let stats = store.stat(Some("abcdef")).await.unwrap();
        assert_eq!(stats[0].size, 100);
        assert_eq!(stats[0].entries, 1);
    }

    #[test]
    fn test_bucket_index() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = BucketBlobStore::new(temp_dir.path().to_path_buf(), 256).unwrap();

        assert_eq!(store.bucket_index("ff01").unwrap(), 255);
        assert_eq!(store.bucket_index("0a").unwrap(), 10);
        // not hex: first raw byte
        assert_eq!(store.bucket_index("zz").unwrap(), b'z' as u16);

        assert!(store.bucket_index("").is_err());
        assert!(store.bucket_index("../etc").is_err());
        assert!(store.bucket_index("abcdef.3.tmp").is_err());
    }

    #[test]
    fn test_invalid_bucket_count() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = BucketBlobStore::new(temp_dir.path().to_path_buf(), 0);
        assert!(matches!(result, Err(EmbedError::Config(_))));
    }
}
