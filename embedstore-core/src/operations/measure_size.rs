use crate::{BlobStore, BucketStat, MetadataStore, Result, compute_fingerprint, paths::validate_key};
use std::sync::Arc;

#[derive(Clone)]
pub struct MeasureSizeOperation {
    metadata_store: Arc<MetadataStore>,
    blob_store: Arc<dyn BlobStore>,
}

impl MeasureSizeOperation {
    pub fn new(metadata_store: Arc<MetadataStore>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            metadata_store,
            blob_store,
        }
    }

    /// Bytes used by the whole blob store, or by the bucket stats reported
    /// for one key's fingerprint.
    pub async fn run(&self, key: Option<&str>) -> Result<u64> {
        let stats = match key {
            Some(key) => {
                let fingerprint = self.resolve_fingerprint(key).await?;
                self.blob_store.stat(Some(&fingerprint)).await?
            }
            None => self.blob_store.stat(None).await?,
        };

        Ok(total_size(&stats))
    }

    async fn resolve_fingerprint(&self, key: &str) -> Result<String> {
        validate_key(key)?;

        let recorded = self
            .metadata_store
            .read_record(key)
            .await
            .ok()
            .and_then(|record| record.fskey);

        Ok(recorded.unwrap_or_else(|| compute_fingerprint(key)))
    }
}

/// Sum of the `size` field; every other stat field is dropped.
pub fn total_size(stats: &[BucketStat]) -> u64 {
    stats.iter().fold(0, |total, stat| total + stat.size)
}
