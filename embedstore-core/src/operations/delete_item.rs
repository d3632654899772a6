use crate::{BlobStore, MetadataStore, Result, compute_fingerprint, paths::validate_key};
use std::sync::Arc;

#[derive(Clone)]
pub struct DeleteItemOperation {
    metadata_store: Arc<MetadataStore>,
    blob_store: Arc<dyn BlobStore>,
}

/// Where the fingerprint used for a delete came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintSource {
    /// `fskey` field of the stored record.
    Recorded,
    /// Record readable but without `fskey`; derived from the key.
    Derived,
    /// Record unreadable; the raw key was used.
    RawKey,
}

#[derive(Debug, Clone)]
pub struct DeleteItemOperationResult {
    pub fingerprint: String,
    pub fingerprint_source: FingerprintSource,
}

impl DeleteItemOperation {
    pub fn new(metadata_store: Arc<MetadataStore>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            metadata_store,
            blob_store,
        }
    }

    /// Remove the blob, then the record.
    ///
    /// The record is only touched once the blob is gone, so a failure at
    /// worst leaves a stale record that a retry can clean up.
    pub async fn run(&self, key: &str) -> Result<DeleteItemOperationResult> {
        validate_key(key)?;

        let (fingerprint, fingerprint_source) = match self.metadata_store.read_record(key).await {
            Ok(record) => match record.fskey {
                Some(fskey) => (fskey, FingerprintSource::Recorded),
                None => (compute_fingerprint(key), FingerprintSource::Derived),
            },
            Err(error) => {
                tracing::warn!(
                    "Record lookup failed before delete, using key as fingerprint. key={} error={}",
                    key,
                    error
                );
                (key.to_string(), FingerprintSource::RawKey)
            }
        };

        self.blob_store.unlink(&fingerprint).await?;
        tracing::debug!("Unlinked blob {} for key {}", fingerprint, key);

        self.metadata_store.delete_record(key).await?;
        tracing::debug!("Deleted record for key {}", key);

        Ok(DeleteItemOperationResult {
            fingerprint,
            fingerprint_source,
        })
    }
}
