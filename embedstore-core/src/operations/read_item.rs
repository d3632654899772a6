use crate::{BlobReader, BlobStore, BlobWriter, ItemRecord, MetadataStore, Result};
use crate::{compute_fingerprint, paths::validate_key};
use std::fmt;
use std::sync::Arc;

/// Shard payload handle attached to an item by `get`
pub enum Shard {
    /// The blob exists; read it.
    Readable(BlobReader),
    /// No blob yet; whatever is written here becomes the blob.
    Writable(BlobWriter),
}

impl Shard {
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Readable(_))
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Writable(_))
    }
}

impl fmt::Debug for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Readable(_) => f.write_str("Shard::Readable"),
            Self::Writable(_) => f.write_str("Shard::Writable"),
        }
    }
}

/// An item record together with its open shard stream
#[derive(Debug)]
pub struct StoredItem {
    pub key: String,
    pub record: ItemRecord,
    pub shard: Shard,
}

#[derive(Clone)]
pub struct ReadItemOperation {
    metadata_store: Arc<MetadataStore>,
    blob_store: Arc<dyn BlobStore>,
}

impl ReadItemOperation {
    pub fn new(metadata_store: Arc<MetadataStore>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            metadata_store,
            blob_store,
        }
    }

    /// Load the record and open its shard: a read stream when the blob
    /// exists, a write stream at the derived fingerprint otherwise.
    ///
    /// A derived fingerprint is set on the returned record only; the file on
    /// disk is left for the next `put` to rewrite.
    pub async fn run(&self, key: &str) -> Result<StoredItem> {
        let mut record = self.run_peek(key).await?;

        let fingerprint = record
            .fskey
            .clone()
            .unwrap_or_else(|| compute_fingerprint(key));

        let shard = if self.blob_store.exists(&fingerprint).await? {
            let reader = self.blob_store.create_read_stream(&fingerprint).await?;
            record.fskey = Some(fingerprint);
            Shard::Readable(reader)
        } else {
            let fingerprint = compute_fingerprint(key);
            let writer = self.blob_store.create_write_stream(&fingerprint).await?;
            tracing::debug!(
                "No blob for key {}, opened write stream at {}",
                key,
                fingerprint
            );
            record.fskey = Some(fingerprint);
            Shard::Writable(writer)
        };

        Ok(StoredItem {
            key: key.to_string(),
            record,
            shard,
        })
    }

    /// Load the record without touching the blob store
    pub async fn run_peek(&self, key: &str) -> Result<ItemRecord> {
        validate_key(key)?;
        self.metadata_store.read_record(key).await
    }
}
