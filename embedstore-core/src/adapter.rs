use crate::config::StorageConfig;
use crate::operations::{
    DeleteItemOperation, KeyStream, ListKeysOperation, MeasureSizeOperation, PutItemOperation,
    PutItemOperationRequest, ReadItemOperation, StoredItem,
};
use crate::paths::{blob_mount_dir, ensure_directory, metadata_dir};
use crate::storage::{BlobStore, BucketBlobStore, ItemRecord, MetadataStore};
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Item storage contract consumed by the layers above
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Record plus an open shard stream
    async fn get(&self, key: &str) -> Result<StoredItem>;

    /// Record only
    async fn peek(&self, key: &str) -> Result<ItemRecord>;

    async fn put(&self, key: &str, record: ItemRecord) -> Result<()>;

    async fn del(&self, key: &str) -> Result<()>;

    /// Bytes used by all blobs, or by the given key's blob bucket
    async fn size(&self, key: Option<&str>) -> Result<u64>;

    async fn flush(&self) -> Result<()>;

    fn keys(&self) -> KeyStream;

    async fn open(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Storage adapter over a flat-file metadata directory and a blob store
///
/// Layout under the root: `db/` holds one record per key, `sharddata.kfs/`
/// is the mount point of the default bucket blob store.
pub struct EmbeddedStorage {
    root: PathBuf,
    open: AtomicBool,
    metadata_store: Arc<MetadataStore>,
    blob_store: Arc<dyn BlobStore>,
    read_item: ReadItemOperation,
    put_item: PutItemOperation,
    delete_item: DeleteItemOperation,
    measure_size: MeasureSizeOperation,
    list_keys: ListKeysOperation,
}

impl EmbeddedStorage {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(&StorageConfig::new(root.as_ref()))
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let root = ensure_directory(&config.root)?;
        let blob_store = BucketBlobStore::new(blob_mount_dir(&root), config.bucket_count)?;
        Self::with_blob_store(root, Arc::new(blob_store))
    }

    pub fn with_blob_store(root: impl AsRef<Path>, blob_store: Arc<dyn BlobStore>) -> Result<Self> {
        let root = ensure_directory(root.as_ref())?;
        let metadata_store = Arc::new(MetadataStore::new(metadata_dir(&root))?);

        tracing::info!("Opened embedded storage at {:?}", root);

        Ok(Self {
            read_item: ReadItemOperation::new(metadata_store.clone(), blob_store.clone()),
            put_item: PutItemOperation::new(metadata_store.clone()),
            delete_item: DeleteItemOperation::new(metadata_store.clone(), blob_store.clone()),
            measure_size: MeasureSizeOperation::new(metadata_store.clone(), blob_store.clone()),
            list_keys: ListKeysOperation::new(metadata_store.clone()),
            root,
            open: AtomicBool::new(true),
            metadata_store,
            blob_store,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_store(&self) -> &Arc<MetadataStore> {
        &self.metadata_store
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blob_store
    }
}

#[async_trait]
impl StorageAdapter for EmbeddedStorage {
    async fn get(&self, key: &str) -> Result<StoredItem> {
        self.read_item.run(key).await
    }

    async fn peek(&self, key: &str) -> Result<ItemRecord> {
        self.read_item.run_peek(key).await
    }

    async fn put(&self, key: &str, record: ItemRecord) -> Result<()> {
        self.put_item
            .run(PutItemOperationRequest {
                key: key.to_string(),
                record,
            })
            .await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.delete_item.run(key).await?;
        Ok(())
    }

    async fn size(&self, key: Option<&str>) -> Result<u64> {
        self.measure_size.run(key).await
    }

    async fn flush(&self) -> Result<()> {
        self.blob_store.flush().await
    }

    fn keys(&self) -> KeyStream {
        self.list_keys.run()
    }

    async fn open(&self) -> Result<()> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
