//! Embedstore Core - storage adapter binding item metadata and shard blobs
//!
//! An item is addressed by a caller-chosen content key:
//! - its record lives as a JSON file named after the key
//! - its shard bytes live in a blob store under a RIPEMD-160 fingerprint of the key
//! - deletes remove the blob before the record

pub mod adapter;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod operations;
pub mod paths;
pub mod storage;

pub use adapter::{EmbeddedStorage, StorageAdapter};
pub use config::{DEFAULT_BUCKET_COUNT, StorageConfig};
pub use error::{EmbedError, Result};
pub use fingerprint::{FINGERPRINT_LEN, compute_fingerprint};
pub use operations::{
    DeleteItemOperation, DeleteItemOperationResult, FingerprintSource, KeyStream,
    ListKeysOperation, MeasureSizeOperation, PutItemOperation, PutItemOperationRequest,
    PutItemOperationResult, ReadItemOperation, Shard, StoredItem, total_size,
};
pub use storage::{
    BlobReader, BlobStore, BlobWriter, BucketBlobStore, BucketStat, ItemRecord, MemoryBlobStore,
    MetadataStore,
};
