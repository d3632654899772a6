//! Storage modules for Embedstore
//!
//! Flat-file item metadata plus the blob stores that hold shard payloads.

pub mod blob_store;
pub mod bucket_store;
pub mod memory_store;
pub mod metadata_store;

pub use blob_store::{BlobReader, BlobStore, BlobWriter, BucketStat};
pub use bucket_store::BucketBlobStore;
pub use memory_store::MemoryBlobStore;
pub use metadata_store::{ItemRecord, MetadataStore};
