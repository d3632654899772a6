use crate::{ItemRecord, MetadataStore, Result, compute_fingerprint, paths::validate_key};
use std::sync::Arc;

#[derive(Clone)]
pub struct PutItemOperation {
    metadata_store: Arc<MetadataStore>,
}

#[derive(Debug, Clone)]
pub struct PutItemOperationRequest {
    pub key: String,
    pub record: ItemRecord,
}

#[derive(Debug, Clone)]
pub struct PutItemOperationResult {
    pub fskey: String,
}

impl PutItemOperation {
    pub fn new(metadata_store: Arc<MetadataStore>) -> Self {
        Self { metadata_store }
    }

    /// Overwrite the record for a key. Shard data is dropped and `fskey` is
    /// always rederived from the key.
    pub async fn run(&self, request: PutItemOperationRequest) -> Result<PutItemOperationResult> {
        let PutItemOperationRequest { key, mut record } = request;
        validate_key(&key)?;

        let fskey = compute_fingerprint(&key);

        record.fields.remove("shard");
        record.fields.remove("fskey");
        record.shard = None;
        record.fskey = Some(fskey.clone());

        self.metadata_store.write_record(&key, &record).await?;

        Ok(PutItemOperationResult { fskey })
    }
}
