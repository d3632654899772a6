use crate::error::{EmbedError, Result};
use crate::paths::{ensure_directory, validate_key};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Item metadata as stored on disk
///
/// Everything the caller hands in (contracts, audit trees, challenges, ...)
/// lives in `fields`. `shard` is always written as `null`; payload bytes go
/// to the blob store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fskey: Option<String>,
    #[serde(default)]
    pub shard: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ItemRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Flat-file record store: one JSON file per key, file name = key
pub struct MetadataStore {
    base_path: PathBuf,
}

impl MetadataStore {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        let base_path = ensure_directory(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Read and parse the record for `key`
    ///
    /// A missing or unreadable file is `NotFound`; a file that does not parse
    /// is `MalformedRecord`.
    pub async fn read_record(&self, key: &str) -> Result<ItemRecord> {
        let path = self.record_path(key)?;

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(error) => {
                tracing::debug!("Failed to read record. key={} error={}", key, error);
                return Err(EmbedError::NotFound(key.to_string()));
            }
        };

        serde_json::from_slice(&data).map_err(|source| EmbedError::MalformedRecord {
            key: key.to_string(),
            source,
        })
    }

    /// Overwrite the record for `key`
    pub async fn write_record(&self, key: &str, record: &ItemRecord) -> Result<()> {
        let path = self.record_path(key)?;
        let data = serde_json::to_vec(record)?;
        fs::write(&path, data).await?;

        tracing::debug!("Stored record for key {}", key);
        Ok(())
    }

    /// Remove the record file for `key`
    pub async fn delete_record(&self, key: &str) -> Result<()> {
        let path = self.record_path(key)?;
        fs::remove_file(&path).await?;
        Ok(())
    }

    pub fn record_exists(&self, key: &str) -> bool {
        self.record_path(key)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn record_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }
}
