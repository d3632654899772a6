use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BUCKET_COUNT: u16 = 256;
pub const MAX_BUCKET_COUNT: u16 = 256;

/// Settings for an [`EmbeddedStorage`](crate::EmbeddedStorage) instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: PathBuf,
    #[serde(default = "default_bucket_count")]
    pub bucket_count: u16,
}

fn default_bucket_count() -> u16 {
    DEFAULT_BUCKET_COUNT
}

impl StorageConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }

    pub fn with_bucket_count(mut self, bucket_count: u16) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(EmbedError::Config("storage root cannot be empty".to_string()));
        }

        validate_bucket_count(self.bucket_count)
    }
}

pub(crate) fn validate_bucket_count(bucket_count: u16) -> Result<()> {
    if bucket_count == 0 || bucket_count > MAX_BUCKET_COUNT {
        return Err(EmbedError::Config(format!(
            "bucket_count must be between 1 and {}, got {}",
            MAX_BUCKET_COUNT, bucket_count
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"root": "/var/lib/embedstore"}"#).unwrap();
        assert_eq!(config.root, PathBuf::from("/var/lib/embedstore"));
        assert_eq!(config.bucket_count, DEFAULT_BUCKET_COUNT);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_bucket_count() {
        let with_count = |count| StorageConfig::new("/tmp/x").with_bucket_count(count);
        assert!(with_count(0).validate().is_err());
        assert!(with_count(257).validate().is_err());
        assert!(with_count(1).validate().is_ok());
        assert!(StorageConfig::new("").validate().is_err());
    }
}
