use embedstore_core::{DEFAULT_BUCKET_COUNT, EmbedError, Result, StorageConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_bucket_count")]
    pub bucket_count: u16,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root: None,
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }
}

fn default_bucket_count() -> u16 {
    DEFAULT_BUCKET_COUNT
}

impl Config {
    /// Layer an optional config file under `EMBEDSTORE_*` environment variables
    /// (e.g. `EMBEDSTORE_STORAGE__ROOT`).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }

        let settings = builder
            .add_source(::config::Environment::with_prefix("EMBEDSTORE").separator("__"))
            .build()
            .map_err(|e| EmbedError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| EmbedError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Storage settings, with `root_override` taking precedence over the file
    pub fn storage_config(&self, root_override: Option<PathBuf>) -> Result<StorageConfig> {
        let root = root_override
            .or_else(|| self.storage.root.clone())
            .ok_or_else(|| {
                EmbedError::Config(
                    "storage root is required (--root, storage.root or EMBEDSTORE_STORAGE__ROOT)"
                        .to_string(),
                )
            })?;

        let config = StorageConfig::new(root).with_bucket_count(self.storage.bucket_count);
        config.validate()?;
        Ok(config)
    }
}
