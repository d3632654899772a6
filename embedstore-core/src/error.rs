use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbedError>;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Malformed record for key {key}: {source}")]
    MalformedRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Blob store {operation} failed: {source}")]
    Backend {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EmbedError {
    pub fn backend(operation: &'static str, source: std::io::Error) -> Self {
        Self::Backend { operation, source }
    }

    /// Missing and unparsable records look the same to callers.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::MalformedRecord { .. })
    }
}
