//! On-disk layout under an adapter root and the directory checks behind it.

use crate::error::{EmbedError, Result};
use std::path::{Path, PathBuf};

/// Metadata records, one file per key.
pub const METADATA_DIR: &str = "db";

/// Mount point of the bucket blob store.
pub const BLOB_MOUNT_DIR: &str = "sharddata.kfs";

pub fn metadata_dir(root: &Path) -> PathBuf {
    root.join(METADATA_DIR)
}

pub fn blob_mount_dir(root: &Path) -> PathBuf {
    root.join(BLOB_MOUNT_DIR)
}

/// Make sure `path` is a directory, creating it (and its parents) when absent.
///
/// A path that exists but resolves to anything other than a directory is a
/// configuration error.
pub fn ensure_directory(path: &Path) -> Result<PathBuf> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(path.to_path_buf()),
        Ok(_) => Err(EmbedError::Config(format!(
            "{} exists but is not a directory",
            path.display()
        ))),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            std::fs::create_dir_all(path).map_err(|error| {
                EmbedError::Config(format!(
                    "failed to create directory {}: {}",
                    path.display(),
                    error
                ))
            })?;
            Ok(path.to_path_buf())
        }
        Err(error) => Err(EmbedError::Config(format!(
            "failed to inspect {}: {}",
            path.display(),
            error
        ))),
    }
}

/// Reject keys that cannot safely be used as a single file name.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(EmbedError::InvalidKey("key cannot be empty".to_string()));
    }

    if key == "." || key == ".." {
        return Err(EmbedError::InvalidKey(format!(
            "key cannot be a dot segment: {}",
            key
        )));
    }

    if key.contains(['/', '\\', '\0']) {
        return Err(EmbedError::InvalidKey(format!(
            "key contains a path separator: {:?}",
            key
        )));
    }

    Ok(())
}
