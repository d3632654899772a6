use crate::{EmbedError, MetadataStore, Result};
use futures_util::stream::{self, Stream, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::fs::ReadDir;

/// Single-pass sequence of content keys
pub type KeyStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Clone)]
pub struct ListKeysOperation {
    metadata_store: Arc<MetadataStore>,
}

enum ListState {
    Pending(PathBuf),
    Reading(ReadDir),
    Done,
}

impl ListKeysOperation {
    pub fn new(metadata_store: Arc<MetadataStore>) -> Self {
        Self { metadata_store }
    }

    /// Build a lazy listing of the metadata directory.
    ///
    /// Nothing is read until the stream is first polled. Every file yields one
    /// item; a name that is not valid UTF-8 yields `InvalidKey` and listing
    /// goes on. A listing failure is yielded as an error item and ends the
    /// stream. Once ended the stream keeps returning `None`.
    pub fn run(&self) -> KeyStream {
        let state = ListState::Pending(self.metadata_store.base_path().to_path_buf());
        Box::pin(stream::unfold(state, |state| async move {
            let mut entries = match state {
                ListState::Pending(dir) => match tokio::fs::read_dir(&dir).await {
                    Ok(entries) => entries,
                    Err(error) => return Some((Err(EmbedError::Io(error)), ListState::Done)),
                },
                ListState::Reading(entries) => entries,
                ListState::Done => return None,
            };

            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let item = entry.file_name().into_string().map_err(|name| {
                        tracing::warn!("Metadata entry {:?} is not valid UTF-8", name);
                        EmbedError::InvalidKey(name.to_string_lossy().into_owned())
                    });
                    Some((item, ListState::Reading(entries)))
                }
                Ok(None) => None,
                Err(error) => Some((Err(EmbedError::Io(error)), ListState::Done)),
            }
        })
        .fuse())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    #[tokio::test]
    async fn test_non_utf8_entry_is_an_error_item() {
        let temp_dir = tempfile::tempdir().unwrap();
        let metadata_store = Arc::new(MetadataStore::new(temp_dir.path().to_path_buf()).unwrap());
        std::fs::write(temp_dir.path().join("plain-key"), b"{}").unwrap();
        std::fs::write(temp_dir.path().join(OsStr::from_bytes(b"bad-\xff")), b"{}").unwrap();

        let items: Vec<_> = ListKeysOperation::new(metadata_store).run().collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items.iter().filter(|item| item.is_ok()).count(), 1);
        assert!(
            items
                .iter()
                .any(|item| matches!(item, Err(EmbedError::InvalidKey(_))))
        );
    }
}
