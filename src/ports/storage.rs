use crate::error::StorageError;
use async_trait::async_trait;
use axum::BoxError;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::path::{Path, PathBuf};

/// Body of an upload as it arrives from the client.
pub type ByteStream<'a> = BoxStream<'a, Result<Bytes, BoxError>>;

/// A file written by [`MediaStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub path: PathBuf,
    pub bytes: u64,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Write the whole stream under a fresh key derived from `file_name`.
    /// The file is complete and visible once this returns.
    async fn save(&self, stream: ByteStream<'_>, file_name: &str)
        -> Result<StoredMedia, StorageError>;

    /// Delete a stored file. A missing file is not an error.
    async fn remove(&self, path: &Path);

    /// Path of `key` inside the store.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError>;
}
