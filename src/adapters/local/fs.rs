use crate::error::StorageError;
use crate::ports::storage::{ByteStream, MediaStore, StoredMedia};
use async_trait::async_trait;
use futures::TryStreamExt;
use regex::Regex;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tokio::io::{AsyncWriteExt, BufWriter};

const MAX_NAME_LEN: usize = 96;

/// Media store rooted at a local directory. The directory is created on the
/// first save.
#[derive(Clone, Debug)]
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn save(
        &self,
        mut stream: ByteStream<'_>,
        file_name: &str,
    ) -> Result<StoredMedia, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let key = storage_key(file_name);
        let path = self.resolve(&key)?;

        // Dropped (and unlinked) with this future if the upload is cancelled.
        let scratch = tempfile::Builder::new()
            .prefix(".upload-")
            .suffix(".part")
            .tempfile_in(&self.root)?;

        let mut file = BufWriter::new(tokio::fs::File::from_std(scratch.reopen()?));
        let mut written: u64 = 0;
        while let Some(chunk) = stream.try_next().await.map_err(StorageError::Interrupted)? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.into_inner().sync_all().await?;

        scratch.persist(&path).map_err(|e| e.error)?;
        tracing::debug!(path = %path.display(), bytes = written, "stored media");

        Ok(StoredMedia {
            path,
            bytes: written,
        })
    }

    async fn remove(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed media"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove media"),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !key_is_valid(Path::new(key)) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"))
}

/// Reduce a client supplied file name to something safe to keep on disk.
pub fn sanitize_file_name(file_name: &str) -> String {
    // Some clients send the full local path.
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = unsafe_chars().replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');

    // Keep the extension when truncating so the served content type survives.
    let cleaned = if cleaned.len() > MAX_NAME_LEN {
        match cleaned.rfind('.') {
            Some(dot) if cleaned.len() - dot <= 16 => {
                let ext = &cleaned[dot..];
                format!("{}{}", &cleaned[..MAX_NAME_LEN - ext.len()], ext)
            }
            _ => cleaned[..MAX_NAME_LEN].to_string(),
        }
    } else {
        cleaned.to_string()
    };

    if cleaned.is_empty() {
        String::from("upload")
    } else {
        cleaned
    }
}

/// Collision resistant key for a new upload.
pub fn storage_key(file_name: &str) -> String {
    format!("{}-{}", uuid::Uuid::new_v4().simple(), sanitize_file_name(file_name))
}

/// A key must be a single plain file name.
fn key_is_valid(key: &Path) -> bool {
    let mut components = key.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use futures::StreamExt;
    use std::fs;
    use tempfile::tempdir;

    fn byte_stream(chunks: Vec<Result<&'static str, &'static str>>) -> ByteStream<'static> {
        stream::iter(chunks)
            .map(|chunk| chunk.map(Bytes::from).map_err(axum::BoxError::from))
            .boxed()
    }

    fn visible_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_save_writes_stream_and_creates_directory() {
        let temp_dir = tempdir().unwrap();
        let store = FsMediaStore::new(temp_dir.path().join("data"));

        let stored = store
            .save(byte_stream(vec![Ok("Hello, "), Ok("world!")]), "clip.avi")
            .await
            .unwrap();
        let path = stored.path;

        assert_eq!(path.parent().unwrap(), temp_dir.path().join("data"));
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("-clip.avi"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "Hello, world!");
        assert_eq!(stored.bytes, 13);
    }

    #[tokio::test]
    async fn test_same_upload_name_does_not_overwrite() {
        let temp_dir = tempdir().unwrap();
        let store = FsMediaStore::new(temp_dir.path());

        let first = store.save(byte_stream(vec![Ok("one")]), "a.jpg").await.unwrap().path;
        let second = store.save(byte_stream(vec![Ok("two")]), "a.jpg").await.unwrap().path;

        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(first).unwrap(), "one");
        assert_eq!(fs::read_to_string(second).unwrap(), "two");
    }

    #[tokio::test]
    async fn test_interrupted_stream_leaves_nothing_behind() {
        let temp_dir = tempdir().unwrap();
        let store = FsMediaStore::new(temp_dir.path());

        let result = store
            .save(byte_stream(vec![Ok("partial"), Err("connection reset")]), "clip.avi")
            .await;

        assert!(matches!(result, Err(StorageError::Interrupted(_))));
        assert!(visible_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_save_leaves_nothing_behind() {
        let temp_dir = tempdir().unwrap();
        let store = FsMediaStore::new(temp_dir.path());

        let never_ends = stream::iter(vec![Ok::<_, axum::BoxError>(Bytes::from("partial"))])
            .chain(stream::pending())
            .boxed();
        let save = store.save(never_ends, "clip.avi");
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(50), save).await;

        assert!(timed_out.is_err());
        assert!(visible_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_not_an_error() {
        let temp_dir = tempdir().unwrap();
        let store = FsMediaStore::new(temp_dir.path());
        let path = store.save(byte_stream(vec![Ok("x")]), "a.jpg").await.unwrap().path;

        store.remove(&path).await;
        store.remove(&path).await;

        assert!(!path.exists());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = FsMediaStore::new("data");
        assert!(store.resolve("clip.mp4").is_ok());
        assert!(matches!(
            store.resolve("../etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(store.resolve("dir1/dir2").is_err());
        assert!(store.resolve("/root_directory").is_err());
        assert!(store.resolve("..").is_err());
    }

    #[test]
    fn test_sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\cam\\front door.avi"), "front_door.avi");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name(".."), "upload");
    }

    #[test]
    fn test_sanitize_truncates_but_keeps_extension() {
        let long = format!("{}.jpg", "a".repeat(300));
        let cleaned = sanitize_file_name(&long);
        assert_eq!(cleaned.len(), MAX_NAME_LEN);
        assert!(cleaned.ends_with(".jpg"));
    }

    #[test]
    fn test_storage_key_is_a_single_component() {
        let key = storage_key("../clip.avi");
        assert!(key_is_valid(Path::new(&key)));
        assert!(key.ends_with("-clip.avi"));
    }
}
