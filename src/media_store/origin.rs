/// Origin-scoped filesystem backend
use crate::{
    capability::BackendKind,
    error::{MediaError, MediaResult},
    keys::{prefix_segments, StorageKey},
    media_store::MediaBackend,
};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

/// Origin filesystem backend
///
/// Mirrors the key hierarchy as directories under the origin root:
/// `media/n1/a.jpg` -> `{root}/media/n1/a.jpg`. The only backend with a
/// native recursive delete.
#[derive(Clone)]
pub struct OriginFsBackend {
    root: PathBuf,
}

impl OriginFsBackend {
    /// Create a new origin filesystem backend
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn key_path(&self, key: &StorageKey) -> PathBuf {
        key.segments()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Open the directory chain for a key, creating missing segments
    async fn ensure_parent_dirs(&self, key: &StorageKey) -> MediaResult<PathBuf> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::io(key.as_str(), e))?;
        }
        Ok(path)
    }
}

#[async_trait]
impl MediaBackend for OriginFsBackend {
    fn kind(&self) -> Option<BackendKind> {
        Some(BackendKind::OriginFs)
    }

    async fn write(&self, key: &StorageKey, bytes: &[u8]) -> MediaResult<()> {
        let path = self.ensure_parent_dirs(key).await?;

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| MediaError::io(key.as_str(), e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| MediaError::io(key.as_str(), e))?;
        file.flush()
            .await
            .map_err(|e| MediaError::io(key.as_str(), e))?;

        debug!(key = %key, size = bytes.len(), "Wrote origin file");
        Ok(())
    }

    async fn read(&self, key: &StorageKey) -> MediaResult<Vec<u8>> {
        let path = self.key_path(key);

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(MediaError::NotFound(key.to_string()))
            }
            Err(e) => Err(MediaError::io(key.as_str(), e)),
        }
    }

    async fn delete(&self, key: &StorageKey) -> MediaResult<()> {
        let path = self.key_path(key);

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, "Deleted origin file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::io(key.as_str(), e)),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> MediaResult<()> {
        let path = prefix_segments(prefix)?
            .into_iter()
            .fold(self.root.clone(), |path, segment| path.join(segment));

        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!(prefix, "Removed origin directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::io(prefix, e)),
        }
    }
}
