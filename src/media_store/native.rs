/// Native device filesystem backend
use crate::{
    capability::BackendKind,
    error::{MediaError, MediaResult},
    keys::{prefix_segments, StorageKey},
    media_store::MediaBackend,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Native filesystem backend
///
/// Files live in one app-private directory and hold base64 text, the form
/// the native write primitive accepts. Files are grouped by note:
/// `media/n1/a.jpg` -> `{dir}/n1/a.jpg`, so removing a note removes the
/// directory named after it.
#[derive(Clone)]
pub struct NativeFsBackend {
    directory: PathBuf,
}

impl NativeFsBackend {
    /// Create a new native backend rooted at the app-private directory
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Note-scoped location, without the media root segment
    fn file_path(&self, key: &StorageKey) -> PathBuf {
        self.directory.join(key.note_id()).join(key.file_name())
    }

    fn decode(key: &StorageKey, text: &str) -> MediaResult<Vec<u8>> {
        STANDARD
            .decode(text.trim())
            .map_err(|e| MediaError::Encoding {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    async fn read_text(path: &Path) -> std::io::Result<Option<String>> {
        match fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn remove_if_present(path: &Path) -> std::io::Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MediaBackend for NativeFsBackend {
    fn kind(&self) -> Option<BackendKind> {
        Some(BackendKind::Native)
    }

    async fn write(&self, key: &StorageKey, bytes: &[u8]) -> MediaResult<()> {
        let path = self.file_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::io(key.as_str(), e))?;
        }

        fs::write(&path, STANDARD.encode(bytes))
            .await
            .map_err(|e| MediaError::io(key.as_str(), e))?;

        debug!(key = %key, size = bytes.len(), "Wrote native file");
        Ok(())
    }

    async fn read(&self, key: &StorageKey) -> MediaResult<Vec<u8>> {
        let text = Self::read_text(&self.file_path(key))
            .await
            .map_err(|e| MediaError::io(key.as_str(), e))?;

        match text {
            Some(text) => Self::decode(key, &text),
            None => Err(MediaError::NotFound(key.to_string())),
        }
    }

    async fn delete(&self, key: &StorageKey) -> MediaResult<()> {
        Self::remove_if_present(&self.file_path(key))
            .await
            .map_err(|e| MediaError::io(key.as_str(), e))?;

        debug!(key = %key, "Deleted native file");
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> MediaResult<()> {
        let segments = prefix_segments(prefix)?;
        if segments.len() < 2 {
            return Err(MediaError::Unsupported(format!(
                "native storage only deletes whole notes, got prefix '{}'",
                prefix
            )));
        }

        let path = segments[1..]
            .iter()
            .fold(self.directory.clone(), |path, segment| path.join(segment));

        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!(prefix, "Removed native note directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::io(prefix, e)),
        }
    }
}
