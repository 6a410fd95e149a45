/// Media Store
///
/// Public entry point for note media: resolves the backend once, runs image
/// inputs through the transcoder and scopes every key to its note.
use crate::{
    capability::{self, BackendKind, CapabilitySnapshot},
    config::{ImageConfig, MediaConfig},
    error::{MediaError, MediaResult},
    keys::{self, StorageKey},
    media_store::{
        select_backend, transcode, EncodedImage, MediaBackend, MediaBlob, PreviewHandle,
        SavedMedia,
    },
    note::Note,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Main media store
#[derive(Clone)]
pub struct MediaStore {
    backend: Arc<dyn MediaBackend>,
    capabilities: Option<CapabilitySnapshot>,
    images: ImageConfig,
}

impl MediaStore {
    /// Open the store for the ambient runtime
    pub async fn open(config: &MediaConfig) -> MediaResult<Self> {
        let snapshot = capability::snapshot(config);
        Self::with_capabilities(config, snapshot).await
    }

    /// Open the store for an explicit capability snapshot
    pub async fn with_capabilities(
        config: &MediaConfig,
        snapshot: CapabilitySnapshot,
    ) -> MediaResult<Self> {
        config.validate()?;
        let backend = select_backend(&snapshot, config).await?;
        Ok(Self {
            backend,
            capabilities: Some(snapshot),
            images: config.images.clone(),
        })
    }

    /// Wrap an already constructed backend
    pub fn with_backend(backend: Arc<dyn MediaBackend>, images: ImageConfig) -> Self {
        Self {
            backend,
            capabilities: None,
            images,
        }
    }

    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.kind()
    }

    pub fn capabilities(&self) -> Option<CapabilitySnapshot> {
        self.capabilities
    }

    /// Save a blob for a note and return the keys to record on it
    ///
    /// Images (and blobs without a declared type) are compressed and get a
    /// thumbnail; anything that fails to decode is stored as-is. Keys are
    /// only returned once every write has succeeded.
    pub async fn save(
        &self,
        note_id: &str,
        blob: MediaBlob,
        suggested_name: Option<&str>,
    ) -> MediaResult<SavedMedia> {
        keys::note_dir(note_id)?;

        if blob.is_image_candidate() {
            match self.transcode(&blob.bytes).await {
                Ok((full, thumb)) => {
                    return self.write_image(note_id, suggested_name, full, thumb).await;
                }
                Err(e) if e.is_decode_failure() => {
                    warn!(note_id, error = %e, "Image decode failed, storing original bytes");
                }
                Err(MediaError::Encoding { message, .. }) => {
                    return Err(MediaError::Encoding {
                        key: keys::note_dir(note_id)?,
                        message,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        self.write_raw(note_id, suggested_name, &blob).await
    }

    /// Read the bytes stored at `key`
    pub async fn read(&self, key: &StorageKey) -> MediaResult<Vec<u8>> {
        self.backend.read(key).await
    }

    /// Bytes handed to an upload collaborator
    pub async fn prepare_for_upload(&self, key: &StorageKey) -> MediaResult<Vec<u8>> {
        self.read(key).await
    }

    /// Acquire a preview handle; the caller releases it
    pub async fn preview(&self, key: &StorageKey) -> MediaResult<PreviewHandle> {
        let bytes = self.read(key).await?;
        Ok(PreviewHandle::new(key.clone(), bytes))
    }

    /// Delete one stored blob. Deleting an absent key succeeds.
    pub async fn delete_one(&self, key: &StorageKey) -> MediaResult<()> {
        self.backend.delete(key).await?;
        debug!(key = %key, "Deleted media");
        Ok(())
    }

    /// Delete every blob stored for a note
    pub async fn delete_all_for_note(&self, note_id: &str) -> MediaResult<()> {
        let prefix = keys::note_dir(note_id)?;
        self.backend.delete_prefix(&prefix).await?;
        info!(note_id, "Deleted all media for note");
        Ok(())
    }

    /// Delete every blob stored for `note`
    pub async fn delete_note_media(&self, note: &Note) -> MediaResult<()> {
        self.delete_all_for_note(&note.id).await
    }

    /// Run compression and thumbnailing concurrently on the source bytes
    async fn transcode(&self, bytes: &[u8]) -> MediaResult<(EncodedImage, EncodedImage)> {
        let source: Arc<[u8]> = Arc::from(bytes);

        let full_source = Arc::clone(&source);
        let full_config = self.images.clone();
        let thumb_source = source;
        let thumb_config = self.images.clone();

        tokio::try_join!(
            run_blocking(move || transcode::compress_with(&full_source, &full_config)),
            run_blocking(move || transcode::thumbnail_with(&thumb_source, &thumb_config)),
        )
    }

    async fn write_image(
        &self,
        note_id: &str,
        suggested_name: Option<&str>,
        full: EncodedImage,
        thumb: EncodedImage,
    ) -> MediaResult<SavedMedia> {
        let path = keys::make_key(note_id, suggested_name)?;
        let thumb_path = keys::thumb_key(note_id, path.file_name())?;

        self.backend.write(&path, &full.bytes).await?;

        if let Err(e) = self.backend.write(&thumb_path, &thumb.bytes).await {
            if let Err(cleanup) = self.backend.delete(&path).await {
                warn!(key = %path, error = %cleanup, "Failed to remove image after thumbnail write failed");
            }
            return Err(e);
        }

        info!(
            key = %path,
            width = full.width,
            height = full.height,
            thumb_width = thumb.width,
            thumb_height = thumb.height,
            "Saved image"
        );

        Ok(SavedMedia {
            path,
            thumb_path: Some(thumb_path),
        })
    }

    async fn write_raw(
        &self,
        note_id: &str,
        suggested_name: Option<&str>,
        blob: &MediaBlob,
    ) -> MediaResult<SavedMedia> {
        let path = match suggested_name {
            Some(name) => keys::make_key(note_id, Some(name))?,
            None => keys::make_key(note_id, Some(&keys::make_file_name(blob.extension())))?,
        };

        self.backend.write(&path, &blob.bytes).await?;
        info!(key = %path, size = blob.bytes.len(), "Saved media");

        Ok(SavedMedia {
            path,
            thumb_path: None,
        })
    }
}

async fn run_blocking<T, F>(f: F) -> MediaResult<T>
where
    F: FnOnce() -> MediaResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MediaError::Internal(format!("Transcode task failed: {}", e)))?
}
