/// Media Storage System
///
/// Persists note attachments (photos, audio) through one of three
/// interchangeable backends chosen from runtime capabilities.

pub mod models;
pub mod native;
pub mod object_store;
pub mod origin;
pub mod preview;
pub mod store;
pub mod transcode;

pub use models::*;
pub use native::NativeFsBackend;
pub use object_store::ObjectStoreBackend;
pub use origin::OriginFsBackend;
pub use preview::PreviewHandle;
pub use store::MediaStore;
pub use transcode::EncodedImage;

use crate::{
    capability::{BackendKind, CapabilitySnapshot},
    config::MediaConfig,
    error::{MediaError, MediaResult},
    keys::StorageKey,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Media storage backend trait
///
/// Every adapter offers the same four operations. Keys are full
/// `media/<noteId>/<filename>` strings; prefixes are directory-like
/// (`media/<noteId>`).
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Which adapter this is
    fn kind(&self) -> Option<BackendKind>;

    /// Create or overwrite the blob at `key`
    async fn write(&self, key: &StorageKey, bytes: &[u8]) -> MediaResult<()>;

    /// Read the blob at `key`, `NotFound` if absent
    async fn read(&self, key: &StorageKey) -> MediaResult<Vec<u8>>;

    /// Remove the blob at `key`. Absent keys are not an error.
    async fn delete(&self, key: &StorageKey) -> MediaResult<()>;

    /// Remove every blob whose key lies under `prefix`
    async fn delete_prefix(&self, prefix: &str) -> MediaResult<()>;
}

/// Stand-in for a runtime with no usable storage
///
/// Construction succeeds so the configuration error surfaces on the
/// first storage call instead of at startup.
pub struct UnsupportedBackend {
    snapshot: CapabilitySnapshot,
}

impl UnsupportedBackend {
    pub fn new(snapshot: CapabilitySnapshot) -> Self {
        Self { snapshot }
    }

    fn error(&self) -> MediaError {
        MediaError::Unsupported(format!(
            "no storage backend for runtime (native: {}, browser: {})",
            self.snapshot.native_runtime, self.snapshot.browser_runtime
        ))
    }
}

#[async_trait]
impl MediaBackend for UnsupportedBackend {
    fn kind(&self) -> Option<BackendKind> {
        None
    }

    async fn write(&self, _key: &StorageKey, _bytes: &[u8]) -> MediaResult<()> {
        Err(self.error())
    }

    async fn read(&self, _key: &StorageKey) -> MediaResult<Vec<u8>> {
        Err(self.error())
    }

    async fn delete(&self, _key: &StorageKey) -> MediaResult<()> {
        Err(self.error())
    }

    async fn delete_prefix(&self, _prefix: &str) -> MediaResult<()> {
        Err(self.error())
    }
}

/// Build the single active backend for a capability snapshot
pub async fn select_backend(
    snapshot: &CapabilitySnapshot,
    config: &MediaConfig,
) -> MediaResult<Arc<dyn MediaBackend>> {
    let backend: Arc<dyn MediaBackend> = match snapshot.backend_kind() {
        Some(BackendKind::Native) => Arc::new(NativeFsBackend::new(
            config.storage.native_directory.clone(),
        )),
        Some(BackendKind::OriginFs) => Arc::new(OriginFsBackend::new(
            config.storage.origin_directory.clone(),
        )),
        Some(BackendKind::ObjectStore) => {
            Arc::new(ObjectStoreBackend::open(&config.storage.object_db).await?)
        }
        None => {
            tracing::warn!("No storage backend available for this runtime");
            Arc::new(UnsupportedBackend::new(*snapshot))
        }
    };

    if let Some(kind) = backend.kind() {
        tracing::info!("Selected {} media backend", kind);
    }

    Ok(backend)
}
