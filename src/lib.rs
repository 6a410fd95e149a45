/// notemedia - media storage for note attachments
///
/// Persists photos and audio attached to notes through whichever backend the
/// runtime supports (origin filesystem, object store, or native app storage),
/// transcoding images and deriving thumbnails on the way in.

pub mod capability;
pub mod config;
pub mod db;
pub mod error;
pub mod keys;
pub mod media_store;
pub mod note;

pub use capability::{BackendKind, CapabilitySnapshot};
pub use config::MediaConfig;
pub use error::{MediaError, MediaResult};
pub use keys::StorageKey;
pub use media_store::{MediaBackend, MediaBlob, MediaStore, PreviewHandle, SavedMedia};
pub use note::{Note, NotePreviews};
