/// Revocable preview handles
use crate::keys::StorageKey;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

/// Transient handle over a stored blob for display
///
/// Owned by the caller. Released with [`PreviewHandle::revoke`] or when
/// dropped; the store keeps no record of outstanding handles.
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    key: StorageKey,
    mime_type: String,
    bytes: Vec<u8>,
}

impl PreviewHandle {
    pub fn new(key: StorageKey, bytes: Vec<u8>) -> Self {
        let mime_type = image::guess_format(&bytes)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());

        let handle = Self {
            id: Uuid::new_v4(),
            key,
            mime_type,
            bytes,
        };
        tracing::trace!(id = %handle.id, key = %handle.key, "Acquired preview handle");
        handle
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &StorageKey {
        &self.key
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Opaque URL identifying this handle while it is alive
    pub fn url(&self) -> String {
        format!("blob:notemedia/{}", self.id)
    }

    /// Self-contained `data:` URL of the previewed bytes
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// Release the handle now
    pub fn revoke(self) {
        drop(self);
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        tracing::trace!(id = %self.id, key = %self.key, "Released preview handle");
    }
}
