/// Media storage data models
use crate::keys::StorageKey;
use serde::{Deserialize, Serialize};

/// Incoming media to be saved
#[derive(Debug, Clone)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    /// Declared MIME type, if the caller knows one
    pub mime_type: Option<String>,
}

impl MediaBlob {
    pub fn new(bytes: Vec<u8>, mime_type: Option<&str>) -> Self {
        Self {
            bytes,
            mime_type: mime_type
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from),
        }
    }

    /// Images and blobs of unknown type go through the image pipeline
    pub fn is_image_candidate(&self) -> bool {
        match &self.mime_type {
            Some(mime) => mime.to_ascii_lowercase().starts_with("image/"),
            None => true,
        }
    }

    /// File extension matching the declared MIME type
    pub fn extension(&self) -> &'static str {
        let mime = self
            .mime_type
            .as_deref()
            .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase());

        match mime.as_deref() {
            Some("image/jpeg") | Some("image/jpg") => "jpg",
            Some("image/png") => "png",
            Some("image/gif") => "gif",
            Some("image/webp") => "webp",
            Some("audio/webm") | Some("video/webm") => "webm",
            Some("audio/ogg") => "ogg",
            Some("audio/mpeg") => "mp3",
            Some("audio/mp4") | Some("audio/m4a") | Some("audio/x-m4a") => "m4a",
            Some("audio/wav") | Some("audio/x-wav") => "wav",
            Some("video/mp4") => "mp4",
            _ => "bin",
        }
    }
}

/// Keys produced by a successful save
///
/// The caller appends these to the note's `attachedMedia`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMedia {
    pub path: StorageKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_path: Option<StorageKey>,
}

impl SavedMedia {
    /// All keys, primary first
    pub fn keys(&self) -> impl Iterator<Item = &StorageKey> {
        std::iter::once(&self.path).chain(self.thumb_path.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_candidate_policy() {
        assert!(MediaBlob::new(vec![], Some("image/png")).is_image_candidate());
        assert!(MediaBlob::new(vec![], Some("IMAGE/JPEG")).is_image_candidate());
        assert!(MediaBlob::new(vec![], None).is_image_candidate());
        assert!(MediaBlob::new(vec![], Some("  ")).is_image_candidate());
        assert!(!MediaBlob::new(vec![], Some("audio/webm")).is_image_candidate());
    }

    #[test]
    fn test_extension_from_mime() {
        assert_eq!(MediaBlob::new(vec![], Some("audio/webm;codecs=opus")).extension(), "webm");
        assert_eq!(MediaBlob::new(vec![], Some("image/png")).extension(), "png");
        assert_eq!(MediaBlob::new(vec![], Some("application/pdf")).extension(), "bin");
        assert_eq!(MediaBlob::new(vec![], None).extension(), "bin");
    }

    #[test]
    fn test_saved_media_json_shape() {
        let saved = SavedMedia {
            path: StorageKey::parse("media/n1/a.jpg").unwrap(),
            thumb_path: None,
        };
        assert_eq!(
            serde_json::to_string(&saved).unwrap(),
            r#"{"path":"media/n1/a.jpg"}"#
        );
        assert_eq!(saved.keys().count(), 1);
    }
}
