/// Note boundary types
///
/// Notes are owned elsewhere; this crate only reads their id and the list of
/// attached media keys.
use crate::{
    error::MediaResult,
    keys::StorageKey,
    media_store::{MediaStore, PreviewHandle},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The parts of a note the media store depends on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub attached_media: Vec<String>,
}

impl Note {
    /// Parsed media keys, in attachment order
    pub fn media_keys(&self) -> impl Iterator<Item = MediaResult<StorageKey>> + '_ {
        self.attached_media.iter().map(|raw| StorageKey::parse(raw))
    }
}

/// Live previews bound to one note's media list
///
/// Call [`NotePreviews::sync`] whenever the note changes; handles for keys
/// that left the list are released, new keys are fetched. Everything still
/// held is released on drop.
#[derive(Debug, Default)]
pub struct NotePreviews {
    note_id: Option<String>,
    handles: Vec<PreviewHandle>,
}

impl NotePreviews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the held handles in line with `note.attached_media`
    ///
    /// On error the handles acquired so far stay held and are released by
    /// the next sync, [`NotePreviews::release_all`] or drop.
    pub async fn sync(&mut self, store: &MediaStore, note: &Note) -> MediaResult<()> {
        if self.note_id.as_deref() != Some(note.id.as_str()) {
            self.release_all();
            self.note_id = Some(note.id.clone());
        }

        let wanted: HashSet<&str> = note.attached_media.iter().map(String::as_str).collect();
        self.handles
            .retain(|handle| wanted.contains(handle.key().as_str()));

        for key in note.media_keys() {
            let key = key?;
            if self.get(&key).is_none() {
                let handle = store.preview(&key).await?;
                self.handles.push(handle);
            }
        }

        Ok(())
    }

    /// Handle for `key`, if held
    pub fn get(&self, key: &StorageKey) -> Option<&PreviewHandle> {
        self.handles.iter().find(|handle| handle.key() == key)
    }

    pub fn handles(&self) -> &[PreviewHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Release every held handle
    pub fn release_all(&mut self) {
        self.handles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ImageConfig,
        media_store::{MediaBlob, OriginFsBackend},
    };
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_note_json_shape() {
        let note: Note =
            serde_json::from_str(r#"{"id":"n1","attachedMedia":["media/n1/a.jpg"]}"#).unwrap();
        assert_eq!(note.id, "n1");
        assert_eq!(note.attached_media, vec!["media/n1/a.jpg"]);

        let bare: Note = serde_json::from_str(r#"{"id":"n2"}"#).unwrap();
        assert!(bare.attached_media.is_empty());
    }

    #[test]
    fn test_media_keys_reports_bad_entries() {
        let note = Note {
            id: "n1".into(),
            attached_media: vec!["media/n1/a.jpg".into(), "bogus".into()],
        };
        let parsed: Vec<_> = note.media_keys().collect();
        assert!(parsed[0].is_ok());
        assert!(parsed[1].is_err());
    }

    #[tokio::test]
    async fn test_previews_follow_media_list() {
        let dir = tempdir().unwrap();
        let store = MediaStore::with_backend(
            Arc::new(OriginFsBackend::new(dir.path().to_path_buf())),
            ImageConfig::default(),
        );

        let a = store
            .save("n1", MediaBlob::new(b"a".to_vec(), Some("audio/webm")), None)
            .await
            .unwrap();
        let b = store
            .save("n1", MediaBlob::new(b"b".to_vec(), Some("audio/webm")), None)
            .await
            .unwrap();

        let mut note = Note {
            id: "n1".into(),
            attached_media: vec![a.path.to_string(), b.path.to_string()],
        };

        let mut previews = NotePreviews::new();
        previews.sync(&store, &note).await.unwrap();
        assert_eq!(previews.len(), 2);
        let kept_id = previews.get(&b.path).unwrap().id();

        note.attached_media.remove(0);
        previews.sync(&store, &note).await.unwrap();
        assert_eq!(previews.len(), 1);
        assert!(previews.get(&a.path).is_none());
        assert_eq!(previews.get(&b.path).unwrap().id(), kept_id);

        previews.release_all();
        assert!(previews.is_empty());
    }

    #[tokio::test]
    async fn test_sync_error_keeps_acquired_handles_releasable() {
        let dir = tempdir().unwrap();
        let store = MediaStore::with_backend(
            Arc::new(OriginFsBackend::new(dir.path().to_path_buf())),
            ImageConfig::default(),
        );

        let a = store
            .save("n1", MediaBlob::new(b"a".to_vec(), Some("audio/webm")), None)
            .await
            .unwrap();
        let note = Note {
            id: "n1".into(),
            attached_media: vec![a.path.to_string(), "media/n1/missing.webm".into()],
        };

        let mut previews = NotePreviews::new();
        let err = previews.sync(&store, &note).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(previews.len(), 1);

        drop(previews);
    }

    #[tokio::test]
    async fn test_switching_notes_releases_previous_handles() {
        let dir = tempdir().unwrap();
        let store = MediaStore::with_backend(
            Arc::new(OriginFsBackend::new(dir.path().to_path_buf())),
            ImageConfig::default(),
        );

        let a = store
            .save("n1", MediaBlob::new(b"a".to_vec(), Some("audio/webm")), None)
            .await
            .unwrap();

        let mut previews = NotePreviews::new();
        previews
            .sync(
                &store,
                &Note {
                    id: "n1".into(),
                    attached_media: vec![a.path.to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(previews.len(), 1);

        previews
            .sync(
                &store,
                &Note {
                    id: "n2".into(),
                    attached_media: vec![],
                },
            )
            .await
            .unwrap();
        assert!(previews.is_empty());
    }
}
