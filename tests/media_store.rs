/// Media store scenarios run against every backend
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use notemedia::{
    capability::BackendKind,
    config::ImageConfig,
    keys::{self, StorageKey},
    media_store::{transcode, EncodedImage, MediaBackend, OriginFsBackend},
    CapabilitySnapshot, MediaBlob, MediaConfig, MediaError, MediaResult, MediaStore, Note,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn snapshot_for(kind: BackendKind) -> CapabilitySnapshot {
    match kind {
        BackendKind::Native => CapabilitySnapshot {
            filesystem_capable: false,
            native_runtime: true,
            browser_runtime: false,
        },
        BackendKind::OriginFs => CapabilitySnapshot {
            filesystem_capable: true,
            native_runtime: false,
            browser_runtime: true,
        },
        BackendKind::ObjectStore => CapabilitySnapshot {
            filesystem_capable: false,
            native_runtime: false,
            browser_runtime: true,
        },
    }
}

/// One store per backend, each in its own temp directory
async fn all_stores() -> Vec<(TempDir, MediaStore)> {
    let mut stores = Vec::new();
    for kind in [
        BackendKind::OriginFs,
        BackendKind::ObjectStore,
        BackendKind::Native,
    ] {
        let dir = tempdir().unwrap();
        let config = MediaConfig::for_directory(dir.path());
        let store = MediaStore::with_capabilities(&config, snapshot_for(kind))
            .await
            .unwrap();
        assert_eq!(store.backend_kind(), Some(kind));
        stores.push((dir, store));
    }
    stores
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x / 12 % 256) as u8, (y / 8 % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buf);
    img.write_to(&mut cursor, ImageFormat::Jpeg).unwrap();
    buf
}

#[tokio::test]
async fn test_large_jpeg_is_bounded_on_every_backend() {
    let source = jpeg(3000, 2000);

    for (_dir, store) in all_stores().await {
        let saved = store
            .save("n1", MediaBlob::new(source.clone(), Some("image/jpeg")), None)
            .await
            .unwrap();

        let thumb_path = saved.thumb_path.clone().expect("image saves get a thumbnail");
        assert!(saved.path.as_str().starts_with("media/n1/"));
        assert!(thumb_path.as_str().starts_with("media/n1/"));

        let full = image::load_from_memory(&store.read(&saved.path).await.unwrap()).unwrap();
        assert!(full.width() <= 1600 && full.height() <= 1066);
        assert_eq!((full.width(), full.height()), (1600, 1066));

        let thumb = image::load_from_memory(&store.read(&thumb_path).await.unwrap()).unwrap();
        assert!(thumb.width() <= 320 && thumb.height() <= 213);
    }
}

#[tokio::test]
async fn test_audio_round_trips_byte_identical() {
    let recording: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();

    for (_dir, store) in all_stores().await {
        let saved = store
            .save(
                "n1",
                MediaBlob::new(recording.clone(), Some("audio/webm")),
                Some("voice memo.webm"),
            )
            .await
            .unwrap();

        assert_eq!(saved.path.as_str(), "media/n1/voice_memo.webm");
        assert!(saved.thumb_path.is_none());
        assert_eq!(store.read(&saved.path).await.unwrap(), recording);
        assert_eq!(store.prepare_for_upload(&saved.path).await.unwrap(), recording);
    }
}

#[tokio::test]
async fn test_delete_all_for_note_removes_every_key() {
    for (_dir, store) in all_stores().await {
        let mut returned = Vec::new();
        for _ in 0..2 {
            let saved = store
                .save("n1", MediaBlob::new(jpeg(40, 30), Some("image/jpeg")), None)
                .await
                .unwrap();
            returned.extend(saved.keys().cloned());
        }
        let audio = store
            .save("n1", MediaBlob::new(b"rec".to_vec(), Some("audio/ogg")), None)
            .await
            .unwrap();
        returned.push(audio.path);

        let other = store
            .save("n2", MediaBlob::new(b"keep".to_vec(), Some("audio/ogg")), None)
            .await
            .unwrap();

        store.delete_all_for_note("n1").await.unwrap();

        for key in &returned {
            let err = store.read(key).await.unwrap_err();
            assert!(err.is_not_found(), "{} should be gone, got {}", key, err);
        }
        assert_eq!(store.read(&other.path).await.unwrap(), b"keep");

        // Nothing left to delete
        store.delete_all_for_note("n1").await.unwrap();
    }
}

#[tokio::test]
async fn test_delete_one_on_unwritten_key_succeeds() {
    for (_dir, store) in all_stores().await {
        let key = keys::make_key("n1", None).unwrap();
        store.delete_one(&key).await.unwrap();

        let saved = store
            .save("n1", MediaBlob::new(b"x".to_vec(), Some("audio/ogg")), None)
            .await
            .unwrap();
        store.delete_one(&saved.path).await.unwrap();
        store.delete_one(&saved.path).await.unwrap();
        assert!(matches!(
            store.read(&saved.path).await,
            Err(MediaError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn test_concurrent_saves_to_one_note_do_not_interfere() {
    for (_dir, store) in all_stores().await {
        let saves = (0..8u8).map(|i| {
            let store = store.clone();
            async move {
                let bytes = vec![i; 64];
                let saved = store
                    .save("n1", MediaBlob::new(bytes.clone(), Some("audio/webm")), None)
                    .await?;
                Ok::<_, MediaError>((saved, bytes))
            }
        });

        let mut handles = Vec::new();
        for save in saves {
            handles.push(tokio::spawn(save));
        }

        for handle in handles {
            let (saved, bytes) = handle.await.unwrap().unwrap();
            assert_eq!(store.read(&saved.path).await.unwrap(), bytes);
        }
    }
}

#[tokio::test]
async fn test_unsupported_runtime_fails_on_first_call() {
    let dir = tempdir().unwrap();
    let config = MediaConfig::for_directory(dir.path());
    let store = MediaStore::with_capabilities(
        &config,
        CapabilitySnapshot {
            filesystem_capable: false,
            native_runtime: false,
            browser_runtime: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(store.backend_kind(), None);
    let result = store
        .save("n1", MediaBlob::new(b"x".to_vec(), Some("audio/ogg")), None)
        .await;
    assert!(matches!(result, Err(MediaError::Unsupported(_))));
}

#[tokio::test]
async fn test_note_keys_survive_portable_round_trip() {
    let (_dir, store) = all_stores().await.remove(0);
    let saved = store
        .save("n1", MediaBlob::new(jpeg(20, 20), Some("image/jpeg")), Some("a b.jpg"))
        .await
        .unwrap();

    let note = Note {
        id: "n1".into(),
        attached_media: saved.keys().map(ToString::to_string).collect(),
    };

    for raw in &note.attached_media {
        let key = StorageKey::parse(raw).unwrap();
        let portable = keys::to_portable(&key);
        assert!(portable.starts_with("attachments/n1/"));
        assert_eq!(&keys::from_portable(&portable).unwrap(), &key);
    }
}

/// Origin backend that rejects writes of thumbnails
struct FailingThumbnails {
    inner: OriginFsBackend,
    deletes: AtomicUsize,
}

#[async_trait]
impl MediaBackend for FailingThumbnails {
    fn kind(&self) -> Option<BackendKind> {
        self.inner.kind()
    }

    async fn write(&self, key: &StorageKey, bytes: &[u8]) -> MediaResult<()> {
        if key.is_thumbnail() {
            return Err(MediaError::io(
                key.as_str(),
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        self.inner.write(key, bytes).await
    }

    async fn read(&self, key: &StorageKey) -> MediaResult<Vec<u8>> {
        self.inner.read(key).await
    }

    async fn delete(&self, key: &StorageKey) -> MediaResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> MediaResult<()> {
        self.inner.delete_prefix(prefix).await
    }
}

#[tokio::test]
async fn test_failed_thumbnail_write_fails_whole_save() {
    let dir = tempdir().unwrap();
    let backend = Arc::new(FailingThumbnails {
        inner: OriginFsBackend::new(dir.path().to_path_buf()),
        deletes: AtomicUsize::new(0),
    });
    let store = MediaStore::with_backend(backend.clone(), ImageConfig::default());

    let result = store
        .save("n1", MediaBlob::new(jpeg(50, 50), Some("image/jpeg")), Some("pic.jpg"))
        .await;

    match result {
        Err(MediaError::Io { key, .. }) => assert_eq!(key, "media/n1/thumb_pic.jpg"),
        other => panic!("expected IO failure, got {:?}", other),
    }

    // The primary was written first and then cleaned up
    assert_eq!(backend.deletes.load(Ordering::SeqCst), 1);
    let primary = StorageKey::parse("media/n1/pic.jpg").unwrap();
    assert!(store.read(&primary).await.unwrap_err().is_not_found());
}

#[test]
fn test_transcoder_is_usable_through_media_store() {
    let out: EncodedImage = transcode::thumbnail(&jpeg(640, 480), 320).unwrap();
    assert_eq!((out.width, out.height), (320, 240));
}
