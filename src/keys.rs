/// Storage key canonicalization
///
/// Every stored blob is addressed by `media/<noteId>/<filename>`. The same
/// layout is used by all backends so a note's media can be removed by prefix.
use crate::error::{MediaError, MediaResult};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed logical root of every storage key
pub const MEDIA_ROOT: &str = "media";

/// Root used by the portable (export/import) form of a key
pub const PORTABLE_ROOT: &str = "attachments";

/// Filename prefix marking a derived thumbnail
pub const THUMB_PREFIX: &str = "thumb_";

/// Extension given to generated filenames
pub const DEFAULT_EXTENSION: &str = "jpg";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_SUFFIX_LEN: usize = 8;

static LAST_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Opaque path-like key identifying one stored blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey(String);

impl StorageKey {
    /// Parse and validate a `media/<noteId>/<filename>` key
    pub fn parse(raw: &str) -> MediaResult<Self> {
        let segments: Vec<&str> = raw.split('/').collect();
        match segments.as_slice() {
            [root, note_id, file_name] if *root == MEDIA_ROOT => {
                check_segment(note_id)?;
                check_segment(file_name)?;
                Ok(Self(raw.to_string()))
            }
            _ => Err(MediaError::InvalidKey(format!(
                "expected {}/<noteId>/<filename>, got '{}'",
                MEDIA_ROOT, raw
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, root first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    pub fn note_id(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or_default()
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn is_thumbnail(&self) -> bool {
        self.file_name().starts_with(THUMB_PREFIX)
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StorageKey {
    type Error = MediaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

impl std::str::FromStr for StorageKey {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Generate a collision-resistant identifier
///
/// Base36 milliseconds (strictly increasing within the process) followed by
/// a random base36 suffix.
pub fn make_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..RANDOM_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{}", to_base36(next_millis()), suffix)
}

/// Generated filename with the given extension
pub fn make_file_name(extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        make_id()
    } else {
        format!("{}.{}", make_id(), extension)
    }
}

/// Build the storage key for a file of a note
///
/// Whitespace in `filename` becomes `_`. Without a filename one is generated.
pub fn make_key(note_id: &str, filename: Option<&str>) -> MediaResult<StorageKey> {
    check_segment(note_id)?;
    let file_name = match filename {
        Some(name) => sanitize_file_name(name),
        None => make_file_name(DEFAULT_EXTENSION),
    };
    check_segment(&file_name)?;
    Ok(StorageKey(format!("{}/{}/{}", MEDIA_ROOT, note_id, file_name)))
}

/// Key of the thumbnail derived from `filename`
pub fn thumb_key(note_id: &str, filename: &str) -> MediaResult<StorageKey> {
    make_key(note_id, Some(&format!("{}{}", THUMB_PREFIX, filename)))
}

/// Directory holding every file of a note, used as the delete-prefix target
pub fn note_dir(note_id: &str) -> MediaResult<String> {
    check_segment(note_id)?;
    Ok(format!("{}/{}", MEDIA_ROOT, note_id))
}

/// Portable relative form of a key, used inside exported bundles
pub fn to_portable(key: &StorageKey) -> String {
    let rest = &key.as_str()[MEDIA_ROOT.len()..];
    format!("{}{}", PORTABLE_ROOT, rest)
}

/// Inverse of [`to_portable`]
pub fn from_portable(portable: &str) -> MediaResult<StorageKey> {
    let rest = portable
        .strip_prefix(PORTABLE_ROOT)
        .filter(|rest| rest.starts_with('/'))
        .ok_or_else(|| {
            MediaError::InvalidKey(format!(
                "portable path must start with {}/, got '{}'",
                PORTABLE_ROOT, portable
            ))
        })?;
    StorageKey::parse(&format!("{}{}", MEDIA_ROOT, rest))
}

/// Split a key prefix into validated segments
pub fn prefix_segments(prefix: &str) -> MediaResult<Vec<&str>> {
    let segments: Vec<&str> = prefix.trim_end_matches('/').split('/').collect();
    if segments.first() != Some(&MEDIA_ROOT) {
        return Err(MediaError::InvalidKey(format!(
            "prefix must start with {}, got '{}'",
            MEDIA_ROOT, prefix
        )));
    }
    for segment in &segments {
        check_segment(segment)?;
    }
    Ok(segments)
}

fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out
}

fn check_segment(segment: &str) -> MediaResult<()> {
    let unsafe_segment = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if unsafe_segment {
        return Err(MediaError::InvalidKey(format!(
            "unsafe path segment '{}'",
            segment
        )));
    }
    Ok(())
}

fn next_millis() -> u64 {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    let mut previous = LAST_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now.max(previous + 1);
        match LAST_MILLIS.compare_exchange_weak(previous, next, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(actual) => previous = actual,
        }
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
