/// Unified error types for notemedia
use thiserror::Error;

/// Main error type for media storage
#[derive(Error, Debug)]
pub enum MediaError {
    /// Image bytes could not be decoded
    #[error("Image decode failed: {0}")]
    DecodeFailure(String),

    /// Read target is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// The active runtime lacks a required storage primitive
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Filesystem call rejected
    #[error("IO error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Object-store call rejected
    #[error("Database error on {key}: {source}")]
    Database {
        key: String,
        #[source]
        source: sqlx::Error,
    },

    /// Payload could not be converted to or from its stored form
    #[error("Encoding error on {key}: {message}")]
    Encoding { key: String, message: String },

    /// Malformed storage key or unsafe path segment
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Configuration errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Wrap an I/O error with the key it was raised for
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        MediaError::Io {
            key: key.into(),
            source,
        }
    }

    /// Wrap a database error with the key it was raised for
    pub fn database(key: impl Into<String>, source: sqlx::Error) -> Self {
        MediaError::Database {
            key: key.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MediaError::NotFound(_))
    }

    pub fn is_decode_failure(&self) -> bool {
        matches!(self, MediaError::DecodeFailure(_))
    }
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;
