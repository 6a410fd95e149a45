/// Configuration management for notemedia
use crate::error::{MediaError, MediaResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub storage: StorageConfig,
    pub runtime: RuntimeConfig,
    pub images: ImageConfig,
    pub logging: LoggingConfig,
}

/// Storage locations for each backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    /// Root of the origin-scoped filesystem
    pub origin_directory: PathBuf,
    /// SQLite file holding the flat object table
    pub object_db: PathBuf,
    /// App-private directory used in native runtimes
    pub native_directory: PathBuf,
}

/// Runtime selection overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub mode: RuntimeMode,
    /// Treat the origin filesystem as unavailable even when it is
    pub disable_origin_fs: bool,
}

/// Which runtime class the process should consider itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Derive from the compile target
    Auto,
    Native,
    Browser,
    /// Neither runtime; every storage call fails
    None,
}

impl std::str::FromStr for RuntimeMode {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(RuntimeMode::Auto),
            "native" => Ok(RuntimeMode::Native),
            "browser" => Ok(RuntimeMode::Browser),
            "none" => Ok(RuntimeMode::None),
            other => Err(MediaError::Validation(format!(
                "Unknown runtime mode '{}'",
                other
            ))),
        }
    }
}

/// Image transcoding bounds and qualities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// Lossy encode quality in (0, 1]
    pub quality: f32,
    pub thumb_max_edge: u32,
    pub thumb_quality: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_width: 1600,
            max_height: 1600,
            quality: 0.8,
            thumb_max_edge: 320,
            thumb_quality: 0.7,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl MediaConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> MediaResult<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> MediaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_directory: PathBuf = var("NOTEMEDIA_DATA_DIRECTORY")
            .unwrap_or_else(|| "./data".to_string())
            .into();
        let origin_directory = var("NOTEMEDIA_ORIGIN_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_directory.join("origin"));
        let object_db = var("NOTEMEDIA_OBJECT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_directory.join("media.sqlite"));
        let native_directory = var("NOTEMEDIA_NATIVE_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_directory.join("native"));

        let mode = var("NOTEMEDIA_RUNTIME")
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(RuntimeMode::Auto);
        let disable_origin_fs = var("NOTEMEDIA_DISABLE_ORIGIN_FS")
            .map(|s| parse_flag(&s))
            .unwrap_or(false);

        let defaults = ImageConfig::default();
        let images = ImageConfig {
            max_width: parse_or("NOTEMEDIA_IMAGE_MAX_WIDTH", &var, defaults.max_width)?,
            max_height: parse_or("NOTEMEDIA_IMAGE_MAX_HEIGHT", &var, defaults.max_height)?,
            quality: parse_or("NOTEMEDIA_IMAGE_QUALITY", &var, defaults.quality)?,
            thumb_max_edge: parse_or("NOTEMEDIA_THUMB_MAX_EDGE", &var, defaults.thumb_max_edge)?,
            thumb_quality: parse_or("NOTEMEDIA_THUMB_QUALITY", &var, defaults.thumb_quality)?,
        };

        let level = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let config = MediaConfig {
            storage: StorageConfig {
                data_directory,
                origin_directory,
                object_db,
                native_directory,
            },
            runtime: RuntimeConfig {
                mode,
                disable_origin_fs,
            },
            images,
            logging: LoggingConfig { level },
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration with every backend rooted under `dir`
    pub fn for_directory(dir: &Path) -> Self {
        Self {
            storage: StorageConfig {
                data_directory: dir.to_path_buf(),
                origin_directory: dir.join("origin"),
                object_db: dir.join("media.sqlite"),
                native_directory: dir.join("native"),
            },
            runtime: RuntimeConfig {
                mode: RuntimeMode::Auto,
                disable_origin_fs: false,
            },
            images: ImageConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> MediaResult<()> {
        let images = &self.images;
        if images.max_width == 0 || images.max_height == 0 || images.thumb_max_edge == 0 {
            return Err(MediaError::Validation(
                "Image bounds must be greater than zero".to_string(),
            ));
        }

        for (name, quality) in [
            ("image quality", images.quality),
            ("thumbnail quality", images.thumb_quality),
        ] {
            if !(quality > 0.0 && quality <= 1.0) {
                return Err(MediaError::Validation(format!(
                    "{} must be in (0, 1], got {}",
                    name, quality
                )));
            }
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_or<T, F>(name: &str, var: &F, default: T) -> MediaResult<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| MediaError::Validation(format!("Invalid value for {}: '{}'", name, raw))),
        None => Ok(default),
    }
}
