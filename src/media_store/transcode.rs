/// Image transcoding: bounded resize, lossy re-encode, thumbnails
///
/// Pure byte-to-byte transforms with no knowledge of storage. Every call
/// decodes the source independently; thumbnails are never derived from a
/// compressed output.
use crate::{
    config::ImageConfig,
    error::{MediaError, MediaResult},
};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType};

/// Default bounding box for stored images
pub const DEFAULT_MAX_WIDTH: u32 = 1600;
pub const DEFAULT_MAX_HEIGHT: u32 = 1600;
pub const DEFAULT_QUALITY: f32 = 0.8;

/// Default thumbnail edge and quality
pub const THUMBNAIL_MAX_EDGE: u32 = 320;
pub const THUMBNAIL_QUALITY: f32 = 0.7;

/// A re-encoded image and its dimensions
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Dimensions after fitting `width`x`height` inside `max_width`x`max_height`
///
/// Uniform scale `min(max_w / w, max_h / h, 1)`, floored, at least 1px.
/// Never upscales.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let (w, h) = (u64::from(width), u64::from(height));
    let (max_w, max_h) = (u64::from(max_width), u64::from(max_height));

    // Compare max_w / w against max_h / h without floating point
    let (out_w, out_h) = if max_w * h <= max_h * w {
        (max_w, h * max_w / w)
    } else {
        (w * max_h / h, max_h)
    };

    (out_w.max(1) as u32, out_h.max(1) as u32)
}

/// Resize into the bounding box and re-encode as JPEG at `quality` (0..=1)
pub fn compress(
    bytes: &[u8],
    max_width: u32,
    max_height: u32,
    quality: f32,
) -> MediaResult<EncodedImage> {
    transcode(bytes, max_width, max_height, quality)
}

/// Square-bounded thumbnail at the default thumbnail quality
pub fn thumbnail(bytes: &[u8], max_edge: u32) -> MediaResult<EncodedImage> {
    thumbnail_with_quality(bytes, max_edge, THUMBNAIL_QUALITY)
}

pub fn thumbnail_with_quality(
    bytes: &[u8],
    max_edge: u32,
    quality: f32,
) -> MediaResult<EncodedImage> {
    transcode(bytes, max_edge, max_edge, quality)
}

/// Full-size output using configured settings
pub fn compress_with(bytes: &[u8], config: &ImageConfig) -> MediaResult<EncodedImage> {
    compress(bytes, config.max_width, config.max_height, config.quality)
}

/// Thumbnail output using configured settings
pub fn thumbnail_with(bytes: &[u8], config: &ImageConfig) -> MediaResult<EncodedImage> {
    thumbnail_with_quality(bytes, config.thumb_max_edge, config.thumb_quality)
}

fn transcode(
    bytes: &[u8],
    max_width: u32,
    max_height: u32,
    quality: f32,
) -> MediaResult<EncodedImage> {
    let source =
        image::load_from_memory(bytes).map_err(|e| MediaError::DecodeFailure(e.to_string()))?;

    let (width, height) = fit_within(source.width(), source.height(), max_width, max_height);
    let resized = if (width, height) == (source.width(), source.height()) {
        source
    } else {
        source.resize_exact(width, height, FilterType::Triangle)
    };

    // JPEG has no alpha channel
    let rgb = resized.to_rgb8();

    // Encoder failures carry no key; the caller knows where the output goes
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality)))
        .map_err(|e| MediaError::Encoding {
            key: String::new(),
            message: format!("Failed to encode image: {}", e),
        })?;

    Ok(EncodedImage {
        bytes: buf,
        width,
        height,
    })
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}
