//! Image decoding helpers.
//!
//! Background images reach the renderer as raw bytes or `data:` URLs and are
//! always embedded back into the scene as base64 `data:` URLs, so the
//! rasterizer never resolves external references on its own.

use base64::Engine;
use percent_encoding::percent_decode_str;

use crate::error::{RenderError, RenderResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// GIF (first frame only).
    Gif,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        match mime.to_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/gif" => Self::Gif,
            "image/webp" => Self::WebP,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }
        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }
        Self::Unknown
    }

    /// Canonical MIME type, if known.
    #[must_use]
    pub fn mime(self) -> Option<&'static str> {
        match self {
            Self::Png => Some("image/png"),
            Self::Jpeg => Some("image/jpeg"),
            Self::Gif => Some("image/gif"),
            Self::WebP => Some("image/webp"),
            Self::Unknown => None,
        }
    }
}

/// Raw image bytes with their declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Declared MIME type.
    pub mime: String,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

/// Dimensions and format of a decodable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Detected format.
    pub format: ImageFormat,
}

/// Decode an image far enough to learn its size.
///
/// # Errors
///
/// Returns an error if the bytes are not a decodable image.
pub fn probe_image(data: &[u8]) -> RenderResult<ImageInfo> {
    let format = ImageFormat::from_magic_bytes(data);
    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))?;
    Ok(ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
    })
}

/// Split a data URI into its MIME type and payload bytes.
///
/// Supports both `data:image/png;base64,...` and percent-encoded payloads.
///
/// # Errors
///
/// Returns an error if the data URI is malformed.
pub fn decode_data_uri(uri: &str) -> RenderResult<EncodedImage> {
    let uri_data = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::Resource("Not a data URI".to_string()))?;

    let (metadata, encoded_data) = uri_data
        .split_once(',')
        .ok_or_else(|| RenderError::Resource("Invalid data URI: missing comma".to_string()))?;

    let mut parts = metadata.split(';');
    let mime = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let is_base64 = parts.any(|p| p.eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        base64::engine::general_purpose::STANDARD
            .decode(encoded_data.trim())
            .map_err(|e| RenderError::Resource(format!("Failed to decode base64: {e}")))?
    } else {
        percent_decode_str(encoded_data).collect()
    };

    Ok(EncodedImage { mime, bytes })
}

/// Encode bytes as a base64 data URI.
///
/// The MIME type is taken from the magic bytes when recognizable, otherwise
/// from `fallback_mime`.
#[must_use]
pub fn to_data_uri(fallback_mime: &str, bytes: &[u8]) -> String {
    let mime = ImageFormat::from_magic_bytes(bytes)
        .mime()
        .unwrap_or(fallback_mime);
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).expect("encode");
        buf.into_inner()
    }

    #[test]
    fn magic_bytes_detection() {
        assert_eq!(ImageFormat::from_magic_bytes(&tiny_png()), ImageFormat::Png);
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            ImageFormat::Jpeg
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), ImageFormat::Gif);
        assert_eq!(ImageFormat::from_magic_bytes(b"ab"), ImageFormat::Unknown);
    }

    #[test]
    fn probe_reads_dimensions() {
        let info = probe_image(&tiny_png()).expect("probe");
        assert_eq!((info.width, info.height), (3, 2));
        assert_eq!(info.format, ImageFormat::Png);
        assert!(probe_image(b"not an image").is_err());
    }

    #[test]
    fn data_uri_round_trip() {
        let png = tiny_png();
        let uri = to_data_uri("application/octet-stream", &png);
        assert!(uri.starts_with("data:image/png;base64,"));

        let decoded = decode_data_uri(&uri).expect("decode");
        assert_eq!(decoded.mime, "image/png");
        assert_eq!(decoded.bytes, png);
    }

    #[test]
    fn percent_encoded_data_uri() {
        let decoded = decode_data_uri("data:image/svg+xml,%3Csvg%2F%3E").expect("decode");
        assert_eq!(decoded.mime, "image/svg+xml");
        assert_eq!(decoded.bytes, b"<svg/>");
    }

    #[test]
    fn malformed_data_uris() {
        assert!(decode_data_uri("https://example.com/a.png").is_err());
        assert!(decode_data_uri("data:image/png;base64").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }
}
