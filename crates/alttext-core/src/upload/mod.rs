//! Upload intake: data-URI parsing, validation, and recompression.
//!
//! ```text
//! data URI → DataUri::parse → base64 decode → magic bytes → size limit → Compressor → ImageInput
//! ```

mod compress;
mod validate;

pub use compress::Compressor;
pub use validate::{detect_format, UploadFormat};

use base64::Engine;

use crate::error::ImageError;

/// A parsed `data:image/<subtype>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    /// MIME type, e.g. "image/png"
    pub media_type: &'a str,
    /// Base64 payload (not yet decoded)
    pub data: &'a str,
}

impl<'a> DataUri<'a> {
    /// Parse an image data URI.
    ///
    /// Only the `image/<lowercase subtype>;base64` shape the upload page
    /// produces is accepted.
    pub fn parse(uri: &'a str) -> Result<Self, ImageError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUri("missing `data:` prefix".to_string()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::InvalidDataUri("missing `,` separator".to_string()))?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ImageError::InvalidDataUri("payload is not base64".to_string()))?;

        let subtype = media_type.strip_prefix("image/").ok_or_else(|| {
            ImageError::InvalidDataUri(format!("expected an image MIME type, got '{media_type}'"))
        })?;
        if subtype.is_empty() || !subtype.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(ImageError::InvalidDataUri(format!(
                "unsupported image subtype '{subtype}'"
            )));
        }

        Ok(Self { media_type, data })
    }

    /// Decode the base64 payload, ignoring embedded whitespace.
    pub fn decode(&self) -> Result<Vec<u8>, ImageError> {
        let cleaned: String = self.data.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD.decode(cleaned)?;
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(bytes)
    }
}

/// An image ready to send to vision providers.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Raw encoded image bytes
    pub bytes: Vec<u8>,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
    /// BLAKE3 hex digest of `bytes`, for log correlation
    pub content_hash: String,
}

impl ImageInput {
    /// Build from raw bytes after checking magic bytes and the size limit.
    ///
    /// The media type is taken from the detected format, not from whatever
    /// the client claimed.
    pub fn from_bytes(bytes: Vec<u8>, max_upload_mb: u64) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let max_bytes = max_upload_mb.saturating_mul(1024 * 1024);
        if bytes.len() as u64 > max_bytes {
            return Err(ImageError::TooLarge {
                size_kb: bytes.len() as u64 / 1024,
                max_kb: max_bytes / 1024,
            });
        }

        let format = detect_format(&bytes).ok_or(ImageError::UnrecognizedFormat)?;
        Ok(Self::new_unchecked(bytes, format.media_type()))
    }

    /// Parse, decode and validate an uploaded data URI.
    pub fn from_data_uri(uri: &str, max_upload_mb: u64) -> Result<Self, ImageError> {
        let parsed = DataUri::parse(uri.trim())?;
        let bytes = parsed.decode()?;
        let input = Self::from_bytes(bytes, max_upload_mb)?;
        if input.media_type != parsed.media_type {
            tracing::debug!(
                claimed = parsed.media_type,
                detected = %input.media_type,
                "Upload MIME type differs from detected format"
            );
        }
        Ok(input)
    }

    pub(crate) fn new_unchecked(bytes: Vec<u8>, media_type: &str) -> Self {
        let content_hash = blake3::hash(&bytes).to_hex().to_string();
        Self {
            bytes,
            media_type: media_type.to_string(),
            content_hash,
        }
    }

    /// Standard base64 encoding of the image bytes.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// Short hash prefix for log lines.
    pub fn short_hash(&self) -> &str {
        &self.content_hash[..12.min(self.content_hash.len())]
    }
}
