//! Server-side recompression with the same limits as the upload page.
//!
//! Images within both the dimension and size limits pass through untouched.
//! Anything else is downscaled to fit `max_dimension` and re-encoded as JPEG,
//! stepping down the quality until it fits `max_size_kb`.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use super::ImageInput;
use crate::config::CompressionConfig;
use crate::error::ImageError;

/// Downscales and re-encodes oversized uploads.
pub struct Compressor {
    config: CompressionConfig,
    decode_timeout_ms: u64,
}

impl Compressor {
    /// Create a new compressor with the given settings.
    pub fn new(config: CompressionConfig, decode_timeout_ms: u64) -> Self {
        Self {
            config,
            decode_timeout_ms,
        }
    }

    fn max_bytes(&self) -> usize {
        usize::try_from(self.config.max_size_kb.saturating_mul(1024)).unwrap_or(usize::MAX)
    }

    /// Compress an image if it exceeds the configured limits.
    ///
    /// Formats the decoder can't read (e.g. HEIC) are passed through as-is;
    /// the vision providers accept them directly.
    pub async fn compress(&self, input: ImageInput) -> Result<ImageInput, ImageError> {
        if !self.config.enabled {
            return Ok(input);
        }

        let dimensions = image::ImageReader::new(Cursor::new(&input.bytes))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok());

        let Some((width, height)) = dimensions else {
            tracing::warn!(
                hash = input.short_hash(),
                media_type = %input.media_type,
                "Cannot read image dimensions, skipping compression"
            );
            return Ok(input);
        };

        let max_dim = self.config.max_dimension;
        if input.bytes.len() <= self.max_bytes() && width <= max_dim && height <= max_dim {
            return Ok(input);
        }

        let original_len = input.bytes.len();
        let config = self.config.clone();
        let timeout_duration = Duration::from_millis(self.decode_timeout_ms);
        let result = timeout(timeout_duration, async move {
            tokio::task::spawn_blocking(move || Self::compress_sync(&input.bytes, &config)).await
        })
        .await;

        let bytes = match result {
            Ok(Ok(Ok(bytes))) => bytes,
            Ok(Ok(Err(e))) => return Err(e),
            Ok(Err(e)) => return Err(ImageError::Compression(format!("Task join error: {e}"))),
            Err(_) => {
                return Err(ImageError::Timeout {
                    timeout_ms: self.decode_timeout_ms,
                })
            }
        };

        tracing::debug!(
            "Compressed {width}x{height} image from {}KB to {}KB",
            original_len / 1024,
            bytes.len() / 1024
        );

        Ok(ImageInput::new_unchecked(bytes, "image/jpeg"))
    }

    /// Synchronous decode/resize/encode (runs in spawn_blocking).
    fn compress_sync(bytes: &[u8], config: &CompressionConfig) -> Result<Vec<u8>, ImageError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| ImageError::Compression(format!("Cannot decode image: {e}")))?;

        let image = Self::fit_within(image, config.max_dimension);
        let rgb = image.to_rgb8();
        let max_bytes =
            usize::try_from(config.max_size_kb.saturating_mul(1024)).unwrap_or(usize::MAX);

        let mut smallest: Option<Vec<u8>> = None;
        for &quality in &config.quality_steps {
            let mut buffer = Vec::new();
            JpegEncoder::new_with_quality(&mut buffer, quality)
                .encode_image(&rgb)
                .map_err(|e| ImageError::Compression(format!("JPEG encode failed: {e}")))?;

            if buffer.len() <= max_bytes {
                return Ok(buffer);
            }
            if smallest.as_ref().map_or(true, |s| buffer.len() < s.len()) {
                smallest = Some(buffer);
            }
        }

        // Nothing met the target; keep the smallest attempt.
        smallest.ok_or_else(|| ImageError::Compression("no quality steps configured".to_string()))
    }

    /// Downscale so the longest edge is at most `max_dim`, keeping aspect ratio.
    fn fit_within(image: DynamicImage, max_dim: u32) -> DynamicImage {
        let (width, height) = image.dimensions();
        if width <= max_dim && height <= max_dim {
            image
        } else {
            image.resize(max_dim, max_dim, FilterType::Lanczos3)
        }
    }
}
