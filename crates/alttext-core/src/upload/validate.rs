//! Magic-byte format detection.

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
    /// HEIC/HEIF/AVIF share the ISO-BMFF `ftyp` box
    Heif,
}

impl UploadFormat {
    /// MIME type reported to providers.
    pub fn media_type(self) -> &'static str {
        match self {
            UploadFormat::Jpeg => "image/jpeg",
            UploadFormat::Png => "image/png",
            UploadFormat::Gif => "image/gif",
            UploadFormat::WebP => "image/webp",
            UploadFormat::Bmp => "image/bmp",
            UploadFormat::Tiff => "image/tiff",
            UploadFormat::Heif => "image/heic",
        }
    }
}

/// Detect the image format from the leading bytes.
pub fn detect_format(bytes: &[u8]) -> Option<UploadFormat> {
    if bytes.len() < 4 {
        return None;
    }
    let header = &bytes[..bytes.len().min(12)];

    // JPEG: FF D8 FF
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(UploadFormat::Jpeg);
    }

    // PNG: 89 50 4E 47
    if header.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some(UploadFormat::Png);
    }

    // GIF: GIF8
    if header.starts_with(b"GIF8") {
        return Some(UploadFormat::Gif);
    }

    // WebP: RIFF....WEBP
    if header.starts_with(b"RIFF") && header.len() >= 12 && &header[8..12] == b"WEBP" {
        return Some(UploadFormat::WebP);
    }

    // BMP: BM
    if header.starts_with(b"BM") {
        return Some(UploadFormat::Bmp);
    }

    // TIFF: II*\0 or MM\0*
    if header.starts_with(&[b'I', b'I', 0x2A, 0x00]) || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
    {
        return Some(UploadFormat::Tiff);
    }

    // HEIC/HEIF/AVIF: ftyp box at offset 4
    if header.len() >= 12 && &header[4..8] == b"ftyp" {
        return Some(UploadFormat::Heif);
    }

    None
}
