//! Album art taken from a file's embedded tag.
//!
//! Extraction always tries the real embedded picture first. Whenever that
//! yields nothing, whether there is no tag, no `APIC` frame, or a damaged
//! one, the result is simply `None` and the UI shows its placeholder.

mod embedded;

pub use embedded::{extract_album_art, extract_embedded_cover, read_embedded_cover};

use serde::Serialize;

use crate::tags::{ApicFrame, PICTURE_TYPE_FRONT_COVER};

/// Cover art data ready for display.
///
/// An owned copy of the picture; it does not borrow from the file buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumArt {
    /// Normalised MIME type (image/jpeg, image/png, ...)
    pub mime_type: String,
    /// Raw image bytes
    #[serde(skip)]
    pub data: Vec<u8>,
    /// ID3 picture type (3 = front cover)
    pub picture_type: u8,
}

impl AlbumArt {
    pub fn from_apic(frame: &ApicFrame<'_>) -> Self {
        Self {
            mime_type: normalize_mime(&frame.mime_type, frame.image_data),
            data: frame.image_data.to_vec(),
            picture_type: frame.picture_type,
        }
    }

    pub fn is_front_cover(&self) -> bool {
        self.picture_type == PICTURE_TYPE_FRONT_COVER
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Turn a stored MIME string into a proper `image/*` type.
///
/// Taggers write everything from `image/jpeg` to `JPG` to nothing at all;
/// anything that is not already a full type is mapped from its short form,
/// or sniffed from the image bytes as a last resort.
pub fn normalize_mime(raw: &str, data: &[u8]) -> String {
    let mime = raw.trim().to_ascii_lowercase();
    if mime.starts_with("image/") && mime.len() > "image/".len() {
        return match mime.as_str() {
            "image/jpg" => "image/jpeg".to_string(),
            _ => mime,
        };
    }
    let short = match mime.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    };
    short.unwrap_or_else(|| sniff_image_mime(data)).to_string()
}

/// Guess an image MIME type from its magic bytes, defaulting to JPEG.
pub fn sniff_image_mime(data: &[u8]) -> &'static str {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'B', b'M', ..] => "image/bmp",
        _ => "image/jpeg", // Default assumption
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TextEncoding;

    #[test]
    fn test_from_apic_copies_bytes() {
        let image = b"\x89PNG\r\n".to_vec();
        let frame = ApicFrame {
            text_encoding: TextEncoding::Latin1,
            mime_type: "image/png".to_string(),
            picture_type: 3,
            description: String::new(),
            image_data: &image,
        };
        let art = AlbumArt::from_apic(&frame);
        drop(frame);
        drop(image);

        assert_eq!(art.mime_type, "image/png");
        assert_eq!(art.data, b"\x89PNG\r\n");
        assert_eq!(art.len(), 6);
        assert!(art.is_front_cover());
    }

    #[test]
    fn test_normalize_mime() {
        assert_eq!(normalize_mime("image/png", b""), "image/png");
        assert_eq!(normalize_mime(" Image/JPEG ", b""), "image/jpeg");
        assert_eq!(normalize_mime("image/jpg", b""), "image/jpeg");
        assert_eq!(normalize_mime("PNG", b""), "image/png");
        assert_eq!(normalize_mime("jpg", b""), "image/jpeg");
    }

    #[test]
    fn test_missing_mime_is_sniffed() {
        assert_eq!(normalize_mime("", b"\x89PNG\r\n\x1a\n"), "image/png");
        assert_eq!(normalize_mime("image/", b"GIF89a"), "image/gif");
        assert_eq!(normalize_mime("-->", b"BM...."), "image/bmp");
        assert_eq!(normalize_mime("", b"\x00\x01"), "image/jpeg");
    }
}
