//! Attached picture (`APIC`) frame payload.

use super::TagError;
use super::reader::{ByteReader, Terminator};

/// Picture type for the front cover, per the ID3v2 picture type table.
pub const PICTURE_TYPE_FRONT_COVER: u8 = 0x03;

/// Text encoding marker at the start of text-bearing frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Latin1,
    /// UTF-16 with byte order mark
    Utf16,
    /// UTF-16 big-endian without BOM (v2.4)
    Utf16Be,
    /// UTF-8 (v2.4)
    Utf8,
}

impl TextEncoding {
    pub fn from_marker(marker: u8) -> Result<Self, TagError> {
        match marker {
            0 => Ok(Self::Latin1),
            1 => Ok(Self::Utf16),
            2 => Ok(Self::Utf16Be),
            3 => Ok(Self::Utf8),
            other => Err(TagError::UnsupportedEncoding(other)),
        }
    }

    pub fn terminator(self) -> Terminator {
        match self {
            Self::Latin1 | Self::Utf8 => Terminator::Single,
            Self::Utf16 | Self::Utf16Be => Terminator::Double,
        }
    }

    /// Decode a string in this encoding, replacing invalid sequences.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Latin1 => latin1(bytes),
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16 => match bytes {
                [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
                [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
                _ => utf16(bytes, u16::from_be_bytes),
            },
            Self::Utf16Be => utf16(bytes, u16::from_be_bytes),
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// A parsed `APIC` frame. The image bytes borrow from the scanned buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApicFrame<'a> {
    pub text_encoding: TextEncoding,
    /// MIME type exactly as stored in the tag
    pub mime_type: String,
    pub picture_type: u8,
    pub description: String,
    pub image_data: &'a [u8],
}

impl<'a> ApicFrame<'a> {
    /// Parse an `APIC` payload (the bytes after the frame header).
    ///
    /// Both the MIME type and the description end at the terminator of the
    /// frame's text encoding; a double terminator is aligned to the start of
    /// its field. The MIME bytes are read as Latin-1. Any terminator that is
    /// missing before the end of the payload is [`TagError::TruncatedApic`].
    pub fn parse(payload: &'a [u8]) -> Result<Self, TagError> {
        let mut reader = ByteReader::new(payload);

        let marker = reader.read_u8().map_err(|_| TagError::TruncatedApic)?;
        let text_encoding = TextEncoding::from_marker(marker)?;

        let mime = reader
            .read_terminated(text_encoding.terminator())
            .map_err(|_| TagError::TruncatedApic)?;
        let picture_type = reader.read_u8().map_err(|_| TagError::TruncatedApic)?;
        let description = reader
            .read_terminated(text_encoding.terminator())
            .map_err(|_| TagError::TruncatedApic)?;

        Ok(Self {
            text_encoding,
            mime_type: latin1(mime),
            picture_type,
            description: text_encoding.decode(description),
            image_data: reader.rest(),
        })
    }

    pub fn is_front_cover(&self) -> bool {
        self.picture_type == PICTURE_TYPE_FRONT_COVER
    }
}
