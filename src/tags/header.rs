//! ID3v2 tag header and frame header decoding.

use bitflags::bitflags;

use super::TagError;
use super::reader::ByteReader;

/// Length of the fixed tag header (`"ID3"`, version, flags, size).
pub const HEADER_LEN: usize = 10;

/// Length of a v2.3/v2.4 frame header (id, size, flags).
pub const FRAME_HEADER_LEN: usize = 10;

bitflags! {
    /// Tag-level header flags (byte 5 of the header).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TagFlags: u8 {
        const UNSYNCHRONISATION = 0x80;
        const EXTENDED_HEADER = 0x40;
        const EXPERIMENTAL = 0x20;
        const FOOTER = 0x10;
    }
}

bitflags! {
    /// Frame-level status/format flags.
    ///
    /// The bit layout changed between v2.3 and v2.4, so both sets are listed;
    /// use [`FrameHeader::is_opaque`] rather than testing bits directly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u16 {
        const V3_COMPRESSION = 0x0080;
        const V3_ENCRYPTION = 0x0040;
        const V4_COMPRESSION = 0x0008;
        const V4_ENCRYPTION = 0x0004;
        const V4_UNSYNCHRONISATION = 0x0002;
        const V4_DATA_LENGTH = 0x0001;
    }
}

/// Decode a four-byte synchsafe integer.
///
/// Returns `None` when any byte has its top bit set.
pub fn decode_synchsafe(bytes: [u8; 4]) -> Option<u32> {
    bytes.iter().try_fold(0u32, |acc, &b| {
        if b & 0x80 != 0 {
            None
        } else {
            Some((acc << 7) | u32::from(b))
        }
    })
}

/// The fixed ten-byte header at the start of an ID3v2 tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id3Header {
    /// (major, revision), e.g. `(3, 0)` for ID3v2.3.0
    pub version: (u8, u8),
    pub flags: TagFlags,
    /// Size of everything after the header, excluding any footer.
    pub tag_size: u32,
}

impl Id3Header {
    /// Parse the header at the start of `buffer`.
    ///
    /// Returns `Ok(None)` when the buffer is too short or lacks the `"ID3"`
    /// signature; that is "no tag", not an error.
    pub fn parse(buffer: &[u8]) -> Result<Option<Self>, TagError> {
        if buffer.len() < HEADER_LEN {
            return Ok(None);
        }
        let mut reader = ByteReader::new(buffer);
        let Ok(fixed) = reader.read_array::<HEADER_LEN>() else {
            return Ok(None);
        };
        if &fixed[0..3] != b"ID3" {
            return Ok(None);
        }

        let version = (fixed[3], fixed[4]);
        let flags = TagFlags::from_bits_retain(fixed[5]);
        let tag_size = decode_synchsafe([fixed[6], fixed[7], fixed[8], fixed[9]])
            .ok_or(TagError::MalformedSize)?;

        Ok(Some(Self {
            version,
            flags,
            tag_size,
        }))
    }

    pub fn major(&self) -> u8 {
        self.version.0
    }

    /// Offset one past the last byte of the frame area, capped to the buffer.
    pub fn frame_area_end(&self, buffer_len: usize) -> usize {
        HEADER_LEN
            .saturating_add(self.tag_size as usize)
            .min(buffer_len)
    }
}

/// Skip the extended header, leaving the reader at the first frame.
///
/// In v2.4 the size is synchsafe and counts itself; in v2.3 it is a plain
/// integer that excludes its own four bytes.
pub fn skip_extended_header(reader: &mut ByteReader<'_>, major: u8) -> Option<()> {
    let raw = reader.read_array::<4>().ok()?;
    let body = if major >= 4 {
        (decode_synchsafe(raw)? as usize).checked_sub(4)?
    } else {
        u32::from_be_bytes(raw) as usize
    };
    reader.skip(body).ok()
}

/// A frame header inside the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: [u8; 4],
    pub size: u32,
    pub flags: FrameFlags,
}

impl FrameHeader {
    /// Decode a frame header for the given major version.
    ///
    /// v2.4 frame sizes are synchsafe; a size with a high bit set yields
    /// `None`. Every other version uses a plain big-endian size.
    pub fn parse(raw: [u8; FRAME_HEADER_LEN], major: u8) -> Option<Self> {
        let id = [raw[0], raw[1], raw[2], raw[3]];
        let size_bytes = [raw[4], raw[5], raw[6], raw[7]];
        let size = if major == 4 {
            decode_synchsafe(size_bytes)?
        } else {
            u32::from_be_bytes(size_bytes)
        };
        let flags = FrameFlags::from_bits_retain(u16::from_be_bytes([raw[8], raw[9]]));
        Some(Self { id, size, flags })
    }

    /// The frame id as text, or `"????"` if it is not ASCII.
    pub fn id_str(&self) -> &str {
        std::str::from_utf8(&self.id)
            .ok()
            .filter(|s| s.is_ascii())
            .unwrap_or("????")
    }

    pub fn is_apic(&self) -> bool {
        &self.id == b"APIC"
    }

    /// A zero first byte marks the start of the padding area.
    pub fn is_padding(&self) -> bool {
        self.id[0] == 0
    }

    /// Whether the payload is compressed or encrypted and cannot be read as-is.
    pub fn is_opaque(&self, major: u8) -> bool {
        let mask = if major == 4 {
            FrameFlags::V4_COMPRESSION | FrameFlags::V4_ENCRYPTION
        } else {
            FrameFlags::V3_COMPRESSION | FrameFlags::V3_ENCRYPTION
        };
        self.flags.intersects(mask)
    }
}
