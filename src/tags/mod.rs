//! ID3v2 tag scanning and embedded picture extraction.
//!
//! The scanner walks the frame table of an ID3v2.3/v2.4 tag held in memory
//! and locates the `APIC` (attached picture) frame. Input is treated as
//! untrusted: every read goes through [`ByteReader`], which checks bounds
//! instead of indexing.
//!
//! Only the frames needed to reach `APIC` are decoded. A malformed or
//! truncated frame table degrades to "no picture" (`Ok(None)`); the only
//! hard errors are a bad synchsafe tag size and a damaged `APIC` frame,
//! which callers are expected to downgrade to "no art" after logging.

mod apic;
mod header;
mod reader;

pub use apic::{ApicFrame, PICTURE_TYPE_FRONT_COVER, TextEncoding};
pub use header::{
    FRAME_HEADER_LEN, FrameFlags, FrameHeader, HEADER_LEN, Id3Header, TagFlags, decode_synchsafe,
};
pub use reader::{ByteReader, OutOfBounds, Terminator};

use tracing::debug;

/// Tag parse errors. All of them are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    /// The tag size field is not a valid synchsafe integer
    #[error("ID3 tag size has a byte with the high bit set")]
    MalformedSize,

    /// A terminator or the frame size runs past the end of the APIC frame
    #[error("APIC frame is truncated")]
    TruncatedApic,

    /// The APIC text encoding marker is not one of 0-3
    #[error("unsupported text encoding marker {0:#04x}")]
    UnsupportedEncoding(u8),
}

/// Capability to find an embedded picture in raw file bytes.
///
/// Injected into the player so tests and alternative tag formats can
/// replace the ID3 implementation.
pub trait TagScanner {
    /// Find the first attached picture.
    fn scan<'a>(&self, buffer: &'a [u8]) -> Result<Option<ApicFrame<'a>>, TagError>;

    /// Every usable attached picture, in tag order.
    ///
    /// A damaged picture ends the list; pictures before it are kept, and
    /// the error is only returned when there are none.
    fn pictures<'a>(&self, buffer: &'a [u8]) -> Result<Vec<ApicFrame<'a>>, TagError> {
        Ok(self.scan(buffer)?.into_iter().collect())
    }
}

/// A frame located by the walk, with its payload borrowed from the buffer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub header: FrameHeader,
    /// Offset of the frame header from the start of the buffer
    pub offset: usize,
    pub payload: &'a [u8],
}

/// Iterator over the frames of one tag.
///
/// Ends at padding, a zero-sized frame, an undecodable frame header, or a
/// frame that overruns the frame area. An overrunning `APIC` frame is
/// reported as [`TagError::TruncatedApic`] before the walk ends.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    reader: ByteReader<'a>,
    major: u8,
    done: bool,
}

impl<'a> Frames<'a> {
    fn stop(&mut self, reason: &str) -> Option<<Self as Iterator>::Item> {
        debug!(offset = self.reader.position(), reason, "ID3 frame walk ended");
        self.done = true;
        None
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<Frame<'a>, TagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let offset = self.reader.position();
        let Ok(raw) = self.reader.read_array::<FRAME_HEADER_LEN>() else {
            return self.stop("end of frame area");
        };
        let Some(header) = FrameHeader::parse(raw, self.major) else {
            return self.stop("invalid frame size");
        };
        if header.is_padding() {
            return self.stop("padding");
        }
        if header.size == 0 {
            return self.stop("zero-sized frame");
        }

        match self.reader.read_bytes(header.size as usize) {
            Ok(payload) => Some(Ok(Frame {
                header,
                offset,
                payload,
            })),
            Err(overrun) if header.is_apic() => {
                debug!(?overrun, "APIC frame overruns the tag");
                self.done = true;
                Some(Err(TagError::TruncatedApic))
            }
            Err(_) => self.stop("frame overruns the tag"),
        }
    }
}

/// ID3v2 implementation of [`TagScanner`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Id3Scanner;

impl Id3Scanner {
    pub fn new() -> Self {
        Self
    }

    /// Parse the tag header and position a frame walk after it.
    ///
    /// Returns the header with `None` frames when the extended header does
    /// not fit in the frame area.
    pub fn frames<'a>(
        &self,
        buffer: &'a [u8],
    ) -> Result<Option<(Id3Header, Option<Frames<'a>>)>, TagError> {
        let Some(header) = Id3Header::parse(buffer)? else {
            return Ok(None);
        };

        let area = &buffer[..header.frame_area_end(buffer.len())];
        let mut reader = ByteReader::new(area);
        if reader.skip(HEADER_LEN).is_err() {
            return Ok(Some((header, None)));
        }
        if header.flags.contains(TagFlags::EXTENDED_HEADER)
            && header::skip_extended_header(&mut reader, header.major()).is_none()
        {
            debug!("extended header overruns the tag");
            return Ok(Some((header, None)));
        }

        let frames = Frames {
            reader,
            major: header.major(),
            done: false,
        };
        Ok(Some((header, Some(frames))))
    }

    fn apic_frames<'a>(
        &self,
        buffer: &'a [u8],
    ) -> Result<impl Iterator<Item = Result<ApicFrame<'a>, TagError>> + 'a, TagError> {
        let (major, frames) = match self.frames(buffer)? {
            Some((header, frames)) => (header.major(), frames),
            None => (0, None),
        };
        Ok(frames.into_iter().flatten().filter_map(move |frame| {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e)),
            };
            if !frame.header.is_apic() {
                return None;
            }
            if frame.header.is_opaque(major) {
                debug!(offset = frame.offset, "skipping compressed or encrypted APIC frame");
                return None;
            }
            Some(ApicFrame::parse(frame.payload))
        }))
    }
}

impl TagScanner for Id3Scanner {
    fn scan<'a>(&self, buffer: &'a [u8]) -> Result<Option<ApicFrame<'a>>, TagError> {
        self.apic_frames(buffer)?.next().transpose()
    }

    fn pictures<'a>(&self, buffer: &'a [u8]) -> Result<Vec<ApicFrame<'a>>, TagError> {
        let mut pictures = Vec::new();
        for picture in self.apic_frames(buffer)? {
            match picture {
                Ok(picture) => pictures.push(picture),
                Err(e) if pictures.is_empty() => return Err(e),
                Err(e) => {
                    debug!(error = %e, kept = pictures.len(), "stopping at damaged APIC frame");
                    break;
                }
            }
        }
        Ok(pictures)
    }
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use crate::test_utils::Id3TagBuilder;
    use proptest::prelude::*;

    proptest! {
        /// Scanning arbitrary bytes never panics
        #[test]
        fn scan_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            let _ = Id3Scanner::new().scan(&bytes);
        }

        /// Arbitrary frame tables behind a valid header never panic
        #[test]
        fn scan_never_panics_inside_tag(body in prop::collection::vec(any::<u8>(), 0..512)) {
            let mut bytes = b"ID3\x03\x00\x00".to_vec();
            bytes.extend_from_slice(&crate::test_utils::encode_synchsafe(body.len() as u32));
            bytes.extend_from_slice(&body);
            let _ = Id3Scanner::new().scan(&bytes);
        }

        /// Buffers that do not start with "ID3" carry no tag
        #[test]
        fn unsigned_buffers_have_no_tag(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            prop_assume!(!bytes.starts_with(b"ID3"));
            prop_assert_eq!(Id3Scanner::new().scan(&bytes), Ok(None));
        }

        /// Any size byte with its high bit set is a malformed size
        #[test]
        fn high_bit_size_is_malformed(
            size in prop::array::uniform4(any::<u8>()),
            rest in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            prop_assume!(size.iter().any(|b| b & 0x80 != 0));
            let mut bytes = b"ID3\x03\x00\x00".to_vec();
            bytes.extend_from_slice(&size);
            bytes.extend_from_slice(&rest);
            prop_assert_eq!(Id3Scanner::new().scan(&bytes), Err(TagError::MalformedSize));
        }

        /// Synthetic tags give back exactly the stored MIME type and image
        #[test]
        fn apic_round_trip(
            image in prop::collection::vec(any::<u8>(), 0..1024),
            description in "[a-zA-Z0-9 ]{0,20}",
            v24 in any::<bool>(),
        ) {
            let builder = if v24 { Id3TagBuilder::v24() } else { Id3TagBuilder::new() };
            let tag = builder
                .text_frame("TIT2", "Title")
                .apic("image/png", 3, &description, &image)
                .text_frame("TALB", "Album")
                .build();
            let frame = Id3Scanner::new().scan(&tag).unwrap().unwrap();
            prop_assert_eq!(frame.mime_type, "image/png");
            prop_assert_eq!(frame.description, description);
            prop_assert_eq!(frame.image_data, &image[..]);
        }
    }
}
