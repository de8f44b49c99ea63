//! Test utilities and fixtures for syncplayer tests.
//!
//! This module provides a builder for synthetic ID3v2 tags and a media
//! backend that records every allocation and revocation, so tests can
//! assert that handles are released exactly once.
//!
//! # Example
//!
//! ```ignore
//! use syncplayer::test_utils::{Id3TagBuilder, RecordingBackend};
//!
//! let bytes = Id3TagBuilder::new()
//!     .text_frame("TIT2", "Song")
//!     .apic("image/png", 3, "", b"\x89PNG")
//!     .build();
//! ```

use std::collections::BTreeSet;

use crate::player::{LoadTicket, MediaBackend, PlaybackError, ResourceHandle, ResourceKind};

/// Encode a value (< 2^28) as a synchsafe integer.
pub fn encode_synchsafe(n: u32) -> [u8; 4] {
    [
        ((n >> 21) & 0x7F) as u8,
        ((n >> 14) & 0x7F) as u8,
        ((n >> 7) & 0x7F) as u8,
        (n & 0x7F) as u8,
    ]
}

/// Builds ID3v2.3 or v2.4 tags frame by frame.
#[derive(Debug, Clone)]
pub struct Id3TagBuilder {
    major: u8,
    flags: u8,
    extended: Vec<u8>,
    frames: Vec<u8>,
    padding: usize,
    audio: Vec<u8>,
}

impl Id3TagBuilder {
    /// Start an ID3v2.3 tag.
    pub fn new() -> Self {
        Self {
            major: 3,
            flags: 0,
            extended: Vec::new(),
            frames: Vec::new(),
            padding: 0,
            audio: Vec::new(),
        }
    }

    /// Start an ID3v2.4 tag (synchsafe frame sizes).
    pub fn v24() -> Self {
        Self {
            major: 4,
            ..Self::new()
        }
    }

    /// Add an extended header with the given body and set the header flag.
    pub fn extended_header(mut self, body: &[u8]) -> Self {
        self.flags |= 0x40;
        self.extended.clear();
        if self.major == 4 {
            self.extended
                .extend_from_slice(&encode_synchsafe(body.len() as u32 + 4));
        } else {
            self.extended
                .extend_from_slice(&(body.len() as u32).to_be_bytes());
        }
        self.extended.extend_from_slice(body);
        self
    }

    pub fn frame(self, id: &str, payload: &[u8]) -> Self {
        self.frame_with_flags(id, 0, payload)
    }

    pub fn frame_with_flags(mut self, id: &str, flags: u16, payload: &[u8]) -> Self {
        assert_eq!(id.len(), 4, "frame ids are four bytes");
        self.frames.extend_from_slice(id.as_bytes());
        let size = payload.len() as u32;
        if self.major == 4 {
            self.frames.extend_from_slice(&encode_synchsafe(size));
        } else {
            self.frames.extend_from_slice(&size.to_be_bytes());
        }
        self.frames.extend_from_slice(&flags.to_be_bytes());
        self.frames.extend_from_slice(payload);
        self
    }

    /// Add a Latin-1 text frame.
    pub fn text_frame(self, id: &str, text: &str) -> Self {
        let mut payload = vec![0x00];
        payload.extend_from_slice(text.as_bytes());
        self.frame(id, &payload)
    }

    /// Add a Latin-1 `APIC` frame.
    pub fn apic(self, mime: &str, picture_type: u8, description: &str, image: &[u8]) -> Self {
        let mut payload = vec![0x00];
        payload.extend_from_slice(mime.as_bytes());
        payload.push(0x00);
        payload.push(picture_type);
        payload.extend_from_slice(description.as_bytes());
        payload.push(0x00);
        payload.extend_from_slice(image);
        self.frame("APIC", &payload)
    }

    pub fn padding(mut self, len: usize) -> Self {
        self.padding = len;
        self
    }

    /// Bytes appended after the tag, standing in for audio frames.
    pub fn audio(mut self, bytes: &[u8]) -> Self {
        self.audio = bytes.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let body_len = self.extended.len() + self.frames.len() + self.padding;
        let mut out = Vec::with_capacity(10 + body_len + self.audio.len());
        out.extend_from_slice(b"ID3");
        out.extend_from_slice(&[self.major, 0, self.flags]);
        out.extend_from_slice(&encode_synchsafe(body_len as u32));
        out.extend_from_slice(&self.extended);
        out.extend_from_slice(&self.frames);
        out.resize(out.len() + self.padding, 0);
        out.extend_from_slice(&self.audio);
        out
    }
}

impl Default for Id3TagBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One allocation made through [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub id: u64,
    pub kind: ResourceKind,
    pub ticket: Option<LoadTicket>,
    pub mime: Option<String>,
    pub len: usize,
}

/// In-memory media backend that records everything done to it.
///
/// Revoking a handle that is not live panics, so a double release fails
/// the test that caused it.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_id: u64,
    pub allocations: Vec<Allocation>,
    pub live: BTreeSet<u64>,
    pub revoked: Vec<u64>,
    /// Refuse media allocations with `ResourceAllocationFailed`
    pub fail_media: bool,
    /// Refuse image allocations with `ResourceAllocationFailed`
    pub fail_image: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(
        &mut self,
        kind: ResourceKind,
        ticket: Option<LoadTicket>,
        mime: Option<&str>,
        len: usize,
    ) -> ResourceHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.allocations.push(Allocation {
            id,
            kind,
            ticket,
            mime: mime.map(str::to_string),
            len,
        });
        self.live.insert(id);
        ResourceHandle::new(id, kind)
    }

    /// Live handles of the given kind.
    pub fn live_of(&self, kind: ResourceKind) -> Vec<u64> {
        self.allocations
            .iter()
            .filter(|a| a.kind == kind && self.live.contains(&a.id))
            .map(|a| a.id)
            .collect()
    }
}

impl MediaBackend for RecordingBackend {
    fn create_media(
        &mut self,
        ticket: LoadTicket,
        bytes: &[u8],
        mime_hint: Option<&str>,
    ) -> Result<ResourceHandle, PlaybackError> {
        if self.fail_media {
            return Err(PlaybackError::ResourceAllocationFailed(
                "media allocation refused".to_string(),
            ));
        }
        Ok(self.allocate(ResourceKind::Media, Some(ticket), mime_hint, bytes.len()))
    }

    fn create_image(
        &mut self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<ResourceHandle, PlaybackError> {
        if self.fail_image {
            return Err(PlaybackError::ResourceAllocationFailed(
                "image allocation refused".to_string(),
            ));
        }
        Ok(self.allocate(ResourceKind::Image, None, Some(mime_type), bytes.len()))
    }

    fn revoke(&mut self, handle: ResourceHandle) {
        let id = handle.into_id();
        assert!(self.live.remove(&id), "handle {id} revoked twice or never allocated");
        self.revoked.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{Id3Header, TagFlags};

    #[test]
    fn test_encode_synchsafe() {
        assert_eq!(encode_synchsafe(0), [0, 0, 0, 0]);
        assert_eq!(encode_synchsafe(257), [0, 0, 0x02, 0x01]);
        assert_eq!(
            crate::tags::decode_synchsafe(encode_synchsafe(0x0ABC_DEF)),
            Some(0x0ABC_DEF)
        );
    }

    #[test]
    fn test_builder_header() {
        let tag = Id3TagBuilder::v24()
            .extended_header(&[0, 0])
            .text_frame("TIT2", "A")
            .padding(10)
            .audio(b"audio")
            .build();
        let header = Id3Header::parse(&tag).unwrap().unwrap();
        assert_eq!(header.version, (4, 0));
        assert!(header.flags.contains(TagFlags::EXTENDED_HEADER));
        // ext (4 + 2) + frame (10 + 2) + padding 10
        assert_eq!(header.tag_size, 28);
        assert!(tag.ends_with(b"audio"));
    }

    #[test]
    fn test_recording_backend_tracks_live_handles() {
        let mut backend = RecordingBackend::new();
        let media = backend
            .create_media(LoadTicket::default(), b"abc", Some("audio/mpeg"))
            .unwrap();
        let image = backend.create_image(b"img", "image/png").unwrap();
        assert_eq!(backend.live.len(), 2);
        assert_eq!(backend.live_of(ResourceKind::Image).len(), 1);

        backend.revoke(media);
        backend.revoke(image);
        assert!(backend.live.is_empty());
        assert_eq!(backend.revoked, vec![1, 2]);
    }
}
