//! The media backend seam and a symphonia-backed implementation.
//!
//! The player never decodes audio itself. A [`MediaBackend`] turns blobs
//! into playable/displayable resources and later reports what happened to
//! them as [`MediaEvent`]s tagged with the [`LoadTicket`] they belong to.

use std::collections::HashMap;
use std::io::Cursor;

use crossbeam_channel::Sender;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::PlaybackError;
use super::handle::{ResourceHandle, ResourceKind};
use super::state::{LoadTicket, MediaEvent};

/// Event as delivered over the backend channel.
pub type TaggedEvent = (LoadTicket, MediaEvent);

/// Host facility that owns playable and displayable resources.
pub trait MediaBackend {
    /// Create a playable resource from an opaque blob.
    ///
    /// Events about it must be tagged with `ticket`.
    fn create_media(
        &mut self,
        ticket: LoadTicket,
        bytes: &[u8],
        mime_hint: Option<&str>,
    ) -> Result<ResourceHandle, PlaybackError>;

    /// Create a displayable image resource.
    fn create_image(&mut self, bytes: &[u8], mime_type: &str)
    -> Result<ResourceHandle, PlaybackError>;

    /// Release a resource. Consumes the handle.
    fn revoke(&mut self, handle: ResourceHandle);
}

#[derive(Debug, Clone)]
struct LiveResource {
    kind: ResourceKind,
    mime: Option<String>,
    len: usize,
}

/// Backend that probes media with symphonia and keeps resources in memory.
///
/// `create_media` rejects blobs symphonia cannot open and immediately
/// reports the duration it found over the event channel.
pub struct ProbeBackend {
    next_id: u64,
    live: HashMap<u64, LiveResource>,
    events: Sender<TaggedEvent>,
}

impl ProbeBackend {
    pub fn new(events: Sender<TaggedEvent>) -> Self {
        Self {
            next_id: 0,
            live: HashMap::new(),
            events,
        }
    }

    /// Number of resources created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Size in bytes of a live resource.
    pub fn resource_len(&self, id: u64) -> Option<usize> {
        self.live.get(&id).map(|r| r.len)
    }

    fn register(&mut self, kind: ResourceKind, mime: Option<&str>, len: usize) -> ResourceHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.live.insert(
            id,
            LiveResource {
                kind,
                mime: mime.map(str::to_string),
                len,
            },
        );
        debug!(id, ?kind, len, "Created resource");
        ResourceHandle::new(id, kind)
    }

    fn emit(&self, ticket: LoadTicket, event: MediaEvent) {
        if self.events.send((ticket, event)).is_err() {
            debug!(%ticket, "Event receiver gone, dropping media event");
        }
    }
}

/// Probe a blob and return its duration in seconds, if the container knows it.
pub fn probe_duration(bytes: &[u8], mime_hint: Option<&str>) -> Result<Option<f64>, PlaybackError> {
    let source = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    if let Some(mime) = mime_hint {
        hint.mime_type(mime);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::UnsupportedMediaFormat(e.to_string()))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlaybackError::UnsupportedMediaFormat("No audio track found".to_string()))?;

    let params = &track.codec_params;
    let duration = match (params.n_frames, params.time_base, params.sample_rate) {
        (Some(n_frames), Some(tb), _) => {
            let time = tb.calc_time(n_frames);
            Some(time.seconds as f64 + time.frac)
        }
        (Some(n_frames), None, Some(rate)) if rate > 0 => Some(n_frames as f64 / f64::from(rate)),
        _ => None,
    };
    Ok(duration)
}

impl MediaBackend for ProbeBackend {
    fn create_media(
        &mut self,
        ticket: LoadTicket,
        bytes: &[u8],
        mime_hint: Option<&str>,
    ) -> Result<ResourceHandle, PlaybackError> {
        let duration = probe_duration(bytes, mime_hint)?;
        let handle = self.register(ResourceKind::Media, mime_hint, bytes.len());
        // Streams without a known length still become ready, with duration 0.
        self.emit(ticket, MediaEvent::DurationAvailable(duration.unwrap_or(0.0)));
        Ok(handle)
    }

    fn create_image(
        &mut self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<ResourceHandle, PlaybackError> {
        if bytes.is_empty() {
            return Err(PlaybackError::ResourceAllocationFailed(
                "empty image".to_string(),
            ));
        }
        Ok(self.register(ResourceKind::Image, Some(mime_type), bytes.len()))
    }

    fn revoke(&mut self, handle: ResourceHandle) {
        let id = handle.into_id();
        match self.live.remove(&id) {
            Some(resource) => {
                debug!(id, kind = ?resource.kind, mime = ?resource.mime, "Revoked resource")
            }
            None => tracing::warn!(id, "Revoked unknown resource"),
        }
    }
}
