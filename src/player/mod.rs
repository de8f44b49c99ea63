//! Playback resource lifecycle and state machine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 PlaybackResourceManager (UI thread)             │
//! │   owns PlaybackState + handles, applies commands and events     │
//! └──────────────┬───────────────────────────────▲──────────────────┘
//!                │ create / revoke               │ (LoadTicket, MediaEvent)
//!                ▼                               │ crossbeam channel
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    MediaBackend (host facility)                 │
//! │         decodes and outputs audio, displays images              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one thread. A load is split into `begin_load`
//! (issue a ticket), `stage_load` (allocate handles) and `commit_load`
//! (install them); the latest ticket wins, and a staged load that lost
//! the race releases its own handles on commit. The previously installed
//! handles are released only after the new ones exist, and each handle is
//! released exactly once because revoking consumes it.

mod backend;
mod handle;
mod state;

pub use backend::{MediaBackend, ProbeBackend, TaggedEvent, probe_duration};
pub use handle::{ResourceHandle, ResourceKind};
pub use state::{
    LoadTicket, MediaEvent, PlaybackState, PlaybackStatus, PlayerSnapshot, format_time,
};

use std::path::Path;

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use crate::config::{ArtConfig, Config, PlaybackConfig};
use crate::cover::extract_album_art;
use crate::error::ResultExt;
use crate::tags::{Id3Scanner, TagScanner};

/// Player errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    #[error("Unsupported media format: {0}")]
    UnsupportedMediaFormat(String),

    #[error("Resource allocation failed: {0}")]
    ResourceAllocationFailed(String),

    #[error("Media playback failed: {0}")]
    MediaError(String),

    #[error("Cannot {action} while {status}")]
    InvalidTransition {
        action: &'static str,
        status: PlaybackStatus,
    },

    /// A newer load replaced this one. Never shown to the user.
    #[error("Load was superseded by a newer request")]
    SupersededLoad,
}

impl PlaybackError {
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::SupersededLoad)
    }
}

/// Handles allocated for a load that has not been installed yet.
#[derive(Debug)]
#[must_use = "a staged load must be committed or its handles leak"]
pub struct StagedLoad {
    ticket: LoadTicket,
    media: ResourceHandle,
    art: Option<(ResourceHandle, String)>,
}

impl StagedLoad {
    pub fn ticket(&self) -> LoadTicket {
        self.ticket
    }

    pub fn has_art(&self) -> bool {
        self.art.is_some()
    }
}

/// Owns the current media and album-art resources and the playback state.
pub struct PlaybackResourceManager<B: MediaBackend> {
    backend: B,
    scanner: Box<dyn TagScanner>,
    playback: PlaybackConfig,
    art: ArtConfig,
    state: PlaybackState,
    /// Most recently issued ticket; only this load may be installed
    latest: LoadTicket,
}

impl<B: MediaBackend> PlaybackResourceManager<B> {
    /// Create a manager with the given backend, tag scanner and config.
    pub fn new(backend: B, scanner: Box<dyn TagScanner>, config: &Config) -> Self {
        let volume = if config.playback.initial_volume.is_nan() {
            1.0
        } else {
            config.playback.initial_volume
        };
        Self {
            backend,
            scanner,
            playback: config.playback.clone(),
            art: config.art.clone(),
            state: PlaybackState::new(volume),
            latest: LoadTicket::default(),
        }
    }

    /// Create a manager using the ID3 scanner and default config.
    pub fn with_backend(backend: B) -> Self {
        Self::new(backend, Box::new(Id3Scanner::new()), &Config::default())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.state.snapshot()
    }

    /// The ticket of the newest load request.
    pub fn latest_ticket(&self) -> LoadTicket {
        self.latest
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load a file: allocate its resources, install them, release the old ones.
    ///
    /// On success the player is `Loading` until the backend reports the
    /// duration. On failure the player is `Error` and whatever was playing
    /// before keeps its handles.
    pub fn load_file(
        &mut self,
        bytes: &[u8],
        mime_hint: Option<&str>,
    ) -> Result<LoadTicket, PlaybackError> {
        let ticket = self.begin_load();
        let staged = self.stage_load(ticket, bytes, mime_hint)?;
        self.commit_load(staged)
    }

    /// Read a file from disk and load it.
    ///
    /// A read failure leaves the player untouched.
    pub fn load_path(
        &mut self,
        path: &Path,
        mime_hint: Option<&str>,
    ) -> crate::error::Result<LoadTicket> {
        let bytes = std::fs::read(path).with_context(format!("reading {}", path.display()))?;
        self.load_file(&bytes, mime_hint)
            .with_context(format!("loading {}", path.display()))
    }

    /// Start a new load request. Any load still in flight becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest = self.latest.next();
        self.state.status = PlaybackStatus::Loading;
        self.state.last_error = None;
        debug!(ticket = %self.latest, "Load requested");
        self.latest
    }

    /// Allocate the media resource and, if the tag has a picture, the art
    /// resource for a load request.
    ///
    /// A stale ticket fails with [`PlaybackError::SupersededLoad`] before
    /// anything is allocated. An unacceptable MIME hint or a media
    /// allocation failure moves the player to `Error`. Art problems never
    /// fail the load.
    pub fn stage_load(
        &mut self,
        ticket: LoadTicket,
        bytes: &[u8],
        mime_hint: Option<&str>,
    ) -> Result<StagedLoad, PlaybackError> {
        if ticket != self.latest {
            debug!(%ticket, latest = %self.latest, "Skipping stale load");
            return Err(PlaybackError::SupersededLoad);
        }

        if !self.playback.accepts(mime_hint) {
            let err = PlaybackError::UnsupportedMediaFormat(
                mime_hint.unwrap_or_default().to_string(),
            );
            self.fail(&err);
            return Err(err);
        }

        let media = match self.backend.create_media(ticket, bytes, mime_hint) {
            Ok(handle) => handle,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };

        let art = if self.art.enabled {
            self.allocate_art(bytes)
        } else {
            None
        };

        Ok(StagedLoad { ticket, media, art })
    }

    fn allocate_art(&mut self, bytes: &[u8]) -> Option<(ResourceHandle, String)> {
        let art = extract_album_art(self.scanner.as_ref(), bytes, self.art.prefer_front_cover)?;
        match self.backend.create_image(&art.data, &art.mime_type) {
            Ok(handle) => Some((handle, art.mime_type)),
            Err(e) => {
                warn!("Could not create album art resource: {}", e);
                None
            }
        }
    }

    /// Install a staged load if it is still the latest request.
    ///
    /// A stale load has its handles released and returns
    /// [`PlaybackError::SupersededLoad`] without touching the visible state.
    pub fn commit_load(&mut self, staged: StagedLoad) -> Result<LoadTicket, PlaybackError> {
        let StagedLoad { ticket, media, art } = staged;
        if ticket != self.latest {
            debug!(%ticket, latest = %self.latest, "Discarding superseded load");
            self.backend.revoke(media);
            if let Some((handle, _)) = art {
                self.backend.revoke(handle);
            }
            return Err(PlaybackError::SupersededLoad);
        }

        let (art, art_mime) = match art {
            Some((handle, mime)) => (Some(handle), Some(mime)),
            None => (None, None),
        };
        let old_media = self.state.media.replace(media);
        let old_art = std::mem::replace(&mut self.state.art, art);
        self.state.art_mime = art_mime;
        self.state.load = Some(ticket);
        self.state.status = PlaybackStatus::Loading;
        self.state.current_time = 0.0;
        self.state.duration = 0.0;
        self.state.last_error = None;

        self.release(old_media, old_art);
        info!(%ticket, has_art = self.state.art.is_some(), "Installed new media");
        Ok(ticket)
    }

    fn release(&mut self, media: Option<ResourceHandle>, art: Option<ResourceHandle>) {
        if let Some(handle) = media {
            self.backend.revoke(handle);
        }
        if let Some(handle) = art {
            self.backend.revoke(handle);
        }
    }

    fn release_installed(&mut self) {
        let media = self.state.media.take();
        let art = self.state.art.take();
        self.state.art_mime = None;
        self.state.load = None;
        self.state.current_time = 0.0;
        self.state.duration = 0.0;
        self.release(media, art);
    }

    fn fail(&mut self, err: &PlaybackError) {
        warn!("Playback error: {}", err);
        self.state.status = PlaybackStatus::Error;
        self.state.last_error = Some(err.to_string());
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Start or resume playback. A no-op when already playing.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        match self.state.status {
            PlaybackStatus::Playing => Ok(()),
            PlaybackStatus::Ready | PlaybackStatus::Paused => {
                self.state.status = PlaybackStatus::Playing;
                Ok(())
            }
            status => Err(PlaybackError::InvalidTransition {
                action: "play",
                status,
            }),
        }
    }

    /// Pause playback. A no-op when already paused or not yet started.
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        match self.state.status {
            PlaybackStatus::Paused | PlaybackStatus::Ready => Ok(()),
            PlaybackStatus::Playing => {
                self.state.status = PlaybackStatus::Paused;
                Ok(())
            }
            status => Err(PlaybackError::InvalidTransition {
                action: "pause",
                status,
            }),
        }
    }

    /// Toggle play/pause.
    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        if self.state.status == PlaybackStatus::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Seek to a position, clamped to `[0, duration]`. Returns the new position.
    pub fn seek(&mut self, seconds: f64) -> Result<f64, PlaybackError> {
        if !self.state.status.is_loaded() || self.state.media.is_none() {
            return Err(PlaybackError::InvalidTransition {
                action: "seek",
                status: self.state.status,
            });
        }
        let target = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, self.state.duration)
        };
        self.state.current_time = target;
        Ok(target)
    }

    /// Set the volume, clamped to `[0, 1]`. NaN leaves it unchanged.
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        if !volume.is_nan() {
            self.state.volume = volume.clamp(0.0, 1.0);
        }
        self.state.volume
    }

    /// Playback reached the end of the media.
    pub fn on_ended(&mut self) {
        if self.state.status == PlaybackStatus::Playing {
            self.state.status = PlaybackStatus::Ended;
            self.state.current_time = 0.0;
        } else {
            debug!(status = %self.state.status, "Ignoring end of playback");
        }
    }

    // ------------------------------------------------------------------
    // Backend events
    // ------------------------------------------------------------------

    /// Apply an event from the backend.
    ///
    /// Events for anything but the installed, latest load are dropped.
    pub fn handle_event(&mut self, ticket: LoadTicket, event: MediaEvent) {
        if ticket != self.latest || self.state.load != Some(ticket) {
            debug!(%ticket, ?event, "Dropping event for stale load");
            return;
        }

        match event {
            MediaEvent::DurationAvailable(duration) => {
                self.state.duration = if duration.is_finite() && duration > 0.0 {
                    duration
                } else {
                    0.0
                };
                if self.state.status == PlaybackStatus::Loading {
                    self.state.status = if self.playback.autoplay {
                        PlaybackStatus::Playing
                    } else {
                        PlaybackStatus::Ready
                    };
                    debug!(status = %self.state.status, duration = self.state.duration, "Media ready");
                }
            }
            MediaEvent::TimeUpdate(time) => {
                if self.state.status.is_loaded() && !time.is_nan() {
                    self.state.current_time = time.clamp(0.0, self.state.duration.max(0.0));
                }
            }
            MediaEvent::Ended => self.on_ended(),
            MediaEvent::Error(cause) => {
                self.release_installed();
                self.fail(&PlaybackError::MediaError(cause));
            }
        }
    }

    /// Apply every event currently queued on the backend channel.
    ///
    /// Returns the number of events processed.
    pub fn drain_events(&mut self, events: &Receiver<TaggedEvent>) -> usize {
        let mut count = 0;
        while let Ok((ticket, event)) = events.try_recv() {
            self.handle_event(ticket, event);
            count += 1;
        }
        count
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Release both handles and return to `Idle`. Safe to call repeatedly.
    ///
    /// Any load still in flight is superseded and will clean up after itself.
    pub fn dispose(&mut self) {
        self.latest = self.latest.next();
        if self.state.media.is_some() || self.state.art.is_some() {
            info!("Disposing player resources");
        }
        self.release_installed();
        self.state.status = PlaybackStatus::Idle;
        self.state.last_error = None;
    }
}

impl<B: MediaBackend> Drop for PlaybackResourceManager<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
