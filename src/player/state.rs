//! Player state and event types.

use std::fmt;

use serde::Serialize;

use super::handle::ResourceHandle;

/// Current playback status.
///
/// `Idle -> Loading -> Ready -> {Playing <-> Paused} -> Ended`, with
/// `Error` reachable from any state but `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Error,
}

impl PlaybackStatus {
    /// States in which a media resource is loaded and positionable.
    pub fn is_loaded(self) -> bool {
        !matches!(self, Self::Idle | Self::Loading)
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Identifies one `load` request. Later requests have larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Events reported by the media backend for a particular load.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Duration metadata is known (seconds)
    DurationAvailable(f64),
    /// Periodic playback progress (seconds)
    TimeUpdate(f64),
    /// Playback reached the end
    Ended,
    /// The backend cannot play the resource
    Error(String),
}

/// The single live playback state of a player.
#[derive(Debug)]
pub struct PlaybackState {
    /// Load that owns the installed handles
    pub load: Option<LoadTicket>,
    pub media: Option<ResourceHandle>,
    pub art: Option<ResourceHandle>,
    /// MIME type of the installed art
    pub art_mime: Option<String>,
    pub status: PlaybackStatus,
    /// Position in seconds
    pub current_time: f64,
    /// Duration in seconds (0 until known)
    pub duration: f64,
    /// Volume level (0.0 - 1.0)
    pub volume: f64,
    /// Human-readable cause of the last `Error` transition
    pub last_error: Option<String>,
}

impl PlaybackState {
    pub fn new(volume: f64) -> Self {
        Self {
            load: None,
            media: None,
            art: None,
            art_mime: None,
            status: PlaybackStatus::Idle,
            current_time: 0.0,
            duration: 0.0,
            volume: volume.clamp(0.0, 1.0),
            last_error: None,
        }
    }

    /// Get position as a fraction (0.0 - 1.0).
    pub fn position_fraction(&self) -> f64 {
        if self.duration <= 0.0 {
            0.0
        } else {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            status: self.status,
            current_time: self.current_time,
            duration: self.duration,
            progress: self.position_fraction(),
            volume: self.volume,
            has_art: self.art.is_some(),
            art_mime: self.art_mime.clone(),
            media_id: self.media.as_ref().map(ResourceHandle::id),
            art_id: self.art.as_ref().map(ResourceHandle::id),
            error: self.last_error.clone(),
        }
    }
}

/// What the UI needs to render the player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    pub current_time: f64,
    pub duration: f64,
    /// Position as a fraction of the duration, for a seek bar
    pub progress: f64,
    pub volume: f64,
    pub has_art: bool,
    pub art_mime: Option<String>,
    pub media_id: Option<u64>,
    pub art_id: Option<u64>,
    pub error: Option<String>,
}

impl PlayerSnapshot {
    /// Format position as MM:SS.
    pub fn position_str(&self) -> String {
        format_time(self.current_time)
    }

    /// Format duration as MM:SS.
    pub fn duration_str(&self) -> String {
        format_time(self.duration)
    }
}

/// Format seconds as zero-padded MM:SS; unknown or negative times are 00:00.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
