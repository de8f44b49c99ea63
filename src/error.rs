//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`
//! ([`TagError`], [`PlaybackError`], `ConfigError`), while the CLI uses
//! `anyhow` for convenient error propagation. File-level helpers that mix
//! I/O with tag or playback work return this module's [`Error`].
//!
//! Nothing here is fatal to the process: a tag error means "no album art",
//! a playback error means "cannot play this file".
//!
//! # Example
//!
//! ```ignore
//! use syncplayer::error::{Result, ResultExt};
//!
//! fn read_art(path: &Path) -> Result<Option<AlbumArt>> {
//!     let bytes = std::fs::read(path).with_context("reading track")?;
//!     Ok(extract_album_art(&Id3Scanner::new(), &bytes, true))
//! }
//! ```

use crate::player::PlaybackError;
use crate::tags::TagError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tag parsing error
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    /// Playback or resource error
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Whether this is (or wraps) a tag parse error.
    pub fn is_tag_error(&self) -> bool {
        match self {
            Self::Tag(_) => true,
            Self::WithContext { source, .. } => source.is_tag_error(),
            _ => false,
        }
    }

    /// Whether this is (or wraps) a playback or resource error.
    pub fn is_playback_error(&self) -> bool {
        match self {
            Self::Playback(_) => true,
            Self::WithContext { source, .. } => source.is_playback_error(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, TagError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Tag(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, PlaybackError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Playback(e).context(ctx))
    }
}
