//! Syncplayer core - album art extraction and playback resource lifecycle.
//!
//! The library has two halves:
//! - [`tags`] walks an ID3v2 tag in a byte buffer and finds the attached
//!   picture, treating the input as untrusted.
//! - [`player`] owns the media and album-art resources of the player and
//!   the playback state machine that governs them.
//!
//! [`cover`] sits between the two, turning a tag's picture into owned
//! [`cover::AlbumArt`] and downgrading every tag error to "no art".

pub mod config;
pub mod cover;
pub mod error;
pub mod player;
pub mod tags;
#[cfg(test)]
pub mod test_utils;
