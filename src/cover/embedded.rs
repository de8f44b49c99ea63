//! Extract cover art embedded in audio file tags.

use std::path::Path;

use tracing::{debug, warn};

use super::AlbumArt;
use crate::error::{Result, ResultExt};
use crate::tags::{ApicFrame, Id3Scanner, TagError, TagScanner};

fn select_picture<'a>(
    scanner: &dyn TagScanner,
    bytes: &'a [u8],
    prefer_front_cover: bool,
) -> std::result::Result<Option<ApicFrame<'a>>, TagError> {
    if !prefer_front_cover {
        return scanner.scan(bytes);
    }
    match scanner.pictures(bytes) {
        Ok(pictures) => {
            let front = pictures.iter().position(|p| p.is_front_cover());
            Ok(pictures.into_iter().nth(front.unwrap_or(0)))
        }
        Err(e) => {
            debug!("Picture list unreadable ({}), trying the first picture", e);
            scanner.scan(bytes)
        }
    }
}

/// Extract album art from raw file bytes.
///
/// With `prefer_front_cover`, the first front-cover picture wins over any
/// earlier picture; otherwise the first `APIC` frame is used. Tag errors
/// are logged and reported as `None`.
pub fn extract_album_art(
    scanner: &dyn TagScanner,
    bytes: &[u8],
    prefer_front_cover: bool,
) -> Option<AlbumArt> {
    match select_picture(scanner, bytes, prefer_front_cover) {
        Ok(Some(frame)) => {
            let art = AlbumArt::from_apic(&frame);
            debug!(mime = %art.mime_type, bytes = art.len(), "Found embedded album art");
            Some(art)
        }
        Ok(None) => {
            debug!("No embedded album art");
            None
        }
        Err(e) => {
            warn!("Ignoring unreadable album art: {}", e);
            None
        }
    }
}

/// Read a file and extract its embedded album art, front cover first.
///
/// Unlike [`extract_embedded_cover`], a damaged tag is an error.
pub fn read_embedded_cover(path: &Path) -> Result<Option<AlbumArt>> {
    let bytes = std::fs::read(path).with_context(format!("reading {}", path.display()))?;
    let frame = select_picture(&Id3Scanner::new(), &bytes, true)
        .with_context(format!("scanning tag of {}", path.display()))?;
    Ok(frame.as_ref().map(AlbumArt::from_apic))
}

/// Read a file and extract its embedded album art.
///
/// I/O errors are returned; tag problems are not, they just mean no art.
pub fn extract_embedded_cover(path: &Path) -> Result<Option<AlbumArt>> {
    match read_embedded_cover(path) {
        Err(e) if e.is_tag_error() => {
            warn!("Ignoring unreadable album art: {}", e);
            Ok(None)
        }
        result => result,
    }
}
