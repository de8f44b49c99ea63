//! Owned handles to resources created by the media backend.

use serde::Serialize;

/// What a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A playable audio source
    Media,
    /// A displayable image (album art)
    Image,
}

/// An opaque reference to a backend resource that must be released.
///
/// Handles are neither `Clone` nor `Copy`, and [`MediaBackend::revoke`]
/// takes them by value, so a handle can be released at most once. Dropping
/// one without revoking it leaks the backend resource and logs a warning.
///
/// [`MediaBackend::revoke`]: super::MediaBackend::revoke
#[derive(Debug, PartialEq, Eq)]
#[must_use = "resource handles must be revoked through the backend"]
pub struct ResourceHandle {
    id: u64,
    kind: ResourceKind,
}

impl ResourceHandle {
    /// Wrap a backend resource id. Only backends should call this.
    pub fn new(id: u64, kind: ResourceKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Consume the handle and return its id. Used by backends in `revoke`.
    pub fn into_id(self) -> u64 {
        let id = self.id;
        std::mem::forget(self);
        id
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        tracing::warn!(id = self.id, kind = ?self.kind, "resource handle dropped without being revoked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_id() {
        let handle = ResourceHandle::new(7, ResourceKind::Image);
        assert_eq!(handle.id(), 7);
        assert_eq!(handle.kind(), ResourceKind::Image);
        assert_eq!(handle.into_id(), 7);
    }
}
