//! Media capability traits consumed by the resolver and the engine.
//!
//! # Overview
//!
//! [`MediaBackend`] opens a single audio resource and returns an
//! [`OpenedMedia`]: the controllable [`MediaHandle`] plus a one-shot receiver
//! that resolves exactly once with the handle's [`MediaOutcome`].  This is the
//! Rust shape of the platform's "single `onFinished`/`onError` callback per
//! handle" contract.
//!
//! Every handle carries a process-unique [`HandleId`].  The engine tags
//! outcomes with it so that notifications from a handle that has already
//! been torn down can be recognised and discarded.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// HandleId
// ---------------------------------------------------------------------------

/// Process-unique identity of a media handle or speech utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Allocate a fresh identifier.  Identifiers are never reused.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MediaError / MediaOutcome
// ---------------------------------------------------------------------------

/// Errors raised while opening or starting a media resource.
#[derive(Debug, Clone, Error)]
pub enum MediaError {
    /// The resource could not be opened (network failure, bad status, …).
    #[error("failed to open media: {0}")]
    Open(String),

    /// The resource did not open within the allotted time.
    #[error("media open timed out")]
    Timeout,

    /// The resource opened but playback could not start.
    #[error("failed to start playback: {0}")]
    Start(String),
}

impl From<reqwest::Error> for MediaError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MediaError::Timeout
        } else {
            MediaError::Open(e.to_string())
        }
    }
}

/// Terminal notification delivered once per started handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOutcome {
    /// Playback reached the end of the resource.
    Finished,
    /// Playback stopped because of an error.
    Failed(String),
}

// ---------------------------------------------------------------------------
// MediaHandle
// ---------------------------------------------------------------------------

/// A single opened audio resource.
///
/// Dropping a handle must release the underlying resource, exactly like
/// [`stop`](MediaHandle::stop).  After `stop` the handle never reports an
/// outcome.
pub trait MediaHandle: Send {
    fn id(&self) -> HandleId;

    /// The locator this handle was opened from.
    fn locator(&self) -> &str;

    /// Begin playback.  Fails when the resource opened but cannot play.
    fn start(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn resume(&mut self);

    fn stop(&mut self);
}

// Compile-time assertion: Box<dyn MediaHandle> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn MediaHandle>) {}
};

// ---------------------------------------------------------------------------
// OpenedMedia
// ---------------------------------------------------------------------------

/// A freshly opened handle together with its single-shot outcome receiver.
pub struct OpenedMedia {
    pub handle: Box<dyn MediaHandle>,
    pub outcome: oneshot::Receiver<MediaOutcome>,
}

impl OpenedMedia {
    pub fn new(handle: Box<dyn MediaHandle>, outcome: oneshot::Receiver<MediaOutcome>) -> Self {
        Self { handle, outcome }
    }
}

impl std::fmt::Debug for OpenedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedMedia")
            .field("id", &self.handle.id())
            .field("locator", &self.handle.locator())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// MediaBackend
// ---------------------------------------------------------------------------

/// Platform media API: opens one resource per call.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn MediaBackend>` and called from the resolver task.  The returned
/// future may be dropped at any time (timeout or cancellation); whatever it
/// had opened so far must be released on drop.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn open(&self, locator: &str) -> Result<OpenedMedia, MediaError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_ids_are_unique_and_increasing() {
        let a = HandleId::next();
        let b = HandleId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn handle_id_display() {
        let a = HandleId::next();
        let b = HandleId::next();
        assert!(a.to_string().starts_with('#'));
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn media_error_display_mentions_cause() {
        let e = MediaError::Open("404 Not Found".into());
        assert!(e.to_string().contains("404"));
        assert!(MediaError::Timeout.to_string().contains("timed out"));
    }
}
