//! Media capability used to play recitation audio.
//!
//! * [`MediaBackend`] / [`MediaHandle`]: the platform media API as the
//!   engine consumes it.
//! * [`StreamingBackend`]: production backend over `reqwest`.
//! * `MockBackend` (test-only): scriptable backend with a call log.

pub mod handle;
pub mod streaming;

#[cfg(test)]
pub mod mock;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use handle::{HandleId, MediaBackend, MediaError, MediaHandle, MediaOutcome, OpenedMedia};
pub use streaming::StreamingBackend;

#[cfg(test)]
pub use mock::{MockBackend, MockBehavior, MockCall};
