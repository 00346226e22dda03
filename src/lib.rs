//! Verse player: sequenced recitation playback with optional spoken
//! translation.
//!
//! * [`chapter`]: chapter and verse content.
//! * [`resolver`]: reciter catalog and source fallback.
//! * [`media`]: the media capability and its streaming backend.
//! * [`speech`]: the speech capability and the narrator adapter.
//! * [`playback`]: the engine, its state machine and subscribers.
//! * [`config`]: persisted settings.

pub mod chapter;
pub mod config;
pub mod media;
pub mod playback;
pub mod resolver;
pub mod speech;
