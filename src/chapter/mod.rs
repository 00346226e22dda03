//! Chapter content handed to the playback engine.
//!
//! The content provider resolves a chapter (ordered verses, each with a
//! recitation-audio locator and translation text) before playback starts.
//! This module only models that data and reads it from JSON; it never
//! fetches anything over the network.

pub mod loader;
pub mod model;

pub use model::{AudioLocator, Chapter, ChapterError, VerseRef};
