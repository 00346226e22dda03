//! Playback state machine values and the snapshot pushed to subscribers.
//!
//! [`PlaybackState`] is the single exhaustive description of what the engine
//! is doing.  The UI (or any other observer) never sees the engine's internal
//! session; it receives immutable [`PlaybackSnapshot`] copies instead.
//!
//! [`SharedSnapshot`] is a type alias for `Arc<Mutex<PlaybackSnapshot>>`,
//! the last published snapshot, read by `current_state()`.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;

use crate::resolver::ResolveError;

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

/// States of the verse-playback engine.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──play──▶ Resolving ──source opened──▶ PlayingRecitation
///                Resolving ──exhausted──▶ Idle (error)
/// PlayingRecitation ──finished, interleave──▶ PlayingTranslation
/// PlayingRecitation ──finished──▶ advance
/// PlayingTranslation ──done / failed──▶ advance
/// advance ──next verse──▶ Resolving
/// advance ──past last verse──▶ Finished ──▶ Idle
/// PlayingRecitation / PlayingTranslation ──pause──▶ Paused ──resume──▶ (same stage)
/// any state ──stop──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// No session.
    Idle,

    /// Looking for a playable source for the current verse.
    Resolving,

    /// The current verse's recitation is playing.
    PlayingRecitation,

    /// The current verse's translation is being spoken.
    PlayingTranslation,

    /// Recitation or translation is paused.
    Paused,

    /// The last verse completed; `Idle` follows immediately.
    Finished,
}

impl PlaybackState {
    /// Returns `true` while audio (recitation or speech) is playing.
    ///
    /// ```
    /// use verse_player::playback::PlaybackState;
    ///
    /// assert!(PlaybackState::PlayingRecitation.is_active());
    /// assert!(PlaybackState::PlayingTranslation.is_active());
    /// assert!(!PlaybackState::Paused.is_active());
    /// assert!(!PlaybackState::Resolving.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PlaybackState::PlayingRecitation | PlaybackState::PlayingTranslation
        )
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Resolving => "Loading",
            PlaybackState::PlayingRecitation => "Reciting",
            PlaybackState::PlayingTranslation => "Translating",
            PlaybackState::Paused => "Paused",
            PlaybackState::Finished => "Finished",
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState::Idle
    }
}

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Terminal errors that end a chapter run.  Carried in the snapshot that
/// returns the engine to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackError {
    /// Every candidate source for the verse failed.
    #[error("no playable source for {chapter}:{verse} ({attempts} sources tried)")]
    NoPlayableSource {
        chapter: u32,
        verse: u32,
        attempts: usize,
    },

    /// The recitation handle reported an error after it started.
    #[error("playback of {chapter}:{verse} failed: {reason}")]
    MediaFailed {
        chapter: u32,
        verse: u32,
        reason: String,
    },
}

impl From<ResolveError> for PlaybackError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Exhausted {
                chapter,
                verse,
                attempts,
            } => PlaybackError::NoPlayableSource {
                chapter,
                verse,
                attempts,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackSnapshot
// ---------------------------------------------------------------------------

/// Immutable copy of the engine's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub chapter_id: Option<u32>,
    pub verse_number: Option<u32>,
    /// Set only on the `Idle` snapshot that ends a failed run.
    pub error: Option<PlaybackError>,
}

impl PlaybackSnapshot {
    pub fn idle() -> Self {
        Self {
            state: PlaybackState::Idle,
            chapter_id: None,
            verse_number: None,
            error: None,
        }
    }

    pub fn at(state: PlaybackState, chapter_id: u32, verse_number: u32) -> Self {
        Self {
            state,
            chapter_id: Some(chapter_id),
            verse_number: Some(verse_number),
            error: None,
        }
    }
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

// ---------------------------------------------------------------------------
// TranslationPolicy
// ---------------------------------------------------------------------------

/// Whether (and in which voice) translations are spoken after each verse.
///
/// The engine reads the policy once per verse boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPolicy {
    pub enabled: bool,
    pub voice_language: String,
}

impl TranslationPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            voice_language: "en".into(),
        }
    }

    pub fn enabled(voice_language: impl Into<String>) -> Self {
        Self {
            enabled: true,
            voice_language: voice_language.into(),
        }
    }
}

impl Default for TranslationPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

// ---------------------------------------------------------------------------
// SharedSnapshot
// ---------------------------------------------------------------------------

/// Thread-safe handle to the last published [`PlaybackSnapshot`].
///
/// Lock for a short critical section only; never hold the lock while
/// notifying subscribers.
pub type SharedSnapshot = Arc<Mutex<PlaybackSnapshot>>;

pub fn new_shared_snapshot() -> SharedSnapshot {
    Arc::new(Mutex::new(PlaybackSnapshot::idle()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
