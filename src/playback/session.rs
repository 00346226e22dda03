//! The live playback session and its current stage.
//!
//! [`Stage`] owns exactly one underlying resource at a time: the pending
//! resolve task, the recitation handle, or the in-flight utterance id.  The
//! public [`PlaybackState`] is derived from it, so two stages can never be
//! active together.

use tokio::task::JoinHandle;

use crate::chapter::{Chapter, VerseRef};
use crate::media::{HandleId, MediaHandle, MediaOutcome};
use crate::playback::state::{PlaybackSnapshot, PlaybackState, TranslationPolicy};
use crate::resolver::ReciterId;
use crate::speech::{Narrator, SpeechError};

/// Whether the session walks the rest of the chapter or stops after one verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    Chapter,
    SingleVerse,
}

/// A resolve running on its own task, identified by `ticket`.
pub struct PendingResolve {
    pub ticket: HandleId,
    pub task: JoinHandle<()>,
}

/// `held` keeps a completion that arrived while paused.  It is acted on by
/// `resume` and dropped with the stage on `stop`.
pub enum Stage {
    Resolving(PendingResolve),
    Reciting {
        handle: Box<dyn MediaHandle>,
        paused: bool,
        held: Option<MediaOutcome>,
    },
    Translating {
        utterance: HandleId,
        paused: bool,
        held: Option<Result<(), SpeechError>>,
    },
}

impl Stage {
    pub fn state(&self) -> PlaybackState {
        match self {
            Stage::Resolving(_) => PlaybackState::Resolving,
            Stage::Reciting { paused: false, .. } => PlaybackState::PlayingRecitation,
            Stage::Translating { paused: false, .. } => PlaybackState::PlayingTranslation,
            Stage::Reciting { paused: true, .. } | Stage::Translating { paused: true, .. } => {
                PlaybackState::Paused
            }
        }
    }

    /// Release whatever resource this stage holds.
    pub fn release(self, narrator: &mut Narrator) {
        match self {
            Stage::Resolving(pending) => pending.task.abort(),
            Stage::Reciting { mut handle, .. } => handle.stop(),
            Stage::Translating { utterance, .. } => {
                if narrator.in_flight() == Some(utterance) {
                    narrator.cancel();
                }
            }
        }
    }
}

/// The engine's mutable state while a chapter (or verse) is being played.
///
/// Invariant: `cursor` is a valid index into `chapter.verses()` for the
/// whole lifetime of the session.
pub struct PlaybackSession {
    pub chapter: Chapter,
    pub cursor: usize,
    pub reciter: ReciterId,
    pub policy: TranslationPolicy,
    pub mode: SequenceMode,
    pub stage: Stage,
}

impl PlaybackSession {
    pub fn current_verse(&self) -> &VerseRef {
        &self.chapter.verses()[self.cursor]
    }

    /// `true` when the current verse is the last one this session will play.
    pub fn at_end(&self) -> bool {
        self.mode == SequenceMode::SingleVerse || self.cursor + 1 >= self.chapter.len()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot::at(
            self.stage.state(),
            self.chapter.id(),
            self.current_verse().number(),
        )
    }

    /// Replace the stage, releasing the old one's resource.
    pub fn replace_stage(&mut self, stage: Stage, narrator: &mut Narrator) {
        let old = std::mem::replace(&mut self.stage, stage);
        old.release(narrator);
    }
}
