//! Speech synthesis capability and the single-utterance adapter.
//!
//! # Overview
//!
//! [`SpeechSynthesizer`] is the platform speech API as the engine consumes
//! it: `speak` starts an utterance and reports [`SpeechEvent`]s on the
//! supplied channel; `pause`/`resume`/`stop` act on whatever is speaking.
//!
//! [`Narrator`] wraps a synthesizer and keeps at most one utterance in
//! flight.  Starting a new utterance cancels the previous one.  Translation
//! is best-effort, so [`Utterance::wait`] collapses "done" and "failed" into
//! a single end-of-utterance result and treats a synthesizer that drops the
//! channel as a failure rather than waiting forever.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::media::HandleId;

// ---------------------------------------------------------------------------
// SpeechError / SpeechEvent
// ---------------------------------------------------------------------------

/// Errors reported by a speech synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    /// No voice is available for the requested language.
    #[error("no voice available for language '{0}'")]
    Unavailable(String),

    /// Synthesis failed mid-utterance.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// The synthesizer ended the utterance without reporting completion.
    #[error("utterance interrupted")]
    Interrupted,
}

/// Lifecycle notifications for one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Started,
    Done,
    Failed(SpeechError),
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer
// ---------------------------------------------------------------------------

/// Platform text-to-speech API.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn SpeechSynthesizer>`.
pub trait SpeechSynthesizer: Send + Sync {
    /// Start speaking `text` in `language`.  Events for this utterance are
    /// sent on `events`; after `Done` or `Failed` nothing more is sent.
    fn speak(
        &self,
        text: &str,
        language: &str,
        events: mpsc::UnboundedSender<SpeechEvent>,
    ) -> Result<(), SpeechError>;

    fn pause(&self);

    fn resume(&self);

    /// Stop the current utterance, if any.  Its channel is dropped without a
    /// terminal event.
    fn stop(&self);
}

// Compile-time assertion: Box<dyn SpeechSynthesizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechSynthesizer>) {}
};

// ---------------------------------------------------------------------------
// Utterance
// ---------------------------------------------------------------------------

/// One in-flight utterance started through a [`Narrator`].
#[derive(Debug)]
pub struct Utterance {
    pub id: HandleId,
    events: mpsc::UnboundedReceiver<SpeechEvent>,
}

impl Utterance {
    /// Wait until the utterance ends.
    ///
    /// `Ok(())` when the synthesizer reported `Done`, `Err` when it reported
    /// `Failed` or dropped the channel.
    pub async fn wait(mut self) -> Result<(), SpeechError> {
        while let Some(event) = self.events.recv().await {
            match event {
                SpeechEvent::Started => {
                    log::debug!("speech: utterance {} started", self.id);
                }
                SpeechEvent::Done => return Ok(()),
                SpeechEvent::Failed(e) => return Err(e),
            }
        }
        Err(SpeechError::Interrupted)
    }
}

// ---------------------------------------------------------------------------
// Narrator
// ---------------------------------------------------------------------------

/// Keeps at most one utterance in flight on a [`SpeechSynthesizer`].
pub struct Narrator {
    synth: Arc<dyn SpeechSynthesizer>,
    current: Option<HandleId>,
}

impl Narrator {
    pub fn new(synth: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synth,
            current: None,
        }
    }

    /// Start a new utterance, cancelling any previous one first.
    pub fn speak(&mut self, text: &str, language: &str) -> Result<Utterance, SpeechError> {
        self.cancel();

        let (tx, rx) = mpsc::unbounded_channel();
        self.synth.speak(text, language, tx)?;

        let id = HandleId::next();
        self.current = Some(id);
        log::debug!("speech: utterance {id} queued ({language}, {} chars)", text.len());

        Ok(Utterance { id, events: rx })
    }

    pub fn pause(&self) {
        if self.current.is_some() {
            self.synth.pause();
        }
    }

    pub fn resume(&self) {
        if self.current.is_some() {
            self.synth.resume();
        }
    }

    /// Stop the in-flight utterance.  No-op when nothing is speaking.
    pub fn cancel(&mut self) {
        if let Some(id) = self.current.take() {
            log::debug!("speech: cancelling utterance {id}");
            self.synth.stop();
        }
    }

    /// Mark `id` as ended so a later `cancel` does not stop a newer one.
    pub fn release(&mut self, id: HandleId) {
        if self.current == Some(id) {
            self.current = None;
        }
    }

    pub fn in_flight(&self) -> Option<HandleId> {
        self.current
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::{MockSpeech, MockSynthesizer, SpeechCall};

    #[tokio::test]
    async fn wait_returns_ok_on_done() {
        let synth = MockSynthesizer::new(MockSpeech::Complete);
        let mut narrator = Narrator::new(Arc::new(synth.clone()));

        let utterance = narrator.speak("In the name of God", "en").unwrap();
        assert_eq!(narrator.in_flight(), Some(utterance.id));
        assert!(utterance.wait().await.is_ok());
    }

    #[tokio::test]
    async fn wait_returns_err_on_failure() {
        let synth = MockSynthesizer::new(MockSpeech::Fail);
        let mut narrator = Narrator::new(Arc::new(synth));

        let utterance = narrator.speak("text", "en").unwrap();
        assert!(matches!(utterance.wait().await, Err(SpeechError::Synthesis(_))));
    }

    #[tokio::test]
    async fn dropped_channel_is_interrupted() {
        let synth = MockSynthesizer::new(MockSpeech::Manual);
        let mut narrator = Narrator::new(Arc::new(synth.clone()));

        let utterance = narrator.speak("text", "en").unwrap();
        narrator.cancel();
        assert_eq!(utterance.wait().await, Err(SpeechError::Interrupted));
    }

    #[test]
    fn speak_refusal_is_returned() {
        let synth = MockSynthesizer::new(MockSpeech::Refuse);
        let mut narrator = Narrator::new(Arc::new(synth));

        let err = narrator.speak("text", "xx").unwrap_err();
        assert_eq!(err, SpeechError::Unavailable("xx".into()));
        assert_eq!(narrator.in_flight(), None);
    }

    #[test]
    fn new_utterance_cancels_previous() {
        let synth = MockSynthesizer::new(MockSpeech::Manual);
        let mut narrator = Narrator::new(Arc::new(synth.clone()));

        let first = narrator.speak("one", "en").unwrap();
        let second = narrator.speak("two", "en").unwrap();
        assert_ne!(first.id, second.id);

        assert_eq!(
            synth.calls(),
            vec![
                SpeechCall::Speak("one".into()),
                SpeechCall::Stop,
                SpeechCall::Speak("two".into()),
            ]
        );
    }

    #[test]
    fn pause_and_cancel_are_noops_when_idle() {
        let synth = MockSynthesizer::new(MockSpeech::Manual);
        let mut narrator = Narrator::new(Arc::new(synth.clone()));

        narrator.pause();
        narrator.resume();
        narrator.cancel();
        assert!(synth.calls().is_empty());
    }

    #[test]
    fn release_only_clears_matching_utterance() {
        let synth = MockSynthesizer::new(MockSpeech::Manual);
        let mut narrator = Narrator::new(Arc::new(synth));

        let first = narrator.speak("one", "en").unwrap();
        let second = narrator.speak("two", "en").unwrap();

        narrator.release(first.id);
        assert_eq!(narrator.in_flight(), Some(second.id));
        narrator.release(second.id);
        assert_eq!(narrator.in_flight(), None);
    }
}
