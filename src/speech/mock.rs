//! Scriptable [`SpeechSynthesizer`] for tests.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::speech::synthesizer::{SpeechError, SpeechEvent, SpeechSynthesizer};

/// How the mock reacts to `speak`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSpeech {
    /// Report `Started` then `Done` immediately.
    Complete,
    /// Report `Started` then `Failed`.
    Fail,
    /// Report `Started`; the test ends the utterance with
    /// [`MockSynthesizer::complete`].
    Manual,
    /// `speak` itself returns an error.
    Refuse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCall {
    Speak(String),
    Pause,
    Resume,
    Stop,
}

struct MockInner {
    behavior: MockSpeech,
    calls: Vec<SpeechCall>,
    pending: Option<mpsc::UnboundedSender<SpeechEvent>>,
}

#[derive(Clone)]
pub struct MockSynthesizer {
    inner: Arc<Mutex<MockInner>>,
}

impl MockSynthesizer {
    pub fn new(behavior: MockSpeech) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                behavior,
                calls: Vec::new(),
                pending: None,
            })),
        }
    }

    pub fn calls(&self) -> Vec<SpeechCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Texts passed to `speak`, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SpeechCall::Speak(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// End the pending `Manual` utterance with `Done`.
    pub fn complete(&self) -> bool {
        match self.inner.lock().unwrap().pending.take() {
            Some(tx) => tx.send(SpeechEvent::Done).is_ok(),
            None => false,
        }
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn speak(
        &self,
        text: &str,
        language: &str,
        events: mpsc::UnboundedSender<SpeechEvent>,
    ) -> Result<(), SpeechError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.behavior == MockSpeech::Refuse {
            return Err(SpeechError::Unavailable(language.to_string()));
        }
        inner.calls.push(SpeechCall::Speak(text.to_string()));

        let _ = events.send(SpeechEvent::Started);
        match inner.behavior {
            MockSpeech::Complete => {
                let _ = events.send(SpeechEvent::Done);
            }
            MockSpeech::Fail => {
                let _ = events.send(SpeechEvent::Failed(SpeechError::Synthesis("voice crashed".into())));
            }
            MockSpeech::Manual => inner.pending = Some(events),
            MockSpeech::Refuse => {}
        }
        Ok(())
    }

    fn pause(&self) {
        self.inner.lock().unwrap().calls.push(SpeechCall::Pause);
    }

    fn resume(&self) {
        self.inner.lock().unwrap().calls.push(SpeechCall::Resume);
    }

    fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(SpeechCall::Stop);
        inner.pending = None;
    }
}
