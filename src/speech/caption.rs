//! Headless synthesizer that prints translations as caption lines.

use std::io::Write;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::speech::synthesizer::{SpeechError, SpeechEvent, SpeechSynthesizer};

/// Writes each utterance as `[language] text` and completes immediately.
///
/// Used by the command-line player where no platform voice exists.
pub struct CaptionSynthesizer {
    out: Mutex<Box<dyn Write + Send>>,
}

impl CaptionSynthesizer {
    /// Captions go to stdout.
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl SpeechSynthesizer for CaptionSynthesizer {
    fn speak(
        &self,
        text: &str,
        language: &str,
        events: mpsc::UnboundedSender<SpeechEvent>,
    ) -> Result<(), SpeechError> {
        let _ = events.send(SpeechEvent::Started);

        let written = {
            let mut out = self
                .out
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            writeln!(out, "[{language}] {text}").and_then(|()| out.flush())
        };

        let event = match written {
            Ok(()) => SpeechEvent::Done,
            Err(e) => SpeechEvent::Failed(SpeechError::Synthesis(e.to_string())),
        };
        let _ = events.send(event);
        Ok(())
    }

    fn pause(&self) {}

    fn resume(&self) {}

    fn stop(&self) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
