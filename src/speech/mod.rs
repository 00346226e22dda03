//! Translation speech for the interleave stage.
//!
//! * [`SpeechSynthesizer`]: platform text-to-speech capability.
//! * [`Narrator`] / [`Utterance`]: single-utterance adapter used by the
//!   engine.
//! * [`CaptionSynthesizer`]: headless synthesizer that prints captions.
//! * `MockSynthesizer` (test-only): scriptable synthesizer with a call log.

pub mod caption;
pub mod synthesizer;

#[cfg(test)]
pub mod mock;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use caption::CaptionSynthesizer;
pub use synthesizer::{Narrator, SpeechError, SpeechEvent, SpeechSynthesizer, Utterance};

#[cfg(test)]
pub use mock::{MockSpeech, MockSynthesizer, SpeechCall};
