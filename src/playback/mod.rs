//! Verse-playback engine.
//!
//! This module sequences a chapter verse by verse: resolve a recitation
//! source, play it, optionally speak the verse's translation, then move on.
//! Observers receive a [`PlaybackSnapshot`] after every transition.
//!
//! # Architecture
//!
//! ```text
//! PlaybackEngine (handle, Clone)
//!        │  Command (mpsc)
//!        ▼
//! EngineActor::run()  ← single tokio task, owns PlaybackSession
//!        ▲
//!        │  EngineEvent (mpsc), tagged with the producing resource's id
//!        ├─ resolve task         → Resolved
//!        ├─ media outcome        → Recitation
//!        └─ utterance wait       → Translation
//!
//! SharedSnapshot (Arc<Mutex<PlaybackSnapshot>>) ←── current_state()
//! SubscriberRegistry                            ←── subscribe()
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use verse_player::chapter::Chapter;
//! use verse_player::config::AppConfig;
//! use verse_player::media::StreamingBackend;
//! use verse_player::playback::{PlaybackEngine, PlaybackState};
//! use verse_player::resolver::{ReciterCatalog, SourceResolver};
//! use verse_player::speech::CaptionSynthesizer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let chapter = Chapter::load_from("chapters/001.json".as_ref())?;
//!
//!     let backend = Arc::new(StreamingBackend::from_config(&config.network));
//!     let catalog = ReciterCatalog::from_config(&config.resolver)?;
//!     let engine = PlaybackEngine::new(
//!         SourceResolver::new(backend, catalog),
//!         Arc::new(CaptionSynthesizer::stdout()),
//!         config.engine_options(),
//!     );
//!
//!     let _sub = engine.subscribe(|snap| {
//!         if snap.state == PlaybackState::Finished {
//!             println!("done");
//!         }
//!     });
//!     engine.play_chapter_from_start(chapter, config.reciter_id()).await?;
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod session;
pub mod state;
pub mod subscribers;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use engine::{EngineError, EngineOptions, PlaybackEngine};
pub use session::SequenceMode;
pub use state::{
    new_shared_snapshot, PlaybackError, PlaybackSnapshot, PlaybackState, SharedSnapshot,
    TranslationPolicy,
};
pub use subscribers::{Listener, SubscriberRegistry, Subscription};
