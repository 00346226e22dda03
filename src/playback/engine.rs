//! Playback engine. Drives verse-by-verse recitation with optional
//! translation interleave.
//!
//! [`PlaybackEngine`] is a cheap-to-clone handle.  All control operations are
//! sent as commands over a `tokio::sync::mpsc` channel to a single engine
//! task, which owns the [`PlaybackSession`] and is therefore the only place
//! the per-verse loop ever runs.
//!
//! # Verse loop
//!
//! ```text
//! Resolving      spawn(resolver.resolve(verse))      ─▶ EngineEvent::Resolved
//!   ├─ Ok(handle) → PlayingRecitation, forward handle outcome
//!   └─ Exhausted  → Idle + PlaybackError::NoPlayableSource
//! PlayingRecitation                                  ─▶ EngineEvent::Recitation
//!   ├─ Finished + translation → PlayingTranslation   ─▶ EngineEvent::Translation
//!   ├─ Finished               → advance
//!   └─ Failed                 → Idle + PlaybackError::MediaFailed
//! PlayingTranslation  done or failed → advance
//! advance: next verse → Resolving | past the end → Finished → Idle
//! ```
//!
//! Every event carries the id of the resource (resolve ticket, media handle
//! or utterance) that produced it.  Events whose id does not match the
//! current stage come from a resource that was already torn down and are
//! dropped.
//!
//! Only `resume` and `stop` leave `Paused`.  A completion for the current
//! resource that arrives while paused is held in the stage; `resume` acts on
//! it and `stop` drops it.

use std::future::Future;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::chapter::{Chapter, VerseRef};
use crate::media::{HandleId, MediaOutcome, OpenedMedia};
use crate::playback::session::{PendingResolve, PlaybackSession, SequenceMode, Stage};
use crate::playback::state::{
    new_shared_snapshot, PlaybackError, PlaybackSnapshot, PlaybackState, SharedSnapshot,
    TranslationPolicy,
};
use crate::playback::subscribers::{SubscriberRegistry, Subscription};
use crate::resolver::{ReciterId, ResolveError, SourceResolver};
use crate::speech::{Narrator, SpeechError, SpeechSynthesizer};

// ---------------------------------------------------------------------------
// EngineError / EngineOptions
// ---------------------------------------------------------------------------

/// Errors returned by the play operations.  Nothing else on the public
/// surface fails: pause, resume and stop are no-ops when they do not apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The chapter has no verses.
    #[error("chapter {0} has no verses")]
    InvalidChapter(u32),

    /// The requested verse is not part of the chapter.
    #[error("verse {verse} is not in chapter {chapter}")]
    VerseNotFound { chapter: u32, verse: u32 },

    /// The engine has been disposed.
    #[error("playback engine is closed")]
    Closed,
}

/// Engine tuning supplied at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Upper bound for opening one candidate source.
    pub candidate_timeout: Duration,
    /// Initial translation policy.
    pub policy: TranslationPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            candidate_timeout: Duration::from_secs(3),
            policy: TranslationPolicy::disabled(),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands and events
// ---------------------------------------------------------------------------

type Reply<T> = oneshot::Sender<T>;

enum Command {
    PlayChapter {
        chapter: Chapter,
        reciter: ReciterId,
        reply: Reply<Result<(), EngineError>>,
    },
    PlayVerse {
        chapter: Chapter,
        verse: u32,
        reciter: ReciterId,
        reply: Reply<Result<(), EngineError>>,
    },
    Pause(Reply<()>),
    Resume(Reply<()>),
    Stop(Reply<()>),
    SetPolicy(TranslationPolicy),
    Shutdown(Reply<()>),
}

/// A completion taken out of a paused stage by `resume`.
enum Completion {
    Recitation(MediaOutcome),
    Translation(Result<(), SpeechError>),
}

enum EngineEvent {
    Resolved {
        ticket: HandleId,
        result: Result<OpenedMedia, ResolveError>,
    },
    Recitation {
        handle: HandleId,
        outcome: MediaOutcome,
    },
    Translation {
        utterance: HandleId,
        result: Result<(), SpeechError>,
    },
}

// ---------------------------------------------------------------------------
// PlaybackEngine
// ---------------------------------------------------------------------------

/// Public control surface of the verse-playback engine.
///
/// Each control method queues its request as soon as it is called; the
/// returned future only waits for the engine to act on it.  A listener can
/// therefore issue `drop(engine.stop())` from inside a snapshot callback and
/// the stop runs right after the current transition completes.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use verse_player::chapter::Chapter;
/// use verse_player::config::AppConfig;
/// use verse_player::media::StreamingBackend;
/// use verse_player::playback::PlaybackEngine;
/// use verse_player::resolver::{ReciterCatalog, SourceResolver};
/// use verse_player::speech::CaptionSynthesizer;
///
/// # async fn example(chapter: Chapter) {
/// let config = AppConfig::default();
/// let backend = Arc::new(StreamingBackend::from_config(&config.network));
/// let resolver = SourceResolver::new(backend, ReciterCatalog::default());
/// let engine = PlaybackEngine::new(
///     resolver,
///     Arc::new(CaptionSynthesizer::stdout()),
///     config.engine_options(),
/// );
///
/// let _sub = engine.subscribe(|snap| println!("{:?}", snap.state));
/// engine.play_chapter_from_start(chapter, config.reciter_id()).await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct PlaybackEngine {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: SharedSnapshot,
    subscribers: SubscriberRegistry,
}

impl PlaybackEngine {
    /// Create the engine and spawn its task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(
        resolver: SourceResolver,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        options: EngineOptions,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let snapshot = new_shared_snapshot();
        let subscribers = SubscriberRegistry::new();

        let actor = EngineActor {
            resolver: Arc::new(resolver),
            narrator: Narrator::new(synthesizer),
            options,
            session: None,
            snapshot: Arc::clone(&snapshot),
            subscribers: subscribers.clone(),
            commands: commands_rx,
            events_tx,
            events_rx,
        };
        tokio::spawn(actor.run());

        Self {
            commands: commands_tx,
            snapshot,
            subscribers,
        }
    }

    /// Play `chapter` from its first verse, advancing automatically.
    ///
    /// Replaces any running session.  Fails with
    /// [`EngineError::InvalidChapter`] before any transition when the chapter
    /// is empty.
    pub fn play_chapter_from_start(
        &self,
        chapter: Chapter,
        reciter: ReciterId,
    ) -> impl Future<Output = Result<(), EngineError>> + Send + 'static {
        let reply = self.request(|reply| Command::PlayChapter {
            chapter,
            reciter,
            reply,
        });
        async move { reply.await.unwrap_or(Err(EngineError::Closed)) }
    }

    /// Play a single verse without advancing afterwards.
    ///
    /// Calling it again for the verse that is currently reciting toggles
    /// pause instead of restarting.
    pub fn play_verse(
        &self,
        chapter: Chapter,
        verse_number: u32,
        reciter: ReciterId,
    ) -> impl Future<Output = Result<(), EngineError>> + Send + 'static {
        let reply = self.request(|reply| Command::PlayVerse {
            chapter,
            verse: verse_number,
            reciter,
            reply,
        });
        async move { reply.await.unwrap_or(Err(EngineError::Closed)) }
    }

    /// Pause the playing recitation or translation.  No-op otherwise.
    pub fn pause(&self) -> impl Future<Output = ()> + Send + 'static {
        let reply = self.request(Command::Pause);
        async move {
            let _ = reply.await;
        }
    }

    /// Resume a paused recitation or translation.  No-op otherwise.
    pub fn resume(&self) -> impl Future<Output = ()> + Send + 'static {
        let reply = self.request(Command::Resume);
        async move {
            let _ = reply.await;
        }
    }

    /// Release any active resource and return to `Idle`.  Always safe.
    pub fn stop(&self) -> impl Future<Output = ()> + Send + 'static {
        let reply = self.request(Command::Stop);
        async move {
            let _ = reply.await;
        }
    }

    /// Policy used from the next verse boundary on.
    pub fn set_translation_policy(&self, policy: TranslationPolicy) {
        let _ = self.commands.send(Command::SetPolicy(policy));
    }

    /// The last published snapshot.
    pub fn current_state(&self) -> PlaybackSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PlaybackSnapshot) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    /// Stop playback, drop all subscribers and end the engine task.
    ///
    /// Afterwards play operations return [`EngineError::Closed`] and the
    /// other operations do nothing.
    pub async fn dispose(&self) {
        let reply = self.request(Command::Shutdown);
        let _ = reply.await;
    }

    fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        // On a closed engine the command (and its reply sender) is dropped,
        // which resolves `rx` with an error.
        let _ = self.commands.send(make(tx));
        rx
    }
}

// ---------------------------------------------------------------------------
// EngineActor
// ---------------------------------------------------------------------------

struct EngineActor {
    resolver: Arc<SourceResolver>,
    narrator: Narrator,
    options: EngineOptions,
    session: Option<PlaybackSession>,
    snapshot: SharedSnapshot,
    subscribers: SubscriberRegistry,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EngineActor {
    async fn run(mut self) {
        log::info!("engine: started");

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.stop();
                        self.subscribers.clear();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        // Every handle dropped without dispose().
                        self.teardown();
                        break;
                    }
                },

                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        log::info!("engine: shut down");
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::PlayChapter {
                chapter,
                reciter,
                reply,
            } => {
                let result = self.play_chapter(chapter, reciter);
                let _ = reply.send(result);
            }
            Command::PlayVerse {
                chapter,
                verse,
                reciter,
                reply,
            } => {
                let result = self.play_verse(chapter, verse, reciter);
                let _ = reply.send(result);
            }
            Command::Pause(reply) => {
                self.pause();
                let _ = reply.send(());
            }
            Command::Resume(reply) => {
                self.resume();
                let _ = reply.send(());
            }
            Command::Stop(reply) => {
                self.stop();
                let _ = reply.send(());
            }
            Command::SetPolicy(policy) => {
                log::debug!("engine: translation policy now {policy:?}");
                self.options.policy = policy;
            }
            Command::Shutdown(reply) => {
                // Handled in run(); kept for exhaustiveness.
                let _ = reply.send(());
            }
        }
    }

    fn play_chapter(&mut self, chapter: Chapter, reciter: ReciterId) -> Result<(), EngineError> {
        if chapter.is_empty() {
            return Err(EngineError::InvalidChapter(chapter.id()));
        }
        self.start_session(chapter, 0, reciter, SequenceMode::Chapter);
        Ok(())
    }

    fn play_verse(
        &mut self,
        chapter: Chapter,
        verse: u32,
        reciter: ReciterId,
    ) -> Result<(), EngineError> {
        if chapter.is_empty() {
            return Err(EngineError::InvalidChapter(chapter.id()));
        }
        let cursor = chapter
            .position_of(verse)
            .ok_or(EngineError::VerseNotFound {
                chapter: chapter.id(),
                verse,
            })?;

        // Same verse already reciting: toggle pause instead of restarting.
        let reciting = self.session.as_ref().and_then(|session| {
            let same_verse = session.chapter.id() == chapter.id()
                && session.current_verse().number() == verse;
            match &session.stage {
                Stage::Reciting { paused, .. } if same_verse => Some(*paused),
                _ => None,
            }
        });
        match reciting {
            Some(false) => {
                self.pause();
                return Ok(());
            }
            Some(true) => {
                self.resume();
                return Ok(());
            }
            None => {}
        }

        self.start_session(chapter, cursor, reciter, SequenceMode::SingleVerse);
        Ok(())
    }

    fn start_session(
        &mut self,
        chapter: Chapter,
        cursor: usize,
        reciter: ReciterId,
        mode: SequenceMode,
    ) {
        if let Some(old) = self.session.take() {
            log::debug!("engine: replacing session for chapter {}", old.chapter.id());
            old.stage.release(&mut self.narrator);
        }

        let pending = self.spawn_resolve(chapter.verses()[cursor].clone(), reciter.clone());
        self.session = Some(PlaybackSession {
            chapter,
            cursor,
            reciter,
            policy: self.options.policy.clone(),
            mode,
            stage: Stage::Resolving(pending),
        });
        self.publish();
    }

    fn pause(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match &mut session.stage {
            Stage::Reciting { handle, paused, .. } if !*paused => {
                handle.pause();
                *paused = true;
            }
            Stage::Translating { paused, .. } if !*paused => {
                self.narrator.pause();
                *paused = true;
            }
            _ => return,
        }
        self.publish();
    }

    /// Leave `Paused`.  A completion held while paused is acted on now
    /// instead of resuming the resource.
    fn resume(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let held = match &mut session.stage {
            Stage::Reciting {
                handle,
                paused,
                held,
            } if *paused => {
                *paused = false;
                let outcome = held.take();
                if outcome.is_none() {
                    handle.resume();
                }
                outcome.map(Completion::Recitation)
            }
            Stage::Translating { paused, held, .. } if *paused => {
                *paused = false;
                let result = held.take();
                if result.is_none() {
                    self.narrator.resume();
                }
                result.map(Completion::Translation)
            }
            _ => return,
        };

        match held {
            Some(Completion::Recitation(outcome)) => self.recitation_ended(outcome),
            Some(Completion::Translation(result)) => self.translation_ended(result),
            None => self.publish(),
        }
    }

    fn stop(&mut self) {
        self.teardown();
        self.publish_snapshot(PlaybackSnapshot::idle());
    }

    /// Release the session's resource without publishing.
    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            log::debug!(
                "engine: stopping {}:{}",
                session.chapter.id(),
                session.current_verse().number()
            );
            session.stage.release(&mut self.narrator);
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Resolved { ticket, result } => self.on_resolved(ticket, result),
            EngineEvent::Recitation { handle, outcome } => self.on_recitation(handle, outcome),
            EngineEvent::Translation { utterance, result } => {
                self.on_translation(utterance, result)
            }
        }
    }

    fn on_resolved(&mut self, ticket: HandleId, result: Result<OpenedMedia, ResolveError>) {
        let current = matches!(
            self.session.as_ref().map(|s| &s.stage),
            Some(Stage::Resolving(pending)) if pending.ticket == ticket
        );
        if !current {
            log::debug!("engine: discarding stale resolve {ticket}");
            if let Ok(mut media) = result {
                media.handle.stop();
            }
            return;
        }

        match result {
            Ok(media) => {
                let OpenedMedia { handle, outcome } = media;
                let id = handle.id();
                log::debug!("engine: recitation {id} from {}", handle.locator());

                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let outcome = outcome.await.unwrap_or_else(|_| {
                        MediaOutcome::Failed("handle released without an outcome".into())
                    });
                    let _ = events.send(EngineEvent::Recitation {
                        handle: id,
                        outcome,
                    });
                });

                if let Some(session) = self.session.as_mut() {
                    session.replace_stage(
                        Stage::Reciting {
                            handle,
                            paused: false,
                            held: None,
                        },
                        &mut self.narrator,
                    );
                }
                self.publish();
            }
            Err(e) => {
                log::error!("engine: {e}");
                self.halt(e.into());
            }
        }
    }

    fn on_recitation(&mut self, id: HandleId, outcome: MediaOutcome) {
        let Some(session) = self.session.as_mut() else {
            log::debug!("engine: discarding outcome of {id}, no session");
            return;
        };
        let paused = match &session.stage {
            Stage::Reciting { handle, paused, .. } if handle.id() == id => *paused,
            _ => {
                log::debug!("engine: discarding stale outcome of {id}");
                return;
            }
        };

        if paused {
            log::debug!("engine: {id} ended while paused, held until resume");
            if let Stage::Reciting { held, .. } = &mut session.stage {
                *held = Some(outcome);
            }
            return;
        }
        self.recitation_ended(outcome);
    }

    fn recitation_ended(&mut self, outcome: MediaOutcome) {
        match outcome {
            MediaOutcome::Finished => self.after_recitation(),
            MediaOutcome::Failed(reason) => {
                let Some(session) = self.session.as_ref() else {
                    return;
                };
                let verse = session.current_verse();
                let error = PlaybackError::MediaFailed {
                    chapter: verse.chapter_id(),
                    verse: verse.number(),
                    reason,
                };
                log::error!("engine: {error}");
                self.halt(error);
            }
        }
    }

    /// Recitation of the current verse finished: speak the translation when
    /// the policy asks for it, otherwise advance.
    fn after_recitation(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let translation = session
            .current_verse()
            .translation()
            .filter(|_| session.policy.enabled)
            .map(|text| (text.to_string(), session.policy.voice_language.clone()));

        let Some((text, language)) = translation else {
            self.advance();
            return;
        };

        match self.narrator.speak(&text, &language) {
            Ok(utterance) => {
                let id = utterance.id;
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let result = utterance.wait().await;
                    let _ = events.send(EngineEvent::Translation {
                        utterance: id,
                        result,
                    });
                });

                if let Some(session) = self.session.as_mut() {
                    session.replace_stage(
                        Stage::Translating {
                            utterance: id,
                            paused: false,
                            held: None,
                        },
                        &mut self.narrator,
                    );
                }
                self.publish();
            }
            Err(e) => {
                log::warn!("speech: {e}; skipping translation");
                self.advance();
            }
        }
    }

    fn on_translation(&mut self, id: HandleId, result: Result<(), SpeechError>) {
        let Some(session) = self.session.as_mut() else {
            log::debug!("engine: discarding utterance {id}, no session");
            return;
        };
        let paused = match &session.stage {
            Stage::Translating {
                utterance, paused, ..
            } if *utterance == id => *paused,
            _ => {
                log::debug!("engine: discarding stale utterance {id}");
                return;
            }
        };

        self.narrator.release(id);
        if paused {
            log::debug!("engine: utterance {id} ended while paused, held until resume");
            if let Stage::Translating { held, .. } = &mut session.stage {
                *held = Some(result);
            }
            return;
        }
        self.translation_ended(result);
    }

    fn translation_ended(&mut self, result: Result<(), SpeechError>) {
        if let Err(e) = result {
            log::warn!("speech: {e}; continuing with next verse");
        }
        self.advance();
    }

    // -----------------------------------------------------------------------
    // Sequencing
    // -----------------------------------------------------------------------

    fn advance(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.at_end() {
            self.finish();
            return;
        }

        session.cursor += 1;
        session.policy = self.options.policy.clone();

        let verse = session.current_verse().clone();
        let reciter = session.reciter.clone();
        let pending = spawn_resolve(
            &self.resolver,
            &self.events_tx,
            self.options.candidate_timeout,
            verse,
            reciter,
        );
        session.replace_stage(Stage::Resolving(pending), &mut self.narrator);
        self.publish();
    }

    fn finish(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let finished = PlaybackSnapshot::at(
            PlaybackState::Finished,
            session.chapter.id(),
            session.current_verse().number(),
        );
        session.stage.release(&mut self.narrator);

        log::info!("engine: chapter {} finished", finished.chapter_id.unwrap_or_default());
        self.publish_snapshot(finished);
        self.publish_snapshot(PlaybackSnapshot::idle());
    }

    /// End the run with a terminal error.
    fn halt(&mut self, error: PlaybackError) {
        let Some(session) = self.session.take() else {
            return;
        };
        let snapshot = PlaybackSnapshot {
            state: PlaybackState::Idle,
            chapter_id: Some(session.chapter.id()),
            verse_number: Some(session.current_verse().number()),
            error: Some(error),
        };
        session.stage.release(&mut self.narrator);
        self.publish_snapshot(snapshot);
    }

    fn spawn_resolve(&self, verse: VerseRef, reciter: ReciterId) -> PendingResolve {
        spawn_resolve(
            &self.resolver,
            &self.events_tx,
            self.options.candidate_timeout,
            verse,
            reciter,
        )
    }

    // -----------------------------------------------------------------------
    // Publishing
    // -----------------------------------------------------------------------

    fn publish(&self) {
        let snapshot = match &self.session {
            Some(session) => session.snapshot(),
            None => PlaybackSnapshot::idle(),
        };
        self.publish_snapshot(snapshot);
    }

    fn publish_snapshot(&self, snapshot: PlaybackSnapshot) {
        log::debug!(
            "engine: → {} ({:?}:{:?})",
            snapshot.state.label(),
            snapshot.chapter_id,
            snapshot.verse_number
        );
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        self.subscribers.notify(&snapshot);
    }
}

fn spawn_resolve(
    resolver: &Arc<SourceResolver>,
    events: &mpsc::UnboundedSender<EngineEvent>,
    timeout: Duration,
    verse: VerseRef,
    reciter: ReciterId,
) -> PendingResolve {
    let ticket = HandleId::next();
    let resolver = Arc::clone(resolver);
    let events = events.clone();

    let task = tokio::spawn(async move {
        let result = resolver.resolve(&verse, &reciter, timeout).await;
        let _ = events.send(EngineEvent::Resolved { ticket, result });
    });

    PendingResolve { ticket, task }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
