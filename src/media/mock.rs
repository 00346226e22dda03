//! Scriptable [`MediaBackend`] for tests.
//!
//! Each locator can be given a [`MockBehavior`]; every call made on the
//! backend and its handles is recorded as a [`MockCall`] so tests can assert
//! on ordering and on resource release.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::media::handle::{
    HandleId, MediaBackend, MediaError, MediaHandle, MediaOutcome, OpenedMedia,
};

/// How the mock reacts to a given locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Open succeeds; the handle reports `Finished` as soon as it starts.
    Finish,
    /// Open succeeds; the test completes the handle with
    /// [`MockBackend::finish`] or [`MockBackend::fail`].
    Manual,
    /// Open fails immediately.
    FailOpen,
    /// Open never completes (exercises the per-candidate timeout).
    Hang,
    /// Open succeeds but `start` fails.
    FailStart,
}

/// A recorded interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Open(String),
    Start(String),
    Pause(String),
    Resume(String),
    Stop(String),
}

struct MockInner {
    behaviors: HashMap<String, MockBehavior>,
    fallback: MockBehavior,
    calls: Vec<MockCall>,
    pending: HashMap<String, oneshot::Sender<MediaOutcome>>,
}

/// Cheap to clone; clones share the same script and call log.
#[derive(Clone)]
pub struct MockBackend {
    inner: Arc<Mutex<MockInner>>,
}

impl MockBackend {
    /// Every locator finishes immediately unless scripted otherwise.
    pub fn new() -> Self {
        Self::with_default(MockBehavior::Finish)
    }

    pub fn with_default(fallback: MockBehavior) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                behaviors: HashMap::new(),
                fallback,
                calls: Vec::new(),
                pending: HashMap::new(),
            })),
        }
    }

    pub fn set(&self, locator: impl Into<String>, behavior: MockBehavior) {
        self.inner
            .lock()
            .unwrap()
            .behaviors
            .insert(locator.into(), behavior);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Locators that were successfully started, in order.
    pub fn started(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Start(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    /// Complete a `Manual` handle with `Finished`.  Returns `false` when no
    /// started handle is waiting on `locator`.
    pub fn finish(&self, locator: &str) -> bool {
        self.complete(locator, MediaOutcome::Finished)
    }

    /// Complete a `Manual` handle with `Failed`.
    pub fn fail(&self, locator: &str, reason: &str) -> bool {
        self.complete(locator, MediaOutcome::Failed(reason.into()))
    }

    fn complete(&self, locator: &str, outcome: MediaOutcome) -> bool {
        let sender = self.inner.lock().unwrap().pending.remove(locator);
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    fn record(&self, call: MockCall) {
        self.inner.lock().unwrap().calls.push(call);
    }

    fn behavior(&self, locator: &str) -> MockBehavior {
        let inner = self.inner.lock().unwrap();
        inner.behaviors.get(locator).copied().unwrap_or(inner.fallback)
    }
}

#[async_trait]
impl MediaBackend for MockBackend {
    async fn open(&self, locator: &str) -> Result<OpenedMedia, MediaError> {
        self.record(MockCall::Open(locator.to_string()));

        let behavior = self.behavior(locator);
        match behavior {
            MockBehavior::FailOpen => return Err(MediaError::Open(format!("{locator}: 404"))),
            MockBehavior::Hang => std::future::pending::<()>().await,
            _ => {}
        }

        let (tx, rx) = oneshot::channel();
        let handle = MockHandle {
            id: HandleId::next(),
            locator: locator.to_string(),
            behavior,
            outcome: Some(tx),
            backend: self.clone(),
        };
        Ok(OpenedMedia::new(Box::new(handle), rx))
    }
}

struct MockHandle {
    id: HandleId,
    locator: String,
    behavior: MockBehavior,
    outcome: Option<oneshot::Sender<MediaOutcome>>,
    backend: MockBackend,
}

impl MediaHandle for MockHandle {
    fn id(&self) -> HandleId {
        self.id
    }

    fn locator(&self) -> &str {
        &self.locator
    }

    fn start(&mut self) -> Result<(), MediaError> {
        if self.behavior == MockBehavior::FailStart {
            return Err(MediaError::Start(format!("{}: undecodable", self.locator)));
        }
        self.backend.record(MockCall::Start(self.locator.clone()));

        if let Some(tx) = self.outcome.take() {
            match self.behavior {
                MockBehavior::Manual => {
                    self.backend
                        .inner
                        .lock()
                        .unwrap()
                        .pending
                        .insert(self.locator.clone(), tx);
                }
                _ => {
                    let _ = tx.send(MediaOutcome::Finished);
                }
            }
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.backend.record(MockCall::Pause(self.locator.clone()));
    }

    fn resume(&mut self) {
        self.backend.record(MockCall::Resume(self.locator.clone()));
    }

    fn stop(&mut self) {
        self.backend.record(MockCall::Stop(self.locator.clone()));
        self.outcome = None;
    }
}
