//! HTTP-backed [`MediaBackend`] built on `reqwest`.
//!
//! A handle counts as *opened* once the mirror answers with a 2xx status and
//! a non-HTML content type.  Starting the handle spawns a task that consumes
//! the response body; the handle reports [`MediaOutcome::Finished`] when the
//! body is exhausted and [`MediaOutcome::Failed`] on a transfer error.
//!
//! The backend does not decode audio.  It drives the transfer of each
//! recitation resource exactly as a platform player would pull it, which is
//! what the headless binary needs to validate mirrors and sequence a chapter
//! end to end.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::NetworkConfig;
use crate::media::handle::{
    HandleId, MediaBackend, MediaError, MediaHandle, MediaOutcome, OpenedMedia,
};

// ---------------------------------------------------------------------------
// StreamingBackend
// ---------------------------------------------------------------------------

/// Opens recitation audio over HTTP(S).
pub struct StreamingBackend {
    client: reqwest::Client,
}

impl StreamingBackend {
    /// Build a backend from network settings.
    ///
    /// A default client is used as a last-resort fallback if the builder
    /// fails.
    pub fn from_config(config: &NetworkConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }
}

#[async_trait]
impl MediaBackend for StreamingBackend {
    async fn open(&self, locator: &str) -> Result<OpenedMedia, MediaError> {
        let response = self.client.get(locator).send().await?.error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if content_type.starts_with("text/html") {
            return Err(MediaError::Open(format!(
                "{locator} returned {content_type} instead of audio"
            )));
        }

        let id = HandleId::next();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (paused, _) = watch::channel(false);

        log::debug!("media: opened {id} ({locator})");

        let handle = StreamingHandle {
            id,
            locator: locator.to_string(),
            response: Some(response),
            outcome: Some(outcome_tx),
            paused,
            task: None,
        };

        Ok(OpenedMedia::new(Box::new(handle), outcome_rx))
    }
}

// ---------------------------------------------------------------------------
// StreamingHandle
// ---------------------------------------------------------------------------

struct StreamingHandle {
    id: HandleId,
    locator: String,
    response: Option<reqwest::Response>,
    outcome: Option<oneshot::Sender<MediaOutcome>>,
    paused: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl MediaHandle for StreamingHandle {
    fn id(&self) -> HandleId {
        self.id
    }

    fn locator(&self) -> &str {
        &self.locator
    }

    fn start(&mut self) -> Result<(), MediaError> {
        let (response, outcome) = match (self.response.take(), self.outcome.take()) {
            (Some(response), Some(outcome)) => (response, outcome),
            _ => return Err(MediaError::Start(format!("handle {} already started", self.id))),
        };

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MediaError::Start(e.to_string()))?;

        let paused = self.paused.subscribe();
        self.task = Some(runtime.spawn(consume(self.id, response, paused, outcome)));
        Ok(())
    }

    fn pause(&mut self) {
        self.paused.send_replace(true);
    }

    fn resume(&mut self) {
        self.paused.send_replace(false);
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.response = None;
        self.outcome = None;
    }
}

impl Drop for StreamingHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pull the body to completion, holding while paused.
async fn consume(
    id: HandleId,
    mut response: reqwest::Response,
    mut paused: watch::Receiver<bool>,
    outcome: oneshot::Sender<MediaOutcome>,
) {
    let mut received: usize = 0;

    let result = loop {
        if paused.wait_for(|p| !*p).await.is_err() {
            // Handle dropped while paused.
            return;
        }
        match response.chunk().await {
            Ok(Some(chunk)) => received += chunk.len(),
            Ok(None) => break MediaOutcome::Finished,
            Err(e) => break MediaOutcome::Failed(e.to_string()),
        }
    };

    log::debug!("media: {id} done after {received} bytes ({result:?})");
    let _ = outcome.send(result);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
