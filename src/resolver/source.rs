//! Ordered fallback across candidate recitation sources.
//!
//! ```text
//! candidates(verse, reciter) = [primary, alternate₁, alternate₂, …]
//!   for each candidate, in order:
//!     timeout(open + start) ─ Ok  ─▶ return handle
//!                           ├ Err ─▶ next candidate
//!                           └ elapsed ─▶ next candidate
//!   all failed ─▶ ResolveError::Exhausted
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::chapter::VerseRef;
use crate::media::{MediaBackend, MediaError, OpenedMedia};
use crate::resolver::catalog::{ReciterCatalog, ReciterId};

// ---------------------------------------------------------------------------
// ResolveError
// ---------------------------------------------------------------------------

/// Failure to obtain a playable handle for a verse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Every candidate source failed to open or start.
    #[error("no playable source for {chapter}:{verse} after {attempts} attempts")]
    Exhausted {
        chapter: u32,
        verse: u32,
        attempts: usize,
    },
}

// ---------------------------------------------------------------------------
// SourceResolver
// ---------------------------------------------------------------------------

/// Produces a started media handle for a verse, trying candidates in order.
pub struct SourceResolver {
    backend: Arc<dyn MediaBackend>,
    catalog: ReciterCatalog,
}

impl SourceResolver {
    pub fn new(backend: Arc<dyn MediaBackend>, catalog: ReciterCatalog) -> Self {
        Self { backend, catalog }
    }

    /// Return the first candidate that opens and starts within `timeout`.
    ///
    /// A handle that opens but refuses to start counts as a failed candidate
    /// and is released before moving on.  The caller owns the returned
    /// handle.  Dropping the returned future mid-attempt releases whatever
    /// the in-flight attempt had opened.
    pub async fn resolve(
        &self,
        verse: &VerseRef,
        reciter: &ReciterId,
        timeout: Duration,
    ) -> Result<OpenedMedia, ResolveError> {
        let candidates = self.catalog.candidates(verse, reciter);
        let total = candidates.len();

        for (index, locator) in candidates.iter().enumerate() {
            log::debug!(
                "resolver: {}:{} candidate {}/{total} {locator}",
                verse.chapter_id(),
                verse.number(),
                index + 1
            );

            match tokio::time::timeout(timeout, self.attempt(locator)).await {
                Ok(Ok(media)) => return Ok(media),
                Ok(Err(e)) => {
                    log::warn!("resolver: candidate {locator} failed: {e}");
                }
                Err(_) => {
                    log::warn!(
                        "resolver: candidate {locator} timed out after {} ms",
                        timeout.as_millis()
                    );
                }
            }
        }

        Err(ResolveError::Exhausted {
            chapter: verse.chapter_id(),
            verse: verse.number(),
            attempts: total,
        })
    }

    async fn attempt(&self, locator: &str) -> Result<OpenedMedia, MediaError> {
        let mut media = self.backend.open(locator).await?;
        if let Err(e) = media.handle.start() {
            media.handle.stop();
            return Err(e);
        }
        Ok(media)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapter::AudioLocator;
    use crate::media::{MockBackend, MockBehavior, MockCall};
    use crate::resolver::catalog::Reciter;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn catalog() -> ReciterCatalog {
        ReciterCatalog::new(
            ReciterId::new("qari"),
            vec![Reciter {
                id: ReciterId::new("qari"),
                name: "Qari".into(),
                mirrors: vec![
                    "primary/{number}".into(),
                    "secondary/{number}".into(),
                    "tertiary/{number}".into(),
                ],
            }],
        )
        .unwrap()
    }

    fn verse() -> VerseRef {
        VerseRef::new(1, 2, AudioLocator::new(2), None)
    }

    fn resolver(backend: &MockBackend) -> SourceResolver {
        SourceResolver::new(Arc::new(backend.clone()), catalog())
    }

    #[tokio::test]
    async fn first_candidate_wins() {
        let backend = MockBackend::new();
        let media = resolver(&backend)
            .resolve(&verse(), &ReciterId::new("qari"), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(media.handle.locator(), "primary/2");
        assert_eq!(
            backend.calls(),
            vec![MockCall::Open("primary/2".into()), MockCall::Start("primary/2".into())]
        );
    }

    #[tokio::test]
    async fn falls_through_to_tertiary() {
        let backend = MockBackend::new();
        backend.set("primary/2", MockBehavior::FailOpen);
        backend.set("secondary/2", MockBehavior::FailOpen);

        let media = resolver(&backend)
            .resolve(&verse(), &ReciterId::new("qari"), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(media.handle.locator(), "tertiary/2");
        assert_eq!(backend.started(), vec!["tertiary/2".to_string()]);
    }

    #[tokio::test]
    async fn timeout_advances_to_next_candidate() {
        let backend = MockBackend::new();
        backend.set("primary/2", MockBehavior::Hang);

        let media = resolver(&backend)
            .resolve(&verse(), &ReciterId::new("qari"), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(media.handle.locator(), "secondary/2");
    }

    #[tokio::test]
    async fn start_failure_counts_as_candidate_failure() {
        let backend = MockBackend::new();
        backend.set("primary/2", MockBehavior::FailStart);

        let media = resolver(&backend)
            .resolve(&verse(), &ReciterId::new("qari"), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(media.handle.locator(), "secondary/2");
        assert!(backend.calls().contains(&MockCall::Stop("primary/2".into())));
    }

    #[tokio::test]
    async fn exhausted_after_every_candidate_fails() {
        let backend = MockBackend::with_default(MockBehavior::FailOpen);
        backend.set("secondary/2", MockBehavior::Hang);

        let err = resolver(&backend)
            .resolve(&verse(), &ReciterId::new("qari"), TIMEOUT)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::Exhausted {
                chapter: 1,
                verse: 2,
                attempts: 3
            }
        );
        assert!(backend.started().is_empty());
    }

    #[tokio::test]
    async fn unknown_reciter_falls_back_to_default() {
        let backend = MockBackend::new();
        let media = resolver(&backend)
            .resolve(&verse(), &ReciterId::new("unknown"), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(media.handle.locator(), "primary/2");
    }
}
