//! Observer registry for playback snapshots.
//!
//! Listeners are called synchronously, in subscription order, on the engine
//! task.  The registry lock is released before any listener runs, so a
//! listener may subscribe or unsubscribe (itself included) without
//! deadlocking; the change takes effect from the next notification.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::playback::state::PlaybackSnapshot;

/// A snapshot listener.
pub type Listener = Arc<dyn Fn(&PlaybackSnapshot) + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Cheap to clone; clones share the same listener list.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PlaybackSnapshot) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `snapshot` to every current listener.
    pub fn notify(&self, snapshot: &PlaybackSnapshot) {
        let listeners: Vec<Listener> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(snapshot);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.lock().listeners.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returned by `subscribe`; call [`unsubscribe`](Self::unsubscribe) to stop
/// receiving snapshots.  Dropping it leaves the listener registered.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.registry.upgrade() {
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::state::PlaybackState;

    fn snap(verse: u32) -> PlaybackSnapshot {
        PlaybackSnapshot::at(PlaybackState::PlayingRecitation, 1, verse)
    }

    #[test]
    fn notifies_in_subscription_order() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            let _ = registry.subscribe(move |s| {
                seen.lock().unwrap().push((tag, s.verse_number));
            });
        }

        registry.notify(&snap(3));
        assert_eq!(*seen.lock().unwrap(), vec![("a", Some(3)), ("b", Some(3))]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(Mutex::new(0));

        let c = Arc::clone(&count);
        let sub = registry.subscribe(move |_| *c.lock().unwrap() += 1);

        registry.notify(&snap(1));
        sub.unsubscribe();
        registry.notify(&snap(2));

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn listener_may_subscribe_during_notify() {
        let registry = SubscriberRegistry::new();
        let inner_registry = registry.clone();

        let _ = registry.subscribe(move |_| {
            let _ = inner_registry.subscribe(|_| {});
        });

        registry.notify(&snap(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unsubscribe_after_registry_dropped_is_harmless() {
        let registry = SubscriberRegistry::new();
        let sub = registry.subscribe(|_| {});
        drop(registry);
        sub.unsubscribe();
    }

    #[test]
    fn clear_removes_all() {
        let registry = SubscriberRegistry::new();
        let _ = registry.subscribe(|_| {});
        let _ = registry.subscribe(|_| {});
        registry.clear();
        assert_eq!(registry.len(), 0);
    }
}
