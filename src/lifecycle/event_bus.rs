//! Subscribe/unsubscribe + snapshot-on-emit dispatch for `StateChangeEvent`.
//!
//! Listener lists are immutable snapshots (`Arc<Vec<_>>`): subscribing or
//! unsubscribing swaps in a new snapshot rather than mutating in place, so
//! a dispatch already in flight always iterates the list it captured at
//! emit time — late subscribers don't see events emitted before they
//! joined, and unsubscribing mid-dispatch doesn't skip anyone already
//! being notified.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::error;

use super::StateChangeEvent;

pub type Listener = Arc<dyn Fn(&StateChangeEvent) + Send + Sync>;

pub struct StateEventBus {
    listeners: RwLock<Arc<Vec<(u64, Listener)>>>,
    next_id: AtomicU64,
}

/// A handle returned by `subscribe`; drop it or pass it to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

impl StateEventBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub async fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.listeners.write().await;
        let mut next: Vec<(u64, Listener)> = guard.as_ref().clone();
        next.push((id, listener));
        *guard = Arc::new(next);
        SubscriptionId(id)
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) {
        let mut guard = self.listeners.write().await;
        let next: Vec<(u64, Listener)> = guard
            .as_ref()
            .iter()
            .filter(|(lid, _)| *lid != id.0)
            .cloned()
            .collect();
        *guard = Arc::new(next);
    }

    /// Dispatch to a snapshot of listeners taken at call time. Listener
    /// panics/exceptions are caught and logged, never propagated — the
    /// FSM must never fail because a subscriber misbehaves.
    pub async fn emit(&self, event: &StateChangeEvent) {
        let snapshot = Arc::clone(&*self.listeners.read().await);
        for (_, listener) in snapshot.iter() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(event);
            }));
            if let Err(panic) = result {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(agent_id = %event.agent_id, panic = %msg, "state bus listener panicked");
            }
        }
    }

    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }
}

impl Default for StateEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{LifecycleState, TransitionReason};
    use std::sync::atomic::AtomicUsize;

    fn sample_event() -> StateChangeEvent {
        StateChangeEvent {
            agent_id: "a1".into(),
            previous_state: LifecycleState::Spawning,
            new_state: LifecycleState::Initializing,
            reason: TransitionReason::SpawnStarted,
            timestamp: chrono::Utc::now(),
            correlation_id: None,
            error: None,
        }
    }

    #[tokio::test]
    async fn subscribe_then_unsubscribe_restores_prior_contents() {
        let bus = StateEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c2 = Arc::clone(&count);
        let id = bus
            .subscribe(Arc::new(move |_| {
                c2.fetch_add(1, Ordering::SeqCst);
            }))
            .await;

        bus.emit(&sample_event()).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        bus.unsubscribe(id).await;
        bus.emit(&sample_event()).await;
        assert_eq!(count.load(Ordering::SeqCst), 1, "unsubscribed listener must not fire");
        assert_eq!(bus.listener_count().await, 0);
    }

    #[tokio::test]
    async fn listener_panic_does_not_propagate() {
        let bus = StateEventBus::new();
        bus.subscribe(Arc::new(|_| panic!("boom"))).await;
        // Must not panic the caller.
        bus.emit(&sample_event()).await;
    }

    #[tokio::test]
    async fn subscribing_during_dispatch_does_not_affect_in_flight_emit() {
        let bus = Arc::new(StateEventBus::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let bus_clone = Arc::clone(&bus);
        let seen_clone = Arc::clone(&seen);
        bus.subscribe(Arc::new(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
            // Attempting to subscribe from within a listener must not
            // affect the snapshot already being iterated.
            let bus_inner = Arc::clone(&bus_clone);
            tokio::spawn(async move {
                bus_inner.subscribe(Arc::new(|_| {})).await;
            });
        }))
        .await;

        bus.emit(&sample_event()).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
