//! In-process event bus: a bounded ring buffer plus live subscription.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

// Layer 3: Internal crate imports
use crate::events::types::LifecycleEvent;

/// An event tagged with its position in the bus's monotonic sequence,
/// used by [`EventBus::wait_for_event`] to resume after a known point
/// without missing or re-delivering events.
#[derive(Debug, Clone)]
pub struct IndexedEvent {
    pub index: u64,
    pub event: LifecycleEvent,
}

/// Fan-out point for lifecycle events: callers can replay the ring
/// buffer via [`EventBus::snapshot`], subscribe for live events via
/// [`EventBus::subscribe`], or block for a specific kind via
/// [`EventBus::wait_for_event`]. Persistence backends subscribe like
/// any other observer.
pub struct EventBus {
    ring: Mutex<VecDeque<IndexedEvent>>,
    capacity: usize,
    next_index: AtomicU64,
    sender: broadcast::Sender<IndexedEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(16));
        Self {
            ring: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            next_index: AtomicU64::new(0),
            sender,
        }
    }

    pub fn publish(&self, event: LifecycleEvent) {
        debug!(actor = %event.actor, "lifecycle event");
        let index = self.next_index.fetch_add(1, Ordering::AcqRel);
        let indexed = IndexedEvent { index, event };
        {
            let mut ring = self.ring.lock();
            if ring.len() >= self.capacity {
                ring.pop_front();
            }
            ring.push_back(indexed.clone());
        }
        // No active subscribers is not an error; events are still in the ring.
        let _ = self.sender.send(indexed);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IndexedEvent> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> Vec<LifecycleEvent> {
        self.ring.lock().iter().map(|indexed| indexed.event.clone()).collect()
    }

    /// Blocks until an event whose [`LifecycleEventKind::tag`] matches
    /// `kind` is observed at or after `start_index` (the whole ring, if
    /// `None`). Checks the ring first so an event published before the
    /// call still satisfies it, then falls back to live subscription.
    pub async fn wait_for_event(&self, kind: &str, start_index: Option<u64>) -> IndexedEvent {
        let floor = start_index.unwrap_or(0);
        {
            let ring = self.ring.lock();
            if let Some(found) = ring
                .iter()
                .find(|indexed| indexed.index >= floor && indexed.event.kind.tag() == kind)
            {
                return found.clone();
            }
        }

        let mut rx = self.sender.subscribe();
        loop {
            match rx.recv().await {
                Ok(indexed) if indexed.index >= floor && indexed.event.kind.tag() == kind => {
                    return indexed;
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    // The sender lives as long as `self`; unreachable in practice.
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }
}
