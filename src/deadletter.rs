//! Dead-letter queue: messages that could not be delivered.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

// Layer 3: Internal crate imports
use crate::address::Address;
use crate::persistence::PersistenceBackend;

/// A message that could not be delivered to its target, recorded with
/// enough context to diagnose or replay it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub target: Address,
    pub message: String,
    pub expects_reply: bool,
    pub timestamp: DateTime<Utc>,
}

/// Bounded, in-memory dead-letter queue. Oldest entries are evicted
/// first once `capacity` is reached. Forwards every entry to the
/// configured persistence backend, the same way [`crate::events::EventBus`]
/// is fanned out to persistence from [`crate::system::ActorSystem::publish_and_persist`].
pub struct DeadLetterSink {
    capacity: usize,
    entries: Mutex<VecDeque<DeadLetter>>,
    system_id: String,
    persistence: Option<Arc<dyn PersistenceBackend>>,
}

impl DeadLetterSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            system_id: String::new(),
            persistence: None,
        }
    }

    pub fn with_persistence(
        capacity: usize,
        system_id: impl Into<String>,
        persistence: Option<Arc<dyn PersistenceBackend>>,
    ) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            system_id: system_id.into(),
            persistence,
        }
    }

    pub async fn record(&self, letter: DeadLetter) {
        warn!(target = %letter.target, expects_reply = letter.expects_reply, "dead letter recorded");
        {
            let mut entries = self.entries.lock();
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(letter.clone());
        }
        if let Some(backend) = &self.persistence {
            backend.record_dead_letter(&self.system_id, &letter).await;
        }
    }

    pub fn snapshot(&self) -> Vec<DeadLetter> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::util::ActorId;

    fn letter(n: u64) -> DeadLetter {
        DeadLetter {
            target: Address::new("sys", ActorId(n)),
            message: format!("msg-{n}"),
            expects_reply: false,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn evicts_oldest_once_full() {
        let sink = DeadLetterSink::new(2);
        sink.record(letter(1)).await;
        sink.record(letter(2)).await;
        sink.record(letter(3)).await;
        let snapshot = sink.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].message, "msg-2");
        assert_eq!(snapshot[1].message, "msg-3");
    }

    #[tokio::test]
    async fn forwards_to_configured_persistence_backend() {
        use crate::persistence::NdjsonBackend;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dead-letters.ndjson");
        let backend = Arc::new(
            NdjsonBackend::open(&path)
                .await
                .expect("open backend"),
        );
        let sink = DeadLetterSink::with_persistence(4, "sys", Some(backend.clone()));
        sink.record(letter(1)).await;

        let persisted = backend
            .list_dead_letters(None, None)
            .await
            .expect("list dead letters");
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].message, "msg-1");
    }
}
