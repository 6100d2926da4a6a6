// Layer 1: Standard library imports
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 64-bit actor identifier, unique within a system for the lifetime of the
/// process. Stable across restarts of the same runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl ActorId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing generator of [`ActorId`]s, one per actor system.
///
/// # Example
/// ```rust
/// use haven_rt::util::ActorIdGenerator;
///
/// let gen = ActorIdGenerator::new();
/// let a = gen.next();
/// let b = gen.next();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Default)]
pub struct ActorIdGenerator {
    next: AtomicU64,
}

impl ActorIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> ActorId {
        ActorId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Correlation identifier attached to request/reply exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let gen = ActorIdGenerator::new();
        let a = gen.next();
        let b = gen.next();
        assert!(b.get() > a.get());
    }

    #[test]
    fn message_ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn actor_id_display() {
        assert_eq!(ActorId(42).to_string(), "42");
    }
}
