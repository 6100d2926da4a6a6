//! Mailbox error types and the cross-cutting control surface.

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal crate imports
use crate::events::LifecycleEvent;
use crate::reference::ChildRef;

/// Failure modes for mailbox operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("mailbox is full (capacity {capacity})")]
    Full { capacity: usize },
    #[error("mailbox is closed")]
    Closed,
}

/// Object-safe control surface over a mailbox, independent of the
/// message type `M` it carries. Used by the lifecycle manager to signal
/// STOP or force-close a child's mailbox without being generic over
/// every actor's message type.
pub trait MailboxControl: Send + Sync {
    /// Enqueue the STOP marker as an ordinary item, honoring FIFO order.
    fn enqueue_stop(&self) -> Result<(), MailboxError>;

    /// Enqueue an escalated failure, delivered to the target's own loop
    /// as an ordinary item so it is handled through that actor's own
    /// supervision policy.
    fn enqueue_escalation(&self, child: ChildRef, message: String) -> Result<(), MailboxError>;

    /// Enqueue a watch notification, delivered to a watcher's own loop
    /// as an ordinary item ahead of its next `receive`, rather than
    /// through a side channel the watcher must separately await.
    fn enqueue_watch_notification(&self, event: LifecycleEvent) -> Result<(), MailboxError>;

    /// Close the mailbox immediately, discarding anything still queued.
    fn force_close(&self);

    /// Number of items currently queued.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
