//! Bounded FIFO mailbox: single consumer, multiple producers, backed by
//! a `tokio::sync::mpsc` channel.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio::sync::mpsc;

// Layer 3: Internal crate imports
use crate::envelope::MailboxItem;
use crate::mailbox::traits::{MailboxControl, MailboxError};

/// Creates a bounded mailbox with the given capacity, returning the
/// sender half (cloneable, given to every [`crate::reference::ActorRef`]
/// pointing at the actor) and the receiver half (owned solely by the
/// actor's own loop).
pub fn bounded<M, R>(capacity: usize) -> (BoundedMailboxSender<M, R>, BoundedMailboxReceiver<M, R>)
where
    M: Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    let len = Arc::new(AtomicUsize::new(0));
    let force_closed = Arc::new(AtomicBool::new(false));
    let sender = BoundedMailboxSender {
        tx,
        capacity,
        len: len.clone(),
        force_closed: force_closed.clone(),
    };
    let receiver = BoundedMailboxReceiver {
        rx,
        len,
        force_closed,
    };
    (sender, receiver)
}

/// Producer handle into an actor's mailbox. Cheap to clone; every clone
/// shares the same underlying channel and length counter.
#[derive(Clone)]
pub struct BoundedMailboxSender<M, R> {
    tx: mpsc::Sender<MailboxItem<M, R>>,
    capacity: usize,
    len: Arc<AtomicUsize>,
    force_closed: Arc<AtomicBool>,
}

impl<M, R> BoundedMailboxSender<M, R>
where
    M: Send + 'static,
    R: Send + 'static,
{
    /// Enqueue an item, returning `Full` if the channel applies
    /// backpressure rather than blocking the caller.
    pub fn try_send(&self, item: MailboxItem<M, R>) -> Result<(), MailboxError> {
        if self.force_closed.load(Ordering::Acquire) {
            return Err(MailboxError::Closed);
        }
        self.tx.try_send(item).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => MailboxError::Full {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => MailboxError::Closed,
        })?;
        self.len.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Enqueue an item, waiting for room if the mailbox is momentarily full.
    pub async fn send(&self, item: MailboxItem<M, R>) -> Result<(), MailboxError> {
        if self.force_closed.load(Ordering::Acquire) {
            return Err(MailboxError::Closed);
        }
        self.tx
            .send(item)
            .await
            .map_err(|_| MailboxError::Closed)?;
        self.len.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed() || self.force_closed.load(Ordering::Acquire)
    }
}

impl<M, R> MailboxControl for BoundedMailboxSender<M, R>
where
    M: Send + 'static,
    R: Send + 'static,
{
    fn enqueue_stop(&self) -> Result<(), MailboxError> {
        self.try_send(MailboxItem::Stop)
    }

    fn enqueue_escalation(
        &self,
        child: crate::reference::ChildRef,
        message: String,
    ) -> Result<(), MailboxError> {
        self.try_send(MailboxItem::Escalated(child, message))
    }

    fn enqueue_watch_notification(
        &self,
        event: crate::events::LifecycleEvent,
    ) -> Result<(), MailboxError> {
        self.try_send(MailboxItem::Terminated(event))
    }

    /// Marks the mailbox closed immediately; the receiver observes this
    /// on its next poll and stops yielding items even if some remain
    /// queued in the underlying channel.
    fn force_close(&self) {
        self.force_closed.store(true, Ordering::Release);
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }
}

/// Consumer handle owned by the actor's own task loop.
pub struct BoundedMailboxReceiver<M, R> {
    rx: mpsc::Receiver<MailboxItem<M, R>>,
    len: Arc<AtomicUsize>,
    force_closed: Arc<AtomicBool>,
}

impl<M, R> BoundedMailboxReceiver<M, R>
where
    M: Send + 'static,
    R: Send + 'static,
{
    /// Await the next item in FIFO order, including STOP markers.
    /// Returns `None` once the channel is closed and drained, or once
    /// a sender has force-closed the mailbox, discarding anything
    /// still queued.
    pub async fn recv(&mut self) -> Option<MailboxItem<M, R>> {
        if self.force_closed.load(Ordering::Acquire) {
            self.rx.close();
            return None;
        }
        let item = self.rx.recv().await;
        if item.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
        item
    }

    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::envelope::Envelope;

    #[tokio::test]
    async fn delivers_in_fifo_order_including_stop() {
        let (tx, mut rx) = bounded::<&str, ()>(4);
        tx.send(MailboxItem::Message(Envelope::tell("a", None)))
            .await
            .expect("send a");
        tx.send(MailboxItem::Message(Envelope::tell("b", None)))
            .await
            .expect("send b");
        tx.send(MailboxItem::Stop).await.expect("send stop");

        match rx.recv().await {
            Some(MailboxItem::Message(env)) => assert_eq!(env.payload, "a"),
            _ => panic!("expected message a"),
        }
        match rx.recv().await {
            Some(MailboxItem::Message(env)) => assert_eq!(env.payload, "b"),
            _ => panic!("expected message b"),
        }
        assert!(matches!(rx.recv().await, Some(MailboxItem::Stop)));
    }

    #[tokio::test]
    async fn try_send_reports_full_at_capacity() {
        let (tx, _rx) = bounded::<&str, ()>(1);
        tx.try_send(MailboxItem::Message(Envelope::tell("a", None)))
            .expect("first send fits");
        let err = tx
            .try_send(MailboxItem::Message(Envelope::tell("b", None)))
            .unwrap_err();
        assert_eq!(err, MailboxError::Full { capacity: 1 });
    }

    #[tokio::test]
    async fn len_tracks_outstanding_items() {
        let (tx, mut rx) = bounded::<&str, ()>(4);
        tx.send(MailboxItem::Message(Envelope::tell("a", None)))
            .await
            .expect("send");
        assert_eq!(tx.len(), 1);
        rx.recv().await;
        assert_eq!(tx.len(), 0);
    }
}
