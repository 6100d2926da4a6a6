//! Message envelopes and reply channels.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

// Layer 3: Internal crate imports
use crate::address::Address;
use crate::events::LifecycleEvent;
use crate::reference::ChildRef;
use crate::util::MessageId;

/// A user message in transit to an actor's mailbox, carrying provenance
/// and an optional reply channel for `ask` exchanges.
///
/// `R` is the concrete reply type of the target actor. Because an
/// [`crate::reference::ActorRef`] is generic over one concrete `Actor`
/// implementation, the reply channel is a statically-typed `oneshot`
/// rather than a serialized byte channel — no serde round-trip is
/// needed on the hot path.
pub struct Envelope<M, R> {
    pub id: MessageId,
    pub payload: M,
    pub sender: Option<Address>,
    pub reply_to: Option<oneshot::Sender<Reply<R>>>,
    pub timestamp: DateTime<Utc>,
}

impl<M, R> Envelope<M, R> {
    pub fn tell(payload: M, sender: Option<Address>) -> Self {
        Self {
            id: MessageId::new(),
            payload,
            sender,
            reply_to: None,
            timestamp: Utc::now(),
        }
    }

    pub fn ask(payload: M, sender: Option<Address>) -> (Self, oneshot::Receiver<Reply<R>>) {
        let (tx, rx) = oneshot::channel();
        let envelope = Self {
            id: MessageId::new(),
            payload,
            sender,
            reply_to: Some(tx),
            timestamp: Utc::now(),
        };
        (envelope, rx)
    }

    pub fn expects_reply(&self) -> bool {
        self.reply_to.is_some()
    }
}

impl<M: fmt::Debug, R> fmt::Debug for Envelope<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .field("sender", &self.sender)
            .field("timestamp", &self.timestamp)
            .field("expects_reply", &self.expects_reply())
            .finish()
    }
}

/// The outcome of an `ask` exchange: either the actor's typed reply value
/// or a description of the failure that prevented one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Reply<R> {
    Value(R),
    Error(ActorFailure),
}

/// A serialized description of why an actor failed to produce a reply,
/// carried as a plain message string rather than a live `dyn Error`
/// across a oneshot boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorFailure {
    pub message: String,
}

impl ActorFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ActorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActorFailure {}

/// Internal mailbox unit: a user envelope, the distinguished STOP
/// marker, an escalated failure injected by a child's ESCALATE
/// decision, or a termination notice for a watched actor. All four
/// enter the same FIFO queue and are dequeued in send order.
pub enum MailboxItem<M, R> {
    Message(Envelope<M, R>),
    Stop,
    Escalated(ChildRef, String),
    Terminated(LifecycleEvent),
}

impl<M, R> MailboxItem<M, R> {
    pub fn is_stop(&self) -> bool {
        matches!(self, MailboxItem::Stop)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn tell_envelope_has_no_reply_channel() {
        let envelope: Envelope<&str, ()> = Envelope::tell("payload", None);
        assert!(!envelope.expects_reply());
    }

    #[test]
    fn ask_envelope_carries_reply_channel() {
        let (envelope, _rx): (Envelope<&str, ()>, _) = Envelope::ask("payload", None);
        assert!(envelope.expects_reply());
    }

    #[test]
    fn mailbox_item_distinguishes_stop() {
        let stop: MailboxItem<&str, ()> = MailboxItem::Stop;
        let msg: MailboxItem<&str, ()> = MailboxItem::Message(Envelope::tell("x", None));
        assert!(stop.is_stop());
        assert!(!msg.is_stop());
    }

    #[test]
    fn actor_failure_displays_its_message() {
        let failure = ActorFailure::new("boom");
        assert_eq!(failure.to_string(), "boom");
    }
}
