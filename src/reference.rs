//! Typed send capability into an actor's mailbox.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;
use tokio::time::timeout;

// Layer 3: Internal crate imports
use crate::actor::traits::Actor;
use crate::address::Address;
use crate::deadletter::{DeadLetter, DeadLetterSink};
use crate::envelope::{ActorFailure, Envelope, MailboxItem, Reply};
use crate::mailbox::BoundedMailboxSender;
use crate::system::errors::ActorError;

/// A value holding the target's address plus a typed send capability
/// directly into its mailbox. There is no broker or pub/sub indirection:
/// a `Reference` sends straight to the mailbox it was constructed with.
pub struct ActorRef<A: Actor> {
    address: Address,
    sender: BoundedMailboxSender<A::Message, A::Reply>,
    dead_letters: Arc<DeadLetterSink>,
}

impl<A: Actor> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            address: self.address.clone(),
            sender: self.sender.clone(),
            dead_letters: self.dead_letters.clone(),
        }
    }
}

impl<A: Actor> ActorRef<A> {
    pub fn new(
        address: Address,
        sender: BoundedMailboxSender<A::Message, A::Reply>,
        dead_letters: Arc<DeadLetterSink>,
    ) -> Self {
        Self {
            address,
            sender,
            dead_letters,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// True while the target's mailbox is still accepting sends.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Fire-and-forget send. If the target is not alive, or the send
    /// otherwise fails, the message is routed to the dead-letter queue
    /// and `ActorStopped` is returned.
    pub async fn tell(&self, message: A::Message, sender: Option<Address>) -> Result<(), ActorError> {
        if !self.is_alive() {
            self.dead_letters
                .record(DeadLetter {
                    target: self.address.clone(),
                    message: format!("{message:?}"),
                    expects_reply: false,
                    timestamp: chrono::Utc::now(),
                })
                .await;
            return Err(ActorError::ActorStopped(self.address.clone()));
        }

        let description = format!("{message:?}");
        let envelope = Envelope::tell(message, sender);
        if self
            .sender
            .send(MailboxItem::Message(envelope))
            .await
            .is_err()
        {
            self.dead_letters
                .record(DeadLetter {
                    target: self.address.clone(),
                    message: description,
                    expects_reply: false,
                    timestamp: chrono::Utc::now(),
                })
                .await;
            return Err(ActorError::ActorStopped(self.address.clone()));
        }
        Ok(())
    }

    /// Request/reply send: waits up to `timeout_duration` for the
    /// target's reply, or returns `AskTimeout`/`ActorStopped`.
    pub async fn ask(
        &self,
        message: A::Message,
        sender: Option<Address>,
        timeout_duration: Duration,
    ) -> Result<A::Reply, ActorError> {
        let description = format!("{message:?}");
        let (envelope, rx) = Envelope::ask(message, sender);
        if self
            .sender
            .send(MailboxItem::Message(envelope))
            .await
            .is_err()
        {
            self.dead_letters
                .record(DeadLetter {
                    target: self.address.clone(),
                    message: description,
                    expects_reply: true,
                    timestamp: chrono::Utc::now(),
                })
                .await;
            return Err(ActorError::ActorStopped(self.address.clone()));
        }

        match timeout(timeout_duration, rx).await {
            Ok(Ok(Reply::Value(value))) => Ok(value),
            Ok(Ok(Reply::Error(ActorFailure { message }))) => {
                Err(ActorError::User(Box::new(ActorFailure::new(message))))
            }
            Ok(Err(oneshot::error::RecvError { .. })) => {
                Err(ActorError::ActorStopped(self.address.clone()))
            }
            Err(_) => Err(ActorError::AskTimeout(self.address.clone(), timeout_duration)),
        }
    }
}

/// Lightweight, type-erased handle to an actor used where a fully
/// typed [`ActorRef`] would require the caller to know the child's
/// concrete `Actor` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    pub address: Address,
}

impl ChildRef {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::mailbox::bounded;
    use crate::util::ActorId;
    use std::time::Duration;

    struct Echo;

    #[async_trait::async_trait]
    impl Actor for Echo {
        type Message = String;
        type Reply = String;
        type Error = std::convert::Infallible;

        async fn receive(
            &mut self,
            message: Self::Message,
            _ctx: &mut crate::actor::context::ActorContext<Self>,
        ) -> Result<Self::Reply, Self::Error> {
            Ok(message)
        }
    }

    fn test_ref() -> (ActorRef<Echo>, crate::mailbox::BoundedMailboxReceiver<String, String>) {
        let (tx, rx) = bounded::<String, String>(8);
        let dead_letters = Arc::new(DeadLetterSink::new(16));
        let address = Address::new("sys", ActorId(1));
        (ActorRef::new(address, tx, dead_letters), rx)
    }

    #[tokio::test]
    async fn tell_then_ask_roundtrip_via_manual_reply() {
        let (ref_, mut rx) = test_ref();
        let ask_handle = tokio::spawn({
            let ref_ = ref_.clone();
            async move { ref_.ask("hi".to_string(), None, Duration::from_secs(1)).await }
        });

        match rx.recv().await {
            Some(MailboxItem::Message(envelope)) => {
                assert_eq!(envelope.payload, "hi");
                if let Some(reply_to) = envelope.reply_to {
                    let _ = reply_to.send(Reply::Value("hi".to_string()));
                }
            }
            _ => panic!("expected a message"),
        }

        let result = ask_handle.await.expect("task joins").expect("ask succeeds");
        assert_eq!(result, "hi");
    }

    #[tokio::test]
    async fn ask_times_out_when_nobody_replies() {
        let (ref_, _rx) = test_ref();
        let result = ref_
            .ask("hi".to_string(), None, Duration::from_millis(20))
            .await;
        assert!(matches!(result, Err(ActorError::AskTimeout(_, _))));
    }

    #[tokio::test]
    async fn tell_to_dead_actor_routes_to_dead_letters() {
        let (tx, rx) = bounded::<String, String>(1);
        let dead_letters = Arc::new(DeadLetterSink::new(4));
        let address = Address::new("sys", ActorId(2));
        drop(rx);
        let ref_ = ActorRef::<Echo>::new(address, tx, dead_letters.clone());
        let result = ref_.tell("gone".to_string(), None).await;
        assert!(matches!(result, Err(ActorError::ActorStopped(_))));
        assert_eq!(dead_letters.len(), 1);
    }
}
