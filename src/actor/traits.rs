//! The `Actor` trait: user-implemented behavior run by the actor loop.

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal crate imports
use crate::actor::context::ActorContext;
use crate::events::LifecycleEvent;
use crate::reference::ChildRef;
use crate::supervisor::SupervisorDecision;

/// Behavior executed by a single actor's task loop.
///
/// An actor owns exactly one mailbox of `Message` values and produces
/// `Reply` values for `ask` exchanges. `Error` is the actor-defined
/// failure type surfaced to the supervision engine when `receive`
/// returns `Err`.
#[async_trait]
pub trait Actor: Send + Sized + 'static {
    type Message: Send + std::fmt::Debug + 'static;
    type Reply: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Called once before the actor begins consuming its mailbox.
    async fn on_start(&mut self, _ctx: &mut ActorContext<Self>) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handle one message, optionally producing a reply.
    async fn receive(
        &mut self,
        message: Self::Message,
        ctx: &mut ActorContext<Self>,
    ) -> Result<Self::Reply, Self::Error>;

    /// Called once after the actor stops consuming its mailbox, whether
    /// by normal STOP, cascade, or failure.
    async fn on_stop(&mut self, _ctx: &mut ActorContext<Self>) {}

    /// Called on the parent actor before the supervision engine applies
    /// a failing child's own policy, for every child failure, not only
    /// those under an ESCALATE policy. Returning `Some(decision)`
    /// overrides the child's own policy outcome exactly; returning
    /// `None` (the default) lets the child's own policy decide.
    /// `child` is a lightweight, type-erased handle since children may
    /// be of heterogeneous `Actor` types.
    async fn on_child_failure(
        &mut self,
        _child: ChildRef,
        _error: &(dyn std::error::Error + Send + Sync),
        _ctx: &mut ActorContext<Self>,
    ) -> Option<SupervisorDecision> {
        None
    }

    /// Called when an actor this one is watching (via
    /// [`ActorContext::watch`]) terminates, for any reason. Delivered
    /// as an ordinary mailbox item ahead of the next `receive`, not
    /// through a side channel the actor must separately await.
    async fn on_watch_notification(
        &mut self,
        _event: LifecycleEvent,
        _ctx: &mut ActorContext<Self>,
    ) {
    }
}

/// Sugar-only marker advertising that an [`Actor`] receives `M` and
/// replies with `R`. The runtime never inspects this trait or dispatches
/// on it; the actual routing is mailbox-direct through `Actor::Message`.
/// Blanket-implemented for every actor whose associated types already
/// match, so it never needs a manual `impl`.
pub trait Receives<M, R>: Actor<Message = M, Reply = R> {}

impl<A, M, R> Receives<M, R> for A where A: Actor<Message = M, Reply = R> {}

/// Marker for actors that intentionally accept a dynamic message
/// envelope rather than a single concrete payload type. Carries no
/// runtime behavior, same as [`Receives`].
pub trait ReceivesAny: Actor<Message = serde_json::Value> {}

impl<A> ReceivesAny for A where A: Actor<Message = serde_json::Value> {}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::actor::context::ActorContext;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Actor for Echo {
        type Message = u32;
        type Reply = u32;
        type Error = std::convert::Infallible;

        async fn receive(
            &mut self,
            message: Self::Message,
            _ctx: &mut ActorContext<Self>,
        ) -> Result<Self::Reply, Self::Error> {
            Ok(message)
        }
    }

    fn assert_receives<A: Receives<u32, u32>>() {}

    #[test]
    fn blanket_impl_matches_associated_types() {
        assert_receives::<Echo>();
    }
}
