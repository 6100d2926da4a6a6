//! Bridges a failing child's loop directly into its parent's own
//! `Actor::on_child_failure`, in-process and without reentering the
//! parent's own loop, so the parent hook stays synchronous with
//! respect to the child per the supervision contract.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

// Layer 3: Internal crate imports
use crate::actor::context::ActorContext;
use crate::actor::traits::Actor;
use crate::address::Address;
use crate::reference::{ActorRef, ChildRef};
use crate::supervisor::SupervisorDecision;
use crate::system::actor_system::ActorSystem;

/// Object-safe handle to one actor's `on_child_failure`, held by its
/// own [`crate::system::registry::RuntimeRecord`] and invoked by a
/// failing child that looks up its parent's record.
#[async_trait]
pub trait SupervisionHook: Send + Sync {
    async fn invoke(
        &self,
        child: ChildRef,
        error: &(dyn std::error::Error + Send + Sync),
    ) -> Option<SupervisorDecision>;
}

/// Concrete [`SupervisionHook`] for one actor instance, sharing the
/// same actor cell its own loop runs against so the hook sees whatever
/// state the actor has accumulated so far.
pub struct ActorHook<A: Actor> {
    pub actor_cell: Arc<AsyncMutex<A>>,
    pub system: Arc<ActorSystem>,
    pub address: Address,
    pub parent: Option<Address>,
    pub self_ref: ActorRef<A>,
}

#[async_trait]
impl<A: Actor> SupervisionHook for ActorHook<A> {
    async fn invoke(
        &self,
        child: ChildRef,
        error: &(dyn std::error::Error + Send + Sync),
    ) -> Option<SupervisorDecision> {
        let mut actor = self.actor_cell.lock().await;
        let mut ctx = ActorContext::new(
            self.address.clone(),
            self.system.clone(),
            self.parent.clone(),
            self.self_ref.clone(),
        );
        actor.on_child_failure(child, error, &mut ctx).await
    }
}

/// Hook for an actor whose `Actor` type is not (yet) known to the
/// registry bookkeeping constructors, e.g. in unit tests that build a
/// bare [`crate::system::registry::RuntimeRecord`] directly.
pub struct NoopHook;

#[async_trait]
impl SupervisionHook for NoopHook {
    async fn invoke(
        &self,
        _child: ChildRef,
        _error: &(dyn std::error::Error + Send + Sync),
    ) -> Option<SupervisorDecision> {
        None
    }
}
