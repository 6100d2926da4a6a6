//! Per-actor context handed to every `Actor` trait method: self
//! address, parent address, a send-capable handle to self, and
//! system-wide operations.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 3: Internal crate imports
use crate::actor::traits::Actor;
use crate::address::Address;
use crate::reference::ActorRef;
use crate::supervisor::SupervisionPolicy;
use crate::system::actor_system::ActorSystem;
use crate::system::errors::SystemError;

/// Handed to `on_start`/`receive`/`on_stop`/`on_child_failure` so an
/// actor can learn its own address, obtain a typed handle to itself,
/// spawn children, stop itself or a child, and watch another actor
/// for termination, all without needing a typed handle to the system
/// itself.
///
/// Generic over the owning actor's own type `A` so [`Self::self_ref`]
/// can return a fully typed [`ActorRef<A>`] rather than a type-erased
/// handle.
pub struct ActorContext<A: Actor> {
    address: Address,
    system: Arc<ActorSystem>,
    parent: Option<Address>,
    self_ref: ActorRef<A>,
}

impl<A: Actor> ActorContext<A> {
    pub(crate) fn new(
        address: Address,
        system: Arc<ActorSystem>,
        parent: Option<Address>,
        self_ref: ActorRef<A>,
    ) -> Self {
        Self {
            address,
            system,
            parent,
            self_ref,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn parent(&self) -> Option<&Address> {
        self.parent.as_ref()
    }

    /// A typed, send-capable handle to the actor owning this context,
    /// usable to hand out to children or store for later self-sends.
    pub fn self_ref(&self) -> ActorRef<A> {
        self.self_ref.clone()
    }

    /// Spawns a new actor as a child of the actor owning this context.
    pub fn spawn_child<C, F>(
        &self,
        policy: SupervisionPolicy,
        factory: F,
    ) -> Result<ActorRef<C>, SystemError>
    where
        C: Actor,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.system
            .spawn(policy, Some(self.address.clone()), factory)
    }

    /// Initiates a cascading stop of the actor owning this context.
    pub fn stop_self(&self) {
        self.system.stop(&self.address);
    }

    /// Initiates a cascading stop of a specific child or any other
    /// actor address known to this system.
    pub fn stop(&self, address: &Address) {
        self.system.stop(address);
    }

    /// Watches `address`: once it stops, for any reason, this actor's
    /// own mailbox receives a [`crate::envelope::MailboxItem::Terminated`]
    /// item ahead of its next `receive`.
    pub fn watch(&self, address: &Address) {
        self.system.add_watch(self.address.clone(), address);
    }

    /// Stops watching `address`. A no-op if this actor was not
    /// watching it.
    pub fn unwatch(&self, address: &Address) {
        self.system.remove_watch(&self.address, address);
    }
}
