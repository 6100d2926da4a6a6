//! Prelude module for convenient imports.
//!
//! Re-exports the types most applications need to define actors,
//! supervise them, and wire up a system. Import with:
//!
//! ```rust
//! use haven_rt::prelude::*;
//! ```
//!
//! # What's Included
//!
//! ## Core Actor System
//! - [`Actor`] - trait implemented by user-defined actors
//! - [`ActorContext`] - handed to every `Actor` method
//! - [`Receives`] / [`ReceivesAny`] - zero-cost message-type markers
//!
//! ## Messaging
//! - [`Envelope`] - in-flight message with provenance and reply channel
//! - [`Reply`] - the outcome of an `ask` exchange
//! - [`MailboxItem`] - message, STOP, or escalated failure
//! - [`Address`] - stable actor address
//!
//! ## References
//! - [`ActorRef`] - typed send capability into an actor's mailbox
//! - [`ChildRef`] - type-erased handle used by `on_child_failure`
//!
//! ## Mailbox
//! - [`MailboxControl`] - object-safe control surface over a mailbox
//! - [`MailboxError`] - full or closed mailbox errors
//!
//! ## Supervision
//! - [`SupervisionPolicy`] - strategy plus restart budget
//! - [`Strategy`] - Stop, Restart, or Escalate
//! - [`SupervisorDecision`] - the engine's verdict after a failure
//!
//! ## Events
//! - [`LifecycleEvent`] - Started, Restarted, Crashed, Stopped
//! - [`EventBus`] - in-process ring buffer plus live subscription
//! - [`AuditSnapshot`] - point-in-time health summary
//!
//! ## System
//! - [`ActorSystem`] - owns the registry, event bus, and dead letters
//! - [`SystemConfig`] - tunable capacities and timeouts
//! - [`ActorError`] / [`SystemError`] - the error taxonomy
//!
//! ## Persistence
//! - [`PersistenceBackend`] - append-only event/audit/dead-letter storage
//! - [`NdjsonBackend`] / [`RotatingBackend`] / [`StreamLogBackend`] - backends
//!
//! ## Utilities
//! - [`ActorId`] / [`MessageId`] - identifiers
//! - [`DeadLetter`] - an undeliverable message record

// Core actor system
pub use crate::actor::{Actor, ActorContext, Receives, ReceivesAny};

// Messaging
pub use crate::address::Address;
pub use crate::envelope::{Envelope, MailboxItem, Reply};

// References
pub use crate::reference::{ActorRef, ChildRef};

// Mailbox
pub use crate::mailbox::{MailboxControl, MailboxError};

// Supervision
pub use crate::supervisor::{Strategy, SupervisionPolicy, SupervisorDecision};

// Events
pub use crate::events::{AuditSnapshot, EventBus, LifecycleEvent, LifecycleEventKind};

// System
pub use crate::system::{ActorError, ActorSystem, ActorSystemBuilder, SystemConfig, SystemError};

// Persistence
pub use crate::persistence::{NdjsonBackend, PersistenceBackend, RotatingBackend, StreamLogBackend};

// Utilities
pub use crate::deadletter::DeadLetter;
pub use crate::util::{ActorId, MessageId};
