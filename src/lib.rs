//! # haven-rt - Lightweight In-Process Actor Runtime
//!
//! A mailbox-based actor system with hierarchical supervision,
//! request/reply messaging, lifecycle observability, and pluggable
//! append-only persistence.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use haven_rt::prelude::*;
//! use async_trait::async_trait;
//!
//! struct Counter(u64);
//!
//! #[async_trait]
//! impl Actor for Counter {
//!     type Message = u64;
//!     type Reply = u64;
//!     type Error = std::convert::Infallible;
//!
//!     async fn receive(
//!         &mut self,
//!         message: Self::Message,
//!         _ctx: &mut ActorContext<Self>,
//!     ) -> Result<Self::Reply, Self::Error> {
//!         self.0 += message;
//!         Ok(self.0)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let system = ActorSystem::new("demo", SystemConfig::default());
//!     let actor = system
//!         .spawn(SupervisionPolicy::default(), None, || Counter(0))
//!         .expect("capacity available");
//!     let total = actor
//!         .ask(5, None, std::time::Duration::from_secs(1))
//!         .await
//!         .expect("actor alive");
//!     assert_eq!(total, 5);
//! }
//! ```
//!
//! # Core Model
//!
//! - An actor owns exactly one bounded mailbox. Messages, the STOP
//!   marker, and escalated child failures are all ordinary items in the
//!   same FIFO queue ("STOP-as-data").
//! - A [`reference::ActorRef`] sends directly into the target's
//!   mailbox; there is no broker or pub/sub indirection between actors.
//! - Supervision is hierarchical: every actor but a root has a parent,
//!   and a parent's cascading stop always reaches every descendant.
//! - Lifecycle transitions (`Started`, `Restarted`, `Crashed`,
//!   `Stopped`) are published on an in-process event bus and, if a
//!   backend is configured, appended to durable storage.
//!
//! # Module Organization
//!
//! ## Core Actor System
//! - [`actor`] - the `Actor` trait and per-actor `ActorContext`
//! - [`reference`] - `ActorRef`, `ChildRef`: typed and type-erased handles
//! - [`envelope`] - `Envelope`, `Reply`, `MailboxItem`
//! - [`address`] - stable actor addressing
//!
//! ## Messaging Infrastructure
//! - [`mailbox`] - bounded, FIFO, single-consumer mailboxes
//! - [`deadletter`] - the dead-letter sink for undeliverable messages
//!
//! ## Fault Tolerance
//! - [`supervisor`] - restart policies and the supervision decision engine
//! - [`events`] - lifecycle events and the in-process event bus
//!
//! ## Infrastructure
//! - [`system`] - `ActorSystem`, configuration, the actor task loop
//! - [`persistence`] - pluggable append-only event/audit/dead-letter storage
//! - [`clock`] - injectable clock for deterministic restart-budget tests
//! - [`util`] - `ActorId`, `MessageId` and their generators
//!
//! # Architecture Principles
//!
//! ## Zero-Cost Dispatch
//! `ActorRef<A>` and the actor task loop are generic over the concrete
//! `Actor` implementation; the only licensed type erasure is the
//! object-safe `MailboxControl` trait (needed because a parent's
//! registry holds children of heterogeneous actor types) and the
//! address-only `ChildRef` handed to `on_child_failure`.
//!
//! ## Persistence Hot-Path Safety
//! `record_event`/`record_audit`/`record_dead_letter` never return an
//! error: a failing backend only increments its own metrics counters,
//! so a persistence outage can never stall or crash an actor.
//!
//! ## Escalation as Ordinary Data
//! A child's ESCALATE decision is delivered as an `Escalated` mailbox
//! item into the parent's own mailbox, so the parent's own task
//! processes it through its own supervision policy exactly like any
//! other queued item, with no access into another task's private state.

pub mod actor;
pub mod address;
pub mod clock;
pub mod deadletter;
pub mod envelope;
pub mod events;
pub mod mailbox;
pub mod persistence;
pub mod prelude;
pub mod reference;
pub mod supervisor;
pub mod system;
pub mod util;

pub use actor::{Actor, ActorContext, Receives, ReceivesAny};
pub use address::{Address, AddressParseError};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use deadletter::{DeadLetter, DeadLetterSink};
pub use envelope::{ActorFailure, Envelope, MailboxItem, Reply};
pub use events::{AuditSnapshot, EventBus, LifecycleEvent, LifecycleEventKind};
pub use mailbox::{bounded, BoundedMailboxReceiver, BoundedMailboxSender, MailboxControl, MailboxError};
pub use persistence::{
    Anomaly, NdjsonBackend, PersistedRecord, PersistenceBackend, PersistenceError,
    PersistenceMetrics, PersistenceMetricsSnapshot, RecoveryMode, RetentionPolicy,
    RotatingBackend, ScanReport, StreamKeys, StreamLogBackend,
};
pub use reference::{ActorRef, ChildRef};
pub use supervisor::{decide, Strategy, SupervisionPolicy, SupervisorDecision};
pub use system::{ActorError, ActorSystem, ActorSystemBuilder, PersistenceMode, SystemConfig, SystemConfigBuilder, SystemError};
pub use util::{ActorId, ActorIdGenerator, MessageId};
