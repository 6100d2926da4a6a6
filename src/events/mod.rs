//! Lifecycle events and the in-process event bus.

pub mod bus;
pub mod types;

pub use bus::EventBus;
pub use types::{AuditSnapshot, LifecycleEvent, LifecycleEventKind};
