//! System-level error taxonomy.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal crate imports
use crate::address::Address;

/// Errors surfaced by `ActorRef` sends and asks.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("actor {0} is not alive")]
    ActorStopped(Address),
    #[error("ask to {0} timed out after {1:?}")]
    AskTimeout(Address, Duration),
    #[error("mailbox closed")]
    MailboxClosed,
    #[error(transparent)]
    User(Box<dyn std::error::Error + Send + Sync>),
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Errors surfaced by system-wide operations: spawning, shutdown, and
/// registry lookups.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("system has reached its actor capacity ({0})")]
    ActorCapacityReached(usize),
    #[error("no actor registered at {0}")]
    UnknownActor(Address),
    #[error("spawn of {0} timed out")]
    SpawnTimeout(Address),
    #[error("shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
    #[error("invalid configuration: {0}")]
    Configuration(String),
}
