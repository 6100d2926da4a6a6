//! Lifecycle event payloads.

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal crate imports
use crate::address::Address;

/// A plain-data record of something that happened to an actor, emitted
/// to the event bus and, where configured, persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub actor: Address,
    pub timestamp: DateTime<Utc>,
    pub kind: LifecycleEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum LifecycleEventKind {
    Started,
    Restarted { reason: String },
    Crashed { error: String },
    Stopped { reason: Option<String> },
}

/// A point-in-time summary of system health, combining live registry
/// state with the name-registry's own consistency against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSnapshot {
    pub generated_at: DateTime<Utc>,
    pub total_actors: usize,
    pub alive_actors: usize,
    pub stopping_actors: usize,
    pub restarting_actors: usize,
    pub registry_size: usize,
    pub registry_orphans: Vec<String>,
    pub registry_dead: Vec<String>,
    pub dead_letters_count: usize,
}

impl LifecycleEventKind {
    /// A stable, lowercase name for this variant, independent of its
    /// payload — what [`crate::events::EventBus::wait_for_event`]
    /// matches against.
    pub fn tag(&self) -> &'static str {
        match self {
            LifecycleEventKind::Started => "started",
            LifecycleEventKind::Restarted { .. } => "restarted",
            LifecycleEventKind::Crashed { .. } => "crashed",
            LifecycleEventKind::Stopped { .. } => "stopped",
        }
    }
}

impl LifecycleEvent {
    pub fn started(actor: Address) -> Self {
        Self {
            actor,
            timestamp: Utc::now(),
            kind: LifecycleEventKind::Started,
        }
    }

    pub fn restarted(actor: Address, reason: impl Into<String>) -> Self {
        Self {
            actor,
            timestamp: Utc::now(),
            kind: LifecycleEventKind::Restarted {
                reason: reason.into(),
            },
        }
    }

    pub fn crashed(actor: Address, error: impl Into<String>) -> Self {
        Self {
            actor,
            timestamp: Utc::now(),
            kind: LifecycleEventKind::Crashed {
                error: error.into(),
            },
        }
    }

    pub fn stopped(actor: Address, reason: Option<String>) -> Self {
        Self {
            actor,
            timestamp: Utc::now(),
            kind: LifecycleEventKind::Stopped { reason },
        }
    }
}
