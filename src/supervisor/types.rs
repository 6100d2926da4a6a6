//! Supervision policy and decision types.

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

/// What a supervisor does by default when a child actor's `receive`
/// returns `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Stop,
    Restart,
    Escalate,
}

/// A supervisor's configured response to child failures: a default
/// strategy plus a restart budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupervisionPolicy {
    pub strategy: Strategy,
    pub max_restarts: u32,
    pub within_seconds: i64,
}

impl SupervisionPolicy {
    pub fn new(strategy: Strategy, max_restarts: u32, within_seconds: i64) -> Self {
        Self {
            strategy,
            max_restarts,
            within_seconds,
        }
    }

    pub fn stop() -> Self {
        Self::new(Strategy::Stop, 0, 0)
    }

    pub fn restart(max_restarts: u32, within_seconds: i64) -> Self {
        Self::new(Strategy::Restart, max_restarts, within_seconds)
    }

    pub fn escalate() -> Self {
        Self::new(Strategy::Escalate, 0, 0)
    }
}

impl Default for SupervisionPolicy {
    fn default() -> Self {
        Self::stop()
    }
}

/// What the supervision engine decided to do about one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorDecision {
    Restart,
    Stop,
    Escalate,
    Ignore,
}
