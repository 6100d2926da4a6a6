//! Supervision policy and decision engine.

pub mod engine;
pub mod types;

pub use engine::decide;
pub use types::{Strategy, SupervisionPolicy, SupervisorDecision};
