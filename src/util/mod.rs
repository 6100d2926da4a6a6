//! Identity primitives shared across the runtime.

pub mod ids;

pub use ids::{ActorId, ActorIdGenerator, MessageId};
