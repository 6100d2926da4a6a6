//! Actor behavior and per-actor context.

pub mod context;
pub mod traits;

pub use context::ActorContext;
pub use traits::{Actor, Receives, ReceivesAny};
