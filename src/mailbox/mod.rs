//! Bounded, FIFO, single-consumer mailboxes.

pub mod bounded;
pub mod traits;

pub use bounded::{bounded, BoundedMailboxReceiver, BoundedMailboxSender};
pub use traits::{MailboxControl, MailboxError};
