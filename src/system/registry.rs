//! Non-generic actor bookkeeping shared by every actor type in a
//! system.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

// Layer 3: Internal crate imports
use crate::address::Address;
use crate::mailbox::MailboxControl;
use crate::supervisor::SupervisionPolicy;
use crate::system::hook::SupervisionHook;

/// Bookkeeping for one live actor, independent of its concrete `Actor`
/// type. Held by the [`crate::system::ActorSystem`] registry and
/// referenced from within the actor's own loop.
pub struct RuntimeRecord {
    pub address: Address,
    pub parent: Option<Address>,
    pub name: Option<String>,
    pub policy: SupervisionPolicy,
    pub children: Mutex<Vec<Address>>,
    pub mailbox_control: Arc<dyn MailboxControl>,
    pub restart_timestamps: Mutex<Vec<DateTime<Utc>>>,
    /// Addresses currently watching this actor. Termination delivers a
    /// [`crate::envelope::MailboxItem::Terminated`] item into each
    /// watcher's own mailbox rather than a side channel.
    pub watchers: Mutex<Vec<Address>>,
    /// This actor's own `on_child_failure`, invoked by a failing child
    /// that looks up this record as its parent.
    pub supervision_hook: Arc<dyn SupervisionHook>,
    alive: AtomicBool,
    stopping: AtomicBool,
    restarting: AtomicBool,
    watchers_notified: AtomicBool,
}

impl RuntimeRecord {
    pub fn new(
        address: Address,
        parent: Option<Address>,
        name: Option<String>,
        policy: SupervisionPolicy,
        mailbox_control: Arc<dyn MailboxControl>,
        supervision_hook: Arc<dyn SupervisionHook>,
    ) -> Self {
        Self {
            address,
            parent,
            name,
            policy,
            children: Mutex::new(Vec::new()),
            mailbox_control,
            restart_timestamps: Mutex::new(Vec::new()),
            watchers: Mutex::new(Vec::new()),
            supervision_hook,
            alive: AtomicBool::new(true),
            stopping: AtomicBool::new(false),
            restarting: AtomicBool::new(false),
            watchers_notified: AtomicBool::new(false),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    pub fn is_restarting(&self) -> bool {
        self.restarting.load(Ordering::Acquire)
    }

    pub fn mark_stopping(&self) {
        self.stopping.store(true, Ordering::Release);
    }

    pub fn mark_restarting(&self, value: bool) {
        self.restarting.store(value, Ordering::Release);
    }

    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn add_child(&self, child: Address) {
        self.children.lock().push(child);
    }

    pub fn remove_child(&self, child: &Address) {
        self.children.lock().retain(|c| c != child);
    }

    pub fn children_snapshot(&self) -> Vec<Address> {
        self.children.lock().clone()
    }

    pub fn add_watcher(&self, watcher: Address) {
        self.watchers.lock().push(watcher);
    }

    pub fn remove_watcher(&self, watcher: &Address) {
        self.watchers.lock().retain(|w| w != watcher);
    }

    /// Takes every registered watcher exactly once, regardless of
    /// whether the normal loop-exit path or a cascading stop path
    /// reaches this first; returns `None` on every call past the
    /// first.
    pub fn take_watchers_once(&self) -> Option<Vec<Address>> {
        if self
            .watchers_notified
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        Some(std::mem::take(&mut *self.watchers.lock()))
    }
}
