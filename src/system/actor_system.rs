//! The actor system: registry, spawning, cascading shutdown, and audit
//! snapshots.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::AbortHandle;
use tracing::info;

// Layer 3: Internal crate imports
use crate::actor::traits::Actor;
use crate::address::Address;
use crate::clock::{SharedClock, SystemClock};
use crate::deadletter::DeadLetterSink;
use crate::events::{AuditSnapshot, EventBus, LifecycleEvent};
use crate::mailbox::MailboxControl;
use crate::persistence::PersistenceBackend;
use crate::reference::ActorRef;
use crate::supervisor::SupervisionPolicy;
use crate::system::config::{PersistenceMode, SystemConfig};
use crate::system::errors::SystemError;
use crate::system::hook::ActorHook;
use crate::system::loop_::run_actor_loop;
use crate::system::registry::RuntimeRecord;
use crate::util::ActorIdGenerator;

/// Owns every actor's bookkeeping for one named runtime: the registry
/// of [`RuntimeRecord`]s, the dead-letter queue, the event bus, the
/// clock, and an optional persistence backend.
pub struct ActorSystem {
    name: String,
    config: SystemConfig,
    id_gen: ActorIdGenerator,
    registry: RwLock<HashMap<u64, Arc<RuntimeRecord>>>,
    names: RwLock<HashMap<String, Address>>,
    dead_letters: Arc<DeadLetterSink>,
    events: Arc<EventBus>,
    clock: SharedClock,
    persistence: Option<Arc<dyn PersistenceBackend>>,
    bootstrapped: AtomicBool,
    actor_count: AtomicUsize,
    abort_handles: Mutex<Vec<AbortHandle>>,
}

impl ActorSystem {
    pub fn new(name: impl Into<String>, config: SystemConfig) -> Arc<Self> {
        ActorSystemBuilder::new(name).config(config).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn dead_letters(&self) -> &Arc<DeadLetterSink> {
        &self.dead_letters
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Spawns a new, unnamed actor, optionally as a child of `parent`.
    /// Equivalent to [`ActorSystem::spawn_named`] with `name: None`.
    pub fn spawn<A, F>(
        self: &Arc<Self>,
        policy: SupervisionPolicy,
        parent: Option<Address>,
        factory: F,
    ) -> Result<ActorRef<A>, SystemError>
    where
        A: Actor,
        F: Fn() -> A + Send + Sync + 'static,
    {
        self.spawn_named(policy, parent, None, factory)
    }

    /// Spawns a new actor, optionally as a child of `parent` and under
    /// an optional registry name. A non-`None` name that is already
    /// bound to a live actor is rejected rather than silently shadowed.
    ///
    /// `factory` is stored only inside the new actor's own task,
    /// re-invoked on every restart — it is never held in a shared,
    /// type-erased arena.
    pub fn spawn_named<A, F>(
        self: &Arc<Self>,
        policy: SupervisionPolicy,
        parent: Option<Address>,
        name: Option<String>,
        factory: F,
    ) -> Result<ActorRef<A>, SystemError>
    where
        A: Actor,
        F: Fn() -> A + Send + Sync + 'static,
    {
        if self.actor_count.load(Ordering::Acquire) >= self.config.max_actors {
            return Err(SystemError::ActorCapacityReached(self.config.max_actors));
        }

        if !self.bootstrapped.load(Ordering::Acquire) {
            return Err(SystemError::Configuration(
                "spawn attempted before bootstrap() resolved the configured persistence mode"
                    .to_string(),
            ));
        }

        if let Some(name) = &name {
            if self.names.read().contains_key(name) {
                return Err(SystemError::Configuration(format!(
                    "duplicate actor name {name:?}"
                )));
            }
        }

        let id = self.id_gen.next();
        let address = Address::new(self.name.clone(), id);
        let (sender, receiver) =
            crate::mailbox::bounded::<A::Message, A::Reply>(self.config.default_mailbox_capacity);
        let mailbox_control: Arc<dyn MailboxControl> = Arc::new(sender.clone());
        let self_ref = ActorRef::new(address.clone(), sender.clone(), self.dead_letters.clone());
        let factory = Arc::new(factory);
        let actor_cell = Arc::new(AsyncMutex::new(factory()));
        let hook: Arc<dyn crate::system::hook::SupervisionHook> = Arc::new(ActorHook {
            actor_cell: actor_cell.clone(),
            system: self.clone(),
            address: address.clone(),
            parent: parent.clone(),
            self_ref: self_ref.clone(),
        });
        let record = Arc::new(RuntimeRecord::new(
            address.clone(),
            parent.clone(),
            name.clone(),
            policy,
            mailbox_control,
            hook,
        ));

        self.registry.write().insert(id.get(), record.clone());
        if let Some(name) = &name {
            self.names.write().insert(name.clone(), address.clone());
        }
        if let Some(parent_addr) = &parent {
            if let Some(parent_record) = self.lookup(parent_addr) {
                parent_record.add_child(address.clone());
            }
        }
        self.actor_count.fetch_add(1, Ordering::AcqRel);

        let system = self.clone();
        let task_record = record.clone();
        let task_self_ref = self_ref.clone();
        let join_handle = tokio::spawn(async move {
            run_actor_loop(system, task_record, receiver, factory, actor_cell, task_self_ref).await;
        });
        self.abort_handles.lock().push(join_handle.abort_handle());

        info!(actor = %address, name = ?name, "actor spawned");
        Ok(self_ref)
    }

    /// Looks up a live actor's address by its registry name.
    pub fn lookup_named(&self, name: &str) -> Option<Address> {
        self.names.read().get(name).cloned()
    }

    /// Resolves the configured [`PersistenceMode`] against the backend
    /// before any actor may be spawned. `Ignore` is a no-op. `FailOnAnomaly`
    /// scans the backend and refuses to proceed if it isn't clean.
    /// `Recover(mode)` runs recovery unconditionally. Systems built with
    /// no persistence backend, or a default-constructed one whose mode is
    /// still `Ignore`, are already bootstrapped and never need this call.
    pub async fn bootstrap(&self) -> Result<(), SystemError> {
        if let Some(backend) = &self.persistence {
            match self.config.persistence {
                PersistenceMode::Ignore => {}
                PersistenceMode::FailOnAnomaly => {
                    let report = backend.scan().await.map_err(|err| {
                        SystemError::Configuration(format!("persistence scan failed: {err}"))
                    })?;
                    if !report.is_clean() {
                        return Err(SystemError::Configuration(format!(
                            "persistence backend reported {} anomalies under fail_on_anomaly",
                            report.anomalies.len()
                        )));
                    }
                }
                PersistenceMode::Recover(mode) => {
                    backend.recover(mode).await.map_err(|err| {
                        SystemError::Configuration(format!("persistence recovery failed: {err}"))
                    })?;
                }
            }
        }
        self.bootstrapped.store(true, Ordering::Release);
        Ok(())
    }

    /// Registers `watcher` to receive a termination notice, delivered
    /// into its own mailbox, once `target` stops, for any reason. A
    /// no-op if `target` is not currently a live actor in this system.
    pub(crate) fn add_watch(&self, watcher: Address, target: &Address) {
        if let Some(record) = self.lookup(target) {
            record.add_watcher(watcher);
        }
    }

    /// Stops `watcher` from watching `target`. A no-op if it wasn't
    /// watching, or if `target` is no longer alive.
    pub(crate) fn remove_watch(&self, watcher: &Address, target: &Address) {
        if let Some(record) = self.lookup(target) {
            record.remove_watcher(watcher);
        }
    }

    /// Initiates a cascading stop: marks `address` and every
    /// descendant as stopping and enqueues STOP into each mailbox as
    /// ordinary data.
    pub fn stop(&self, address: &Address) {
        self.stop_cascade(address);
    }

    fn stop_cascade(&self, address: &Address) {
        if let Some(record) = self.lookup(address) {
            record.mark_stopping();
            let _ = record.mailbox_control.enqueue_stop();
            for child in record.children_snapshot() {
                self.stop_cascade(&child);
            }
        }
    }

    /// Stops every root actor and waits up to `shutdown_timeout` for
    /// the registry to drain; anything still alive past the deadline
    /// has its mailbox force-closed and its task aborted.
    pub async fn shutdown(self: &Arc<Self>) -> Result<(), SystemError> {
        let roots: Vec<Address> = self
            .registry
            .read()
            .values()
            .filter(|record| record.parent.is_none())
            .map(|record| record.address.clone())
            .collect();
        for root in &roots {
            self.stop_cascade(root);
        }

        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout;
        while tokio::time::Instant::now() < deadline {
            if self.registry.read().is_empty() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        if self.registry.read().is_empty() {
            return Ok(());
        }

        let remaining: Vec<Arc<RuntimeRecord>> = self.registry.read().values().cloned().collect();
        for record in remaining {
            record.mailbox_control.force_close();
        }
        for handle in self.abort_handles.lock().drain(..) {
            handle.abort();
        }
        Err(SystemError::ShutdownTimeout(self.config.shutdown_timeout))
    }

    /// A point-in-time health summary, persisted if a backend is
    /// configured.
    pub async fn audit_snapshot(&self) -> AuditSnapshot {
        let registry = self.registry.read();
        let total_actors = registry.len();
        let mut alive_actors = 0usize;
        let mut stopping_actors = 0usize;
        let mut restarting_actors = 0usize;
        for record in registry.values() {
            if record.is_restarting() {
                restarting_actors += 1;
            }
            if record.is_stopping() {
                stopping_actors += 1;
            } else if record.is_alive() {
                alive_actors += 1;
            }
        }

        let names = self.names.read();
        let mut registry_orphans = Vec::new();
        let mut registry_dead = Vec::new();
        for (name, address) in names.iter() {
            match registry.get(&address.id().get()) {
                None => registry_orphans.push(name.clone()),
                Some(record) if !record.is_alive() => registry_dead.push(name.clone()),
                Some(_) => {}
            }
        }
        registry_orphans.sort();
        registry_dead.sort();

        let snapshot = AuditSnapshot {
            generated_at: self.clock.now(),
            total_actors,
            alive_actors,
            stopping_actors,
            restarting_actors,
            registry_size: names.len(),
            registry_orphans,
            registry_dead,
            dead_letters_count: self.dead_letters.len(),
        };
        drop(registry);
        drop(names);
        if let Some(backend) = &self.persistence {
            backend.record_audit(&self.name, &snapshot).await;
        }
        snapshot
    }

    pub(crate) fn lookup(&self, address: &Address) -> Option<Arc<RuntimeRecord>> {
        self.registry.read().get(&address.id().get()).cloned()
    }

    pub(crate) fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub(crate) fn persistence(&self) -> Option<&Arc<dyn PersistenceBackend>> {
        self.persistence.as_ref()
    }

    pub(crate) async fn publish_and_persist(&self, event: LifecycleEvent) {
        self.events.publish(event.clone());
        if let Some(backend) = &self.persistence {
            backend.record_event(&self.name, &event).await;
        }
    }

    pub(crate) fn finalize_removal(&self, record: &RuntimeRecord) {
        if let Some(parent_addr) = &record.parent {
            if let Some(parent_record) = self.lookup(parent_addr) {
                parent_record.remove_child(&record.address);
            }
        }
        if let Some(name) = &record.name {
            let mut names = self.names.write();
            if names.get(name) == Some(&record.address) {
                names.remove(name);
            }
        }
        self.registry.write().remove(&record.address.id().get());
        self.actor_count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Fluent constructor for [`ActorSystem`], following the same
/// builder convention used for per-actor configuration.
pub struct ActorSystemBuilder {
    name: String,
    config: SystemConfig,
    clock: SharedClock,
    persistence: Option<Arc<dyn PersistenceBackend>>,
}

impl ActorSystemBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: SystemConfig::default(),
            clock: Arc::new(SystemClock),
            persistence: None,
        }
    }

    pub fn config(mut self, config: SystemConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn persistence(mut self, backend: Arc<dyn PersistenceBackend>) -> Self {
        self.persistence = Some(backend);
        self
    }

    pub fn build(self) -> Arc<ActorSystem> {
        let bootstrapped = self.persistence.is_none()
            || matches!(self.config.persistence, PersistenceMode::Ignore);
        let dead_letters = Arc::new(DeadLetterSink::with_persistence(
            self.config.dead_letter_queue_capacity,
            self.name.clone(),
            self.persistence.clone(),
        ));
        Arc::new(ActorSystem {
            name: self.name,
            config: self.config.clone(),
            id_gen: ActorIdGenerator::new(),
            registry: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
            dead_letters,
            events: Arc::new(EventBus::new(self.config.event_ring_capacity)),
            clock: self.clock,
            persistence: self.persistence,
            bootstrapped: AtomicBool::new(bootstrapped),
            actor_count: AtomicUsize::new(0),
            abort_handles: Mutex::new(Vec::new()),
        })
    }
}
