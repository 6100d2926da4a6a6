//! The actor task loop: on_start, the receive loop, on_stop, and
//! failure handling through the supervision engine.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info};

// Layer 3: Internal crate imports
use crate::actor::context::ActorContext;
use crate::actor::traits::Actor;
use crate::envelope::{ActorFailure, MailboxItem, Reply};
use crate::events::LifecycleEvent;
use crate::mailbox::BoundedMailboxReceiver;
use crate::reference::{ActorRef, ChildRef};
use crate::supervisor::{self, SupervisorDecision};
use crate::system::actor_system::ActorSystem;
use crate::system::registry::RuntimeRecord;

/// Runs one actor's full lifecycle, restarting it in place via
/// `factory` when the supervision engine decides to.
///
/// `actor_cell` holds the live instance this loop drives; it is the
/// same cell the actor's own [`crate::system::hook::ActorHook`] locks
/// when a child's failure calls into this actor's `on_child_failure`,
/// so that call observes whatever state this actor has accumulated so
/// far and never reenters this loop. The lock is only ever held for
/// the duration of one `on_start`/`receive`/`on_stop`/
/// `on_watch_notification`/`on_child_failure` call, never across a
/// blocking `receiver.recv().await`.
pub async fn run_actor_loop<A: Actor>(
    system: Arc<ActorSystem>,
    record: Arc<RuntimeRecord>,
    mut receiver: BoundedMailboxReceiver<A::Message, A::Reply>,
    factory: Arc<dyn Fn() -> A + Send + Sync>,
    actor_cell: Arc<AsyncMutex<A>>,
    self_ref: ActorRef<A>,
) {
    loop {
        {
            let mut actor = actor_cell.lock().await;
            *actor = factory();
        }
        let mut ctx = ActorContext::new(
            record.address.clone(),
            system.clone(),
            record.parent.clone(),
            self_ref.clone(),
        );
        let mut failure: Option<String> = None;

        {
            let mut actor = actor_cell.lock().await;
            match actor.on_start(&mut ctx).await {
                Ok(()) => {
                    system
                        .publish_and_persist(LifecycleEvent::started(record.address.clone()))
                        .await;
                }
                Err(err) => failure = Some(err.to_string()),
            }
        }

        let mut pending_reply: Option<(oneshot::Sender<Reply<A::Reply>>, String)> = None;

        if failure.is_none() {
            loop {
                match receiver.recv().await {
                    None => break,
                    Some(MailboxItem::Stop) => break,
                    Some(MailboxItem::Escalated(_child, message)) => {
                        // A child's ESCALATE decision is handled as a
                        // failure of this actor's own, through this
                        // actor's own supervision policy below.
                        failure = Some(message);
                        break;
                    }
                    Some(MailboxItem::Terminated(event)) => {
                        let mut actor = actor_cell.lock().await;
                        actor.on_watch_notification(event, &mut ctx).await;
                    }
                    Some(MailboxItem::Message(envelope)) => {
                        let reply_to = envelope.reply_to;
                        let mut actor = actor_cell.lock().await;
                        match actor.receive(envelope.payload, &mut ctx).await {
                            Ok(value) => {
                                if let Some(tx) = reply_to {
                                    let _ = tx.send(Reply::Value(value));
                                }
                            }
                            Err(err) => {
                                let message = err.to_string();
                                if let Some(tx) = reply_to {
                                    pending_reply = Some((tx, message.clone()));
                                }
                                failure = Some(message);
                                break;
                            }
                        }
                    }
                }
            }
        }

        {
            let mut actor = actor_cell.lock().await;
            actor.on_stop(&mut ctx).await;
        }

        let Some(err_msg) = failure else {
            finalize_stop(&system, &record, None).await;
            return;
        };

        error!(actor = %record.address, error = %err_msg, "actor failed");
        system
            .publish_and_persist(LifecycleEvent::crashed(record.address.clone(), err_msg.clone()))
            .await;

        let decision = resolve_decision(&system, &record, &err_msg).await;

        // The original error is delivered to a pending `ask` only after the
        // supervision decision above has been applied, never
        // eagerly when `receive` first returns `Err`.
        let send_pending_reply = |pending_reply: Option<(oneshot::Sender<Reply<A::Reply>>, String)>| {
            if let Some((tx, message)) = pending_reply {
                let _ = tx.send(Reply::Error(ActorFailure::new(message)));
            }
        };

        match decision {
            SupervisorDecision::Restart => {
                record.mark_restarting(true);
                system
                    .publish_and_persist(LifecycleEvent::restarted(record.address.clone(), err_msg))
                    .await;
                record.mark_restarting(false);
                send_pending_reply(pending_reply);
                continue;
            }
            SupervisorDecision::Stop => {
                finalize_stop(&system, &record, Some(err_msg)).await;
                send_pending_reply(pending_reply);
                return;
            }
            SupervisorDecision::Escalate => {
                escalate(&system, &record, &err_msg);
                finalize_stop(&system, &record, Some(err_msg)).await;
                send_pending_reply(pending_reply);
                return;
            }
            SupervisorDecision::Ignore => {
                finalize_stop(&system, &record, None).await;
                send_pending_reply(pending_reply);
                return;
            }
        }
    }
}

/// Marks the actor dead, delivers a termination notice into each
/// watcher's own mailbox exactly once, removes it from its parent's
/// child list and the system registry, and persists a `Stopped` event.
async fn finalize_stop(system: &Arc<ActorSystem>, record: &Arc<RuntimeRecord>, reason: Option<String>) {
    record.mark_dead();
    let event = LifecycleEvent::stopped(record.address.clone(), reason);
    if let Some(watchers) = record.take_watchers_once() {
        for watcher in watchers {
            if let Some(watcher_record) = system.lookup(&watcher) {
                let _ = watcher_record
                    .mailbox_control
                    .enqueue_watch_notification(event.clone());
            }
        }
    }
    system.finalize_removal(record);
    system.publish_and_persist(event).await;
    info!(actor = %record.address, "actor stopped");
}

/// Resolves what to do about one failure, following the supervision
/// engine's exact ordering: an already-stopping actor is ignored
/// outright; otherwise, if a parent exists, its `on_child_failure` is
/// invoked directly, in the child's own task, and a returned decision
/// is honored exactly; only once no override was available does the
/// actor's own policy and restart budget apply.
async fn resolve_decision(
    system: &Arc<ActorSystem>,
    record: &Arc<RuntimeRecord>,
    err_msg: &str,
) -> SupervisorDecision {
    if record.is_stopping() {
        return SupervisorDecision::Ignore;
    }

    if let Some(parent_addr) = &record.parent {
        if let Some(parent_record) = system.lookup(parent_addr) {
            let child = ChildRef::new(record.address.clone());
            let err = ActorFailure::new(err_msg.to_string());
            if let Some(decision) = parent_record.supervision_hook.invoke(child, &err).await {
                return decision;
            }
        }
    }

    let mut history = record.restart_timestamps.lock();
    supervisor::decide(&record.policy, &mut history, system.clock(), false)
}

/// Delivers the same failure to the parent's own mailbox as an
/// escalated item, so the parent's loop runs it through its own
/// supervision policy. The child that escalated is cascade-stopped by
/// its own loop regardless of what the parent ultimately decides.
fn escalate(system: &Arc<ActorSystem>, record: &Arc<RuntimeRecord>, err_msg: &str) {
    if let Some(parent_addr) = &record.parent {
        if let Some(parent_record) = system.lookup(parent_addr) {
            let child = ChildRef::new(record.address.clone());
            let _ = parent_record
                .mailbox_control
                .enqueue_escalation(child, err_msg.to_string());
        }
    }
}
