//! End-to-end scenario: a child's failure under an ESCALATE policy
//! reaches the parent's `on_child_failure` through the parent's own
//! mailbox, and the child is cascade-stopped regardless of what the
//! parent decides for itself.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

// Layer 1: Standard library imports
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal crate imports
use haven_rt::prelude::*;

#[derive(Debug, Clone, thiserror::Error)]
#[error("child boom")]
struct ChildBoom;

struct Child;

#[async_trait]
impl Actor for Child {
    type Message = ();
    type Reply = ();
    type Error = ChildBoom;

    async fn receive(
        &mut self,
        _message: (),
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), ChildBoom> {
        Err(ChildBoom)
    }
}

#[derive(Debug)]
enum ParentMsg {
    GetChildAddress,
    TriggerChildFailure,
}

struct Parent {
    child: Option<ActorRef<Child>>,
    escalated: Arc<AtomicBool>,
}

#[async_trait]
impl Actor for Parent {
    type Message = ParentMsg;
    type Reply = Option<Address>;
    type Error = Infallible;

    async fn on_start(&mut self, ctx: &mut ActorContext<Self>) -> Result<(), Infallible> {
        let child = ctx
            .spawn_child(SupervisionPolicy::escalate(), || Child)
            .expect("child spawns under parent capacity");
        self.child = Some(child);
        Ok(())
    }

    async fn receive(
        &mut self,
        message: ParentMsg,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<Option<Address>, Infallible> {
        match message {
            ParentMsg::GetChildAddress => Ok(self.child.as_ref().map(|c| c.address().clone())),
            ParentMsg::TriggerChildFailure => {
                if let Some(child) = &self.child {
                    child.tell((), None).await.expect("child alive before failing");
                }
                Ok(None)
            }
        }
    }

    async fn on_child_failure(
        &mut self,
        _child: ChildRef,
        _error: &(dyn std::error::Error + Send + Sync),
        _ctx: &mut ActorContext<Self>,
    ) -> Option<SupervisorDecision> {
        self.escalated.store(true, Ordering::SeqCst);
        None
    }
}

/// Watches a single target address and records every termination
/// notice it receives into a shared, externally-observable buffer.
struct Sentinel {
    target: Address,
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

#[async_trait]
impl Actor for Sentinel {
    type Message = ();
    type Reply = ();
    type Error = Infallible;

    async fn on_start(&mut self, ctx: &mut ActorContext<Self>) -> Result<(), Infallible> {
        ctx.watch(&self.target);
        Ok(())
    }

    async fn receive(
        &mut self,
        _message: (),
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Infallible> {
        Ok(())
    }

    async fn on_watch_notification(&mut self, event: LifecycleEvent, _ctx: &mut ActorContext<Self>) {
        self.events.lock().expect("lock").push(event);
    }
}

fn spawn_sentinel(system: &Arc<ActorSystem>, target: Address) -> Arc<Mutex<Vec<LifecycleEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    system
        .spawn(SupervisionPolicy::stop(), None, {
            let events = events.clone();
            move || Sentinel {
                target: target.clone(),
                events: events.clone(),
            }
        })
        .expect("capacity available");
    events
}

async fn wait_for_event(events: &Arc<Mutex<Vec<LifecycleEvent>>>) -> LifecycleEvent {
    for _ in 0..200 {
        if let Some(event) = events.lock().expect("lock").first().cloned() {
            return event;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("watch did not fire within the test deadline");
}

#[tokio::test]
async fn escalated_child_failure_reaches_parent_and_cascade_stops_child() {
    let system = ActorSystem::new("escalation", SystemConfig::default());
    let escalated = Arc::new(AtomicBool::new(false));
    let parent = system
        .spawn(SupervisionPolicy::stop(), None, {
            let escalated = escalated.clone();
            move || Parent {
                child: None,
                escalated: escalated.clone(),
            }
        })
        .expect("capacity available");

    let child_address = parent
        .ask(ParentMsg::GetChildAddress, None, Duration::from_secs(1))
        .await
        .expect("parent alive")
        .expect("child spawned during on_start");

    let child_events = spawn_sentinel(&system, child_address);

    parent
        .tell(ParentMsg::TriggerChildFailure, None)
        .await
        .expect("parent alive");

    let child_event = wait_for_event(&child_events).await;
    assert!(matches!(child_event.kind, LifecycleEventKind::Stopped { .. }));

    for _ in 0..100 {
        if escalated.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(escalated.load(Ordering::SeqCst));

    for _ in 0..100 {
        if !parent.is_alive() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!parent.is_alive());
}
