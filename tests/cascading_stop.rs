//! End-to-end scenario: a parent's cascading stop reaches a child it
//! spawned in `on_start`, and both become unreachable afterward.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

// Layer 1: Standard library imports
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal crate imports
use haven_rt::prelude::*;

struct Child;

#[async_trait]
impl Actor for Child {
    type Message = ();
    type Reply = ();
    type Error = Infallible;

    async fn receive(
        &mut self,
        _message: (),
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Infallible> {
        Ok(())
    }
}

#[derive(Debug)]
enum ParentMsg {
    GetChild,
    Stop,
}

struct Parent {
    child: Option<ActorRef<Child>>,
}

#[async_trait]
impl Actor for Parent {
    type Message = ParentMsg;
    type Reply = Option<Address>;
    type Error = Infallible;

    async fn on_start(&mut self, ctx: &mut ActorContext<Self>) -> Result<(), Infallible> {
        let child = ctx
            .spawn_child(SupervisionPolicy::stop(), || Child)
            .expect("child spawns under parent capacity");
        self.child = Some(child);
        Ok(())
    }

    async fn receive(
        &mut self,
        message: ParentMsg,
        ctx: &mut ActorContext<Self>,
    ) -> Result<Option<Address>, Infallible> {
        match message {
            ParentMsg::GetChild => Ok(self.child.as_ref().map(|c| c.address().clone())),
            ParentMsg::Stop => {
                ctx.stop_self();
                Ok(None)
            }
        }
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

fn spawn_sentinel(system: &std::sync::Arc<ActorSystem>, target: Address) -> Arc<Mutex<Vec<LifecycleEvent>>> {
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

async fn wait_until_dead(actor_is_alive: impl Fn() -> bool) {
    for _ in 0..100 {
        if !actor_is_alive() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("actor did not stop within the test deadline");
}

#[tokio::test]
async fn cascading_stop_reaches_child() {
    let system = ActorSystem::new("cascade", SystemConfig::default());
    let parent = system
        .spawn(SupervisionPolicy::stop(), None, || Parent { child: None })
        .expect("capacity available");

    let child_address = parent
        .ask(ParentMsg::GetChild, None, Duration::from_secs(1))
        .await
        .expect("parent alive")
        .expect("child spawned during on_start");

    let child_events = spawn_sentinel(&system, child_address);
    let parent_events = spawn_sentinel(&system, parent.address().clone());

    let _ = parent
        .ask(ParentMsg::Stop, None, Duration::from_secs(1))
        .await;

    let child_event = wait_for_event(&child_events).await;
    assert!(matches!(child_event.kind, LifecycleEventKind::Stopped { .. }));

    let parent_event = wait_for_event(&parent_events).await;
    assert!(matches!(parent_event.kind, LifecycleEventKind::Stopped { .. }));

    wait_until_dead(|| parent.is_alive()).await;

    let result = parent.tell(ParentMsg::GetChild, None).await;
    assert!(matches!(result, Err(ActorError::ActorStopped(_))));
    assert_eq!(system.dead_letters().len(), 1);
    assert_eq!(system.dead_letters().snapshot()[0].target, *parent.address());
}
