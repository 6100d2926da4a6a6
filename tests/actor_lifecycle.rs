//! End-to-end actor lifecycle scenarios: tell/ask roundtrip, supervision
//! RESTART, and restart-budget exhaustion.

#![allow(clippy::unwrap_used, clippy::expect_used)]

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal crate imports
use haven_rt::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Inc,
    Get,
    Boom,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("boom")]
struct BoomError;

struct Counter {
    count: i64,
}

#[async_trait]
impl Actor for Counter {
    type Message = Op;
    type Reply = i64;
    type Error = BoomError;

    async fn receive(&mut self, message: Op, _ctx: &mut ActorContext<Self>) -> Result<i64, BoomError> {
        match message {
            Op::Inc => {
                self.count += 1;
                Ok(self.count)
            }
            Op::Get => Ok(self.count),
            Op::Boom => Err(BoomError),
        }
    }
}

async fn get(actor: &ActorRef<Counter>) -> i64 {
    actor
        .ask(Op::Get, None, Duration::from_secs(1))
        .await
        .expect("actor alive")
}

#[tokio::test]
async fn tell_ask_roundtrip() {
    let system = ActorSystem::new("lifecycle-1", SystemConfig::default());
    let counter = system
        .spawn(SupervisionPolicy::stop(), None, || Counter { count: 0 })
        .expect("capacity available");

    counter.tell(Op::Inc, None).await.expect("actor alive");
    counter.tell(Op::Inc, None).await.expect("actor alive");

    assert_eq!(get(&counter).await, 2);
}

#[tokio::test]
async fn supervision_restart_resets_actor_state() {
    let system = ActorSystem::new("lifecycle-2", SystemConfig::default());
    let policy = SupervisionPolicy::restart(5, 60);
    let counter = system
        .spawn(policy, None, || Counter { count: 0 })
        .expect("capacity available");

    counter.tell(Op::Inc, None).await.expect("actor alive");
    counter.tell(Op::Inc, None).await.expect("actor alive");
    assert_eq!(get(&counter).await, 2);

    let result = counter.ask(Op::Boom, None, Duration::from_secs(1)).await;
    assert!(matches!(result, Err(ActorError::User(_))));

    // The restart runs in the actor's own task; the reply above is only
    // sent once the decision has been applied, but the next instance's
    // `on_start` still needs its own turn on the scheduler.
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(get(&counter).await, 0);

    counter.tell(Op::Inc, None).await.expect("actor alive after restart");
    assert_eq!(get(&counter).await, 1);
}

#[tokio::test]
async fn restart_budget_exhaustion_permanently_stops() {
    let system = ActorSystem::new("lifecycle-3", SystemConfig::default());
    let policy = SupervisionPolicy::restart(2, 60);
    let counter = system
        .spawn(policy, None, || Counter { count: 0 })
        .expect("capacity available");

    for _ in 0..3 {
        let result = counter.ask(Op::Boom, None, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ActorError::User(_))));
    }

    tokio::time::sleep(Duration::from_millis(20)).await;

    let result = counter.tell(Op::Inc, None).await;
    assert!(matches!(result, Err(ActorError::ActorStopped(_))));
    assert_eq!(system.dead_letters().len(), 1);
    assert!(!counter.is_alive());
}
