//! Supervision decision engine.

// Layer 2: Third-party crate imports
use chrono::Duration as ChronoDuration;

// Layer 3: Internal crate imports
use crate::clock::SharedClock;
use crate::supervisor::types::{Strategy, SupervisionPolicy, SupervisorDecision};

/// Decides what to do about a child's failure given its supervision
/// policy and restart history.
///
/// `restart_timestamps` is the child's own rolling window of past
/// restart attempts; entries outside `within_seconds` are dropped
/// before the budget check. When the decision is `Restart`, the new
/// attempt's timestamp is pushed onto the window immediately, after
/// the budget check but before the caller starts the new instance.
///
/// `already_stopping` covers the race where a failure is reported for
/// an actor whose shutdown was already in flight; such failures are
/// ignored rather than triggering a second action.
pub fn decide(
    policy: &SupervisionPolicy,
    restart_timestamps: &mut Vec<chrono::DateTime<chrono::Utc>>,
    clock: &SharedClock,
    already_stopping: bool,
) -> SupervisorDecision {
    if already_stopping {
        return SupervisorDecision::Ignore;
    }

    match policy.strategy {
        Strategy::Stop => SupervisorDecision::Stop,
        Strategy::Escalate => SupervisorDecision::Escalate,
        Strategy::Restart => {
            let now = clock.now();
            let window_start = now - ChronoDuration::seconds(policy.within_seconds);
            restart_timestamps.retain(|t| *t >= window_start);

            if (restart_timestamps.len() as u32) < policy.max_restarts {
                restart_timestamps.push(now);
                SupervisorDecision::Restart
            } else {
                SupervisorDecision::Stop
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    #[test]
    fn stop_strategy_always_stops() {
        let policy = SupervisionPolicy::stop();
        let clock: SharedClock = Arc::new(ManualClock::new());
        let mut history = Vec::new();
        assert_eq!(
            decide(&policy, &mut history, &clock, false),
            SupervisorDecision::Stop
        );
    }

    #[test]
    fn escalate_strategy_always_escalates() {
        let policy = SupervisionPolicy::escalate();
        let clock: SharedClock = Arc::new(ManualClock::new());
        let mut history = Vec::new();
        assert_eq!(
            decide(&policy, &mut history, &clock, false),
            SupervisorDecision::Escalate
        );
    }

    #[test]
    fn restart_within_budget_restarts_and_records_timestamp() {
        let policy = SupervisionPolicy::restart(2, 60);
        let clock: SharedClock = Arc::new(ManualClock::new());
        let mut history = Vec::new();
        assert_eq!(
            decide(&policy, &mut history, &clock, false),
            SupervisorDecision::Restart
        );
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn restart_budget_exhaustion_stops() {
        let policy = SupervisionPolicy::restart(2, 60);
        let clock: SharedClock = Arc::new(ManualClock::new());
        let mut history = Vec::new();
        assert_eq!(decide(&policy, &mut history, &clock, false), SupervisorDecision::Restart);
        assert_eq!(decide(&policy, &mut history, &clock, false), SupervisorDecision::Restart);
        assert_eq!(decide(&policy, &mut history, &clock, false), SupervisorDecision::Stop);
    }

    #[test]
    fn restarts_outside_window_roll_off() {
        let policy = SupervisionPolicy::restart(1, 10);
        let manual = Arc::new(ManualClock::new());
        let clock: SharedClock = manual.clone();
        let mut history = Vec::new();
        assert_eq!(decide(&policy, &mut history, &clock, false), SupervisorDecision::Restart);
        manual.advance(ChronoDuration::seconds(20));
        assert_eq!(decide(&policy, &mut history, &clock, false), SupervisorDecision::Restart);
    }

    #[test]
    fn already_stopping_is_ignored() {
        let policy = SupervisionPolicy::restart(2, 60);
        let clock: SharedClock = Arc::new(ManualClock::new());
        let mut history = Vec::new();
        assert_eq!(
            decide(&policy, &mut history, &clock, true),
            SupervisorDecision::Ignore
        );
        assert!(history.is_empty());
    }
}
