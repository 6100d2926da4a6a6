//! The flat, per-kind on-disk record shape shared by the NDJSON,
//! rotating, and stream-log backends: one JSON object per record,
//! tagged by a top-level `kind` field rather than a wrapper enum, so
//! an external reader never has to understand an internal Rust type
//! to parse a line.

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Layer 3: Internal crate imports
use crate::address::Address;
use crate::deadletter::DeadLetter;
use crate::events::{AuditSnapshot, LifecycleEvent, LifecycleEventKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PersistedRecord {
    #[serde(rename = "event")]
    Event {
        #[serde(default)]
        system_id: String,
        #[serde(default = "Address::unknown")]
        actor_address: Address,
        #[serde(default = "default_event_type")]
        event_type: String,
        #[serde(default)]
        payload: Value,
        timestamp: i64,
    },
    #[serde(rename = "audit")]
    Audit {
        system_id: String,
        timestamp: i64,
        total_actors: usize,
        alive_actors: usize,
        stopping_actors: usize,
        restarting_actors: usize,
        registry_size: usize,
        registry_orphans: Vec<String>,
        registry_dead: Vec<String>,
        dead_letters_count: usize,
    },
    #[serde(rename = "dead_letter")]
    DeadLetter {
        system_id: String,
        target: String,
        message_type: String,
        payload: Value,
        timestamp: i64,
    },
}

fn default_event_type() -> String {
    "ActorStarted".to_string()
}

impl PersistedRecord {
    pub fn from_event(system_id: &str, event: &LifecycleEvent) -> Self {
        let (event_type, payload) = match &event.kind {
            LifecycleEventKind::Started => ("ActorStarted", Value::Object(Default::default())),
            LifecycleEventKind::Restarted { reason } => {
                ("ActorRestarted", serde_json::json!({ "reason": reason }))
            }
            LifecycleEventKind::Crashed { error } => {
                ("ActorCrashed", serde_json::json!({ "error": error }))
            }
            LifecycleEventKind::Stopped { reason } => {
                ("ActorStopped", serde_json::json!({ "reason": reason }))
            }
        };
        Self::Event {
            system_id: system_id.to_string(),
            actor_address: event.actor.clone(),
            event_type: event_type.to_string(),
            payload,
            timestamp: event.timestamp.timestamp_millis(),
        }
    }

    pub fn from_audit(system_id: &str, snapshot: &AuditSnapshot) -> Self {
        Self::Audit {
            system_id: system_id.to_string(),
            timestamp: snapshot.generated_at.timestamp_millis(),
            total_actors: snapshot.total_actors,
            alive_actors: snapshot.alive_actors,
            stopping_actors: snapshot.stopping_actors,
            restarting_actors: snapshot.restarting_actors,
            registry_size: snapshot.registry_size,
            registry_orphans: snapshot.registry_orphans.clone(),
            registry_dead: snapshot.registry_dead.clone(),
            dead_letters_count: snapshot.dead_letters_count,
        }
    }

    pub fn from_dead_letter(system_id: &str, letter: &DeadLetter) -> Self {
        Self::DeadLetter {
            system_id: system_id.to_string(),
            target: letter.target.to_string(),
            message_type: if letter.expects_reply { "ask" } else { "tell" }.to_string(),
            payload: Value::String(letter.message.clone()),
            timestamp: letter.timestamp.timestamp_millis(),
        }
    }

    pub fn to_event(&self) -> Option<LifecycleEvent> {
        match self {
            Self::Event {
                actor_address,
                event_type,
                payload,
                timestamp,
                ..
            } => {
                let kind = match event_type.as_str() {
                    "ActorStarted" => LifecycleEventKind::Started,
                    "ActorRestarted" => LifecycleEventKind::Restarted {
                        reason: payload
                            .get("reason")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    },
                    "ActorCrashed" => LifecycleEventKind::Crashed {
                        error: payload
                            .get("error")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    },
                    "ActorStopped" => LifecycleEventKind::Stopped {
                        reason: payload
                            .get("reason")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    },
                    _ => return None,
                };
                Some(LifecycleEvent {
                    actor: actor_address.clone(),
                    timestamp: DateTime::from_timestamp_millis(*timestamp)?,
                    kind,
                })
            }
            _ => None,
        }
    }

    pub fn to_audit(&self) -> Option<AuditSnapshot> {
        match self {
            Self::Audit {
                timestamp,
                total_actors,
                alive_actors,
                stopping_actors,
                restarting_actors,
                registry_size,
                registry_orphans,
                registry_dead,
                dead_letters_count,
                ..
            } => Some(AuditSnapshot {
                generated_at: DateTime::from_timestamp_millis(*timestamp)?,
                total_actors: *total_actors,
                alive_actors: *alive_actors,
                stopping_actors: *stopping_actors,
                restarting_actors: *restarting_actors,
                registry_size: *registry_size,
                registry_orphans: registry_orphans.clone(),
                registry_dead: registry_dead.clone(),
                dead_letters_count: *dead_letters_count,
            }),
            _ => None,
        }
    }

    pub fn to_dead_letter(&self) -> Option<DeadLetter> {
        match self {
            Self::DeadLetter {
                target,
                message_type,
                payload,
                timestamp,
                ..
            } => Some(DeadLetter {
                target: target.parse().ok()?,
                message: payload
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| payload.to_string()),
                expects_reply: message_type == "ask",
                timestamp: DateTime::from_timestamp_millis(*timestamp)?,
            }),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let millis = match self {
            Self::Event { timestamp, .. }
            | Self::Audit { timestamp, .. }
            | Self::DeadLetter { timestamp, .. } => *timestamp,
        };
        DateTime::from_timestamp_millis(millis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::util::ActorId;

    #[test]
    fn event_round_trips_through_flat_json() {
        let event = LifecycleEvent::crashed(Address::new("sys", ActorId(1)), "boom");
        let record = PersistedRecord::from_event("sys", &event);
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["kind"], "event");
        assert_eq!(json["event_type"], "ActorCrashed");
        assert_eq!(json["payload"]["error"], "boom");

        let back = record.to_event().expect("reconstructs");
        assert_eq!(back.actor, event.actor);
        assert!(matches!(back.kind, LifecycleEventKind::Crashed { error } if error == "boom"));
    }

    #[test]
    fn minimal_event_record_with_only_timestamp_parses() {
        let record: PersistedRecord =
            serde_json::from_str(r#"{"kind":"event","timestamp":1}"#).expect("deserialize");
        let event = record.to_event().expect("reconstructs");
        assert_eq!(event.actor, Address::unknown());
        assert!(matches!(event.kind, LifecycleEventKind::Started));
    }

    #[test]
    fn dead_letter_round_trips_through_flat_json() {
        let letter = DeadLetter {
            target: Address::new("sys", ActorId(2)),
            message: "hello".to_string(),
            expects_reply: true,
            timestamp: Utc::now(),
        };
        let record = PersistedRecord::from_dead_letter("sys", &letter);
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["kind"], "dead_letter");
        assert_eq!(json["message_type"], "ask");

        let back = record.to_dead_letter().expect("reconstructs");
        assert_eq!(back.target, letter.target);
        assert!(back.expects_reply);
    }
}
