//! Retention policy, recovery/scan result types, and the read-time
//! filtering shared by every backend's `list_*` methods.

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How long persisted records are kept before a backend may reclaim
/// their storage, checked both physically (at `compact`) and on read
/// (at `list_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub max_records: Option<u64>,
    pub max_age_seconds: Option<i64>,
    pub max_total_bytes: Option<u64>,
}

impl RetentionPolicy {
    pub fn unbounded() -> Self {
        Self {
            max_records: None,
            max_age_seconds: None,
            max_total_bytes: None,
        }
    }

    pub fn bounded(max_records: u64, max_age_seconds: i64, max_total_bytes: u64) -> Self {
        Self {
            max_records: Some(max_records),
            max_age_seconds: Some(max_age_seconds),
            max_total_bytes: Some(max_total_bytes),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// How `recover` should react to a corrupted or truncated record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryMode {
    Ignore,
    Repair,
    Quarantine,
}

/// One anomaly found by `scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anomaly {
    TruncatedLine { offset: u64 },
    CorruptedLine { offset: u64, detail: String },
    OrphanSegment { path: String },
}

/// The outcome of scanning a backend's on-disk state for corruption
/// without modifying it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub records_seen: u64,
    pub anomalies: Vec<Anomaly>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Applies `since`, the policy's age cutoff, and the policy's record
/// cap, then finally `limit`, to a batch of records — in that order.
/// Returns newest-first, matching the persistence contract's read
/// semantics.
pub fn apply_read_filters<T>(
    mut items: Vec<T>,
    retention: &RetentionPolicy,
    limit: Option<usize>,
    since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    timestamp_of: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    if let Some(since) = since {
        items.retain(|item| timestamp_of(item) >= since);
    }
    if let Some(max_age) = retention.max_age_seconds {
        let cutoff = now - chrono::Duration::seconds(max_age);
        items.retain(|item| timestamp_of(item) >= cutoff);
    }
    items.sort_by_key(|item| std::cmp::Reverse(timestamp_of(item)));
    if let Some(max_records) = retention.max_records {
        items.truncate(max_records as usize);
    }
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::events::LifecycleEvent;
    use crate::util::ActorId;

    fn event_at(seconds_ago: i64) -> LifecycleEvent {
        LifecycleEvent {
            actor: Address::new("sys", ActorId(1)),
            timestamp: Utc::now() - chrono::Duration::seconds(seconds_ago),
            kind: crate::events::LifecycleEventKind::Started,
        }
    }

    #[test]
    fn filters_by_since_and_orders_newest_first() {
        let items = vec![event_at(30), event_at(10), event_at(20)];
        let now = Utc::now();
        let filtered = apply_read_filters(
            items,
            &RetentionPolicy::unbounded(),
            None,
            Some(now - chrono::Duration::seconds(25)),
            now,
            |e| e.timestamp,
        );
        assert_eq!(filtered.len(), 2);
        assert!(filtered[0].timestamp > filtered[1].timestamp);
    }

    #[test]
    fn caps_at_max_records_then_limit() {
        let items: Vec<_> = (0..10).map(event_at).collect();
        let now = Utc::now();
        let filtered = apply_read_filters(
            items,
            &RetentionPolicy::bounded(5, 3600, 1_000_000),
            Some(2),
            None,
            now,
            |e| e.timestamp,
        );
        assert_eq!(filtered.len(), 2);
    }
}
