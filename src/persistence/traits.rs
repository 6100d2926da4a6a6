//! Persistence contract shared by the NDJSON, rotating, and stream-log
//! backends.

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// Layer 3: Internal crate imports
use crate::deadletter::DeadLetter;
use crate::events::{AuditSnapshot, LifecycleEvent};
use crate::persistence::metrics::PersistenceMetricsSnapshot;
use crate::persistence::retention::{RecoveryMode, ScanReport};

/// Failures from the read/maintenance side of a persistence backend.
/// Hot-path `record_*` calls never produce this type.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("record at offset {offset} is corrupted: {detail}")]
    Corrupted { offset: u64, detail: String },
}

/// Append-only persistence for actor lifecycle events, audit snapshots,
/// and dead letters, with scan/recover/compact maintenance operations.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Append an event. Never propagates failure; implementations must
    /// increment their own failure metric instead.
    async fn record_event(&self, system_id: &str, event: &LifecycleEvent);

    async fn record_audit(&self, system_id: &str, snapshot: &AuditSnapshot);

    async fn record_dead_letter(&self, system_id: &str, letter: &DeadLetter);

    /// Returns the newest `limit` records (all if `None`) with a
    /// timestamp at or after `since`, with the configured retention
    /// policy already applied.
    async fn list_events(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LifecycleEvent>, PersistenceError>;

    async fn list_audits(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AuditSnapshot>, PersistenceError>;

    async fn list_dead_letters(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeadLetter>, PersistenceError>;

    /// Inspect on-disk state for corruption without modifying it.
    async fn scan(&self) -> Result<ScanReport, PersistenceError>;

    /// Apply `mode` to whatever `scan` would report.
    async fn recover(&self, mode: RecoveryMode) -> Result<ScanReport, PersistenceError>;

    /// Reclaim space for records outside the configured retention
    /// policy, atomically where the backend supports it.
    async fn compact(&self) -> Result<(), PersistenceError>;

    async fn close(&self) -> Result<(), PersistenceError>;

    fn metrics(&self) -> PersistenceMetricsSnapshot;
}
