//! Redis Streams persistence backend, supplemented with
//! consumer-group operations (`consume`/`ack`/`pending_summary`/
//! `claim`) that have no counterpart in the original reference
//! implementation's plain XADD/XRANGE/XTRIM/XDEL usage but are
//! idiomatic `redis-rs` additions for at-least-once consumption.

// Layer 1: Standard library imports
use std::sync::atomic::Ordering;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::streams::{StreamClaimReply, StreamPendingReply, StreamRangeReply};
use redis::{AsyncCommands, RedisError};
use serde_json::Value;
use tracing::warn;

// Layer 3: Internal crate imports
use crate::deadletter::DeadLetter;
use crate::events::{AuditSnapshot, LifecycleEvent};
use crate::persistence::metrics::{PersistenceMetrics, PersistenceMetricsSnapshot};
use crate::persistence::record::PersistedRecord;
use crate::persistence::retention::{apply_read_filters, Anomaly, RecoveryMode, RetentionPolicy, ScanReport};
use crate::persistence::traits::{PersistenceBackend, PersistenceError};

const PAYLOAD_FIELD: &str = "data";
/// How many of the newest entries per stream `scan` samples for
/// payload corruption, rather than reading every entry on every scan.
const SCAN_SAMPLE_SIZE: usize = 200;

impl From<RedisError> for PersistenceError {
    fn from(err: RedisError) -> Self {
        PersistenceError::Unavailable(err.to_string())
    }
}

/// Stream keys a [`StreamLogBackend`] writes to and reads from.
#[derive(Debug, Clone)]
pub struct StreamKeys {
    pub events: String,
    pub audits: String,
    pub dead_letters: String,
}

impl StreamKeys {
    pub fn namespaced(prefix: impl AsRef<str>, system: impl AsRef<str>) -> Self {
        let prefix = prefix.as_ref();
        let system = system.as_ref();
        Self {
            events: format!("{prefix}:{system}:events"),
            audits: format!("{prefix}:{system}:audits"),
            dead_letters: format!("{prefix}:{system}:dead_letters"),
        }
    }
}

/// Mirrors the spec's `:_` substitution rule for quarantine keys: a
/// quarantine key is the source key with every `:` replaced by `:_`.
fn quarantine_key(source: &str) -> String {
    source.replace(':', ":_")
}

pub struct StreamLogBackend {
    conn: ConnectionManager,
    keys: StreamKeys,
    retention: RetentionPolicy,
    metrics: PersistenceMetrics,
}

impl StreamLogBackend {
    pub async fn connect(url: &str, keys: StreamKeys) -> Result<Self, PersistenceError> {
        Self::connect_with_retention(url, keys, RetentionPolicy::unbounded()).await
    }

    pub async fn connect_with_retention(
        url: &str,
        keys: StreamKeys,
        retention: RetentionPolicy,
    ) -> Result<Self, PersistenceError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            keys,
            retention,
            metrics: PersistenceMetrics::default(),
        })
    }

    async fn xadd_json(&self, key: &str, payload: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        let _id: String = conn.xadd(key, "*", &[(PAYLOAD_FIELD, payload)]).await?;
        self.metrics.record_bytes(payload.len() as u64);
        Ok(())
    }

    async fn xrange_entries(&self, key: &str) -> Result<Vec<(String, Option<String>)>, PersistenceError> {
        let mut conn = self.conn.clone();
        let reply: StreamRangeReply = conn.xrange(key, "-", "+").await?;
        let mut out = Vec::new();
        for id in reply.ids {
            let payload = match id.map.get(PAYLOAD_FIELD) {
                Some(redis::Value::BulkString(bytes)) => {
                    Some(String::from_utf8_lossy(bytes).to_string())
                }
                _ => None,
            };
            out.push((id.id, payload));
        }
        Ok(out)
    }

    async fn decode_entries<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Vec<T>, PersistenceError> {
        let entries = self.xrange_entries(key).await?;
        let mut items = Vec::new();
        for (_, payload) in entries {
            let Some(payload) = payload else { continue };
            if let Ok(value) = serde_json::from_str::<T>(&payload) {
                items.push(value);
            }
        }
        Ok(items)
    }

    /// Trims a stream to at most `max_len` entries, oldest first.
    pub async fn trim(&self, stream: &str, max_len: usize) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .xtrim(stream, redis::streams::StreamMaxlen::Approx(max_len))
            .await?;
        Ok(())
    }

    /// Deletes a specific entry id from a stream,
    /// used by quarantine republish to remove a corrupted entry after
    /// it has been copied elsewhere.
    pub async fn delete_entry(&self, stream: &str, id: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.xdel(stream, &[id]).await?;
        Ok(())
    }

    /// Ensures a consumer group exists on `stream`, creating the
    /// stream itself if necessary.
    pub async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        let result: Result<(), RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(stream)
            .arg(group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.to_string().contains("BUSYGROUP") => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Reads up to `count` undelivered entries for `consumer` in
    /// `group` (a supplemented consumer-group op beyond plain XADD/XRANGE).
    pub async fn consume(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<(String, String)>, PersistenceError> {
        let mut conn = self.conn.clone();
        let opts = redis::streams::StreamReadOptions::default()
            .group(group, consumer)
            .count(count);
        let reply: redis::streams::StreamReadReply =
            conn.xread_options(&[stream], &[">"], &opts).await?;
        let mut out = Vec::new();
        for key in reply.keys {
            for id in key.ids {
                if let Some(redis::Value::BulkString(bytes)) = id.map.get(PAYLOAD_FIELD) {
                    out.push((id.id, String::from_utf8_lossy(bytes).to_string()));
                }
            }
        }
        Ok(out)
    }

    /// Acknowledges delivery of `ids` in `group` (supplemented op).
    pub async fn ack(&self, stream: &str, group: &str, ids: &[String]) -> Result<(), PersistenceError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.xack(stream, group, ids).await?;
        Ok(())
    }

    /// Summarizes outstanding unacknowledged entries for `group`
    /// (supplemented op, via XPENDING summary form).
    pub async fn pending_summary(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<StreamPendingReply, PersistenceError> {
        let mut conn = self.conn.clone();
        let reply: StreamPendingReply = conn.xpending(stream, group).await?;
        Ok(reply)
    }

    /// Claims entries idle longer than `min_idle_ms` for `consumer`
    /// (supplemented op, via XCLAIM).
    pub async fn claim(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        min_idle_ms: usize,
        ids: &[String],
    ) -> Result<StreamClaimReply, PersistenceError> {
        let mut conn = self.conn.clone();
        let reply: StreamClaimReply = conn
            .xclaim(stream, group, consumer, min_idle_ms, ids)
            .await?;
        Ok(reply)
    }

    /// Samples the newest entries of `stream` and flags any whose
    /// payload field is missing, not a string, not valid JSON, or not
    /// a JSON object.
    async fn scan_stream(&self, stream: &str) -> Result<(u64, Vec<Anomaly>), PersistenceError> {
        let entries = self.xrange_entries(stream).await?;
        let sample_start = entries.len().saturating_sub(SCAN_SAMPLE_SIZE);
        let mut anomalies = Vec::new();
        let mut records_seen = 0u64;
        for (offset, (_id, payload)) in entries.iter().enumerate().skip(sample_start) {
            match payload {
                None => anomalies.push(Anomaly::CorruptedLine {
                    offset: offset as u64,
                    detail: "missing payload field".to_string(),
                }),
                Some(raw) => match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Object(_)) => records_seen += 1,
                    Ok(_) => anomalies.push(Anomaly::CorruptedLine {
                        offset: offset as u64,
                        detail: "payload is not a JSON object".to_string(),
                    }),
                    Err(_) => anomalies.push(Anomaly::CorruptedLine {
                        offset: offset as u64,
                        detail: "payload is not valid JSON".to_string(),
                    }),
                },
            }
        }
        records_seen += sample_start as u64;
        Ok((records_seen, anomalies))
    }

    async fn recover_stream(
        &self,
        stream: &str,
        mode: RecoveryMode,
    ) -> Result<(), PersistenceError> {
        if matches!(mode, RecoveryMode::Ignore) {
            return Ok(());
        }
        let entries = self.xrange_entries(stream).await?;
        for (id, payload) in entries {
            let bad = match &payload {
                None => true,
                Some(raw) => !matches!(serde_json::from_str::<Value>(raw), Ok(Value::Object(_))),
            };
            if !bad {
                continue;
            }
            if matches!(mode, RecoveryMode::Quarantine) {
                let qkey = quarantine_key(stream);
                let fields = payload.as_deref().unwrap_or("");
                self.xadd_json(
                    &qkey,
                    &serde_json::json!({
                        "source_key": stream,
                        "source_id": id,
                        "payload": fields,
                    })
                    .to_string(),
                )
                .await?;
            }
            self.delete_entry(stream, &id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceBackend for StreamLogBackend {
    async fn record_event(&self, system_id: &str, event: &LifecycleEvent) {
        let record = PersistedRecord::from_event(system_id, event);
        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(_) => {
                self.metrics.events_failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        if self.xadd_json(&self.keys.events, &payload).await.is_err() {
            warn!(actor = %event.actor, "failed to persist lifecycle event to stream");
            self.metrics.events_failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.events_written.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn record_audit(&self, system_id: &str, snapshot: &AuditSnapshot) {
        let record = PersistedRecord::from_audit(system_id, snapshot);
        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(_) => {
                self.metrics.audits_failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        if self.xadd_json(&self.keys.audits, &payload).await.is_err() {
            self.metrics.audits_failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.audits_written.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn record_dead_letter(&self, system_id: &str, letter: &DeadLetter) {
        let record = PersistedRecord::from_dead_letter(system_id, letter);
        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(_) => {
                self.metrics
                    .dead_letters_failed
                    .fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        if self
            .xadd_json(&self.keys.dead_letters, &payload)
            .await
            .is_err()
        {
            self.metrics
                .dead_letters_failed
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics
                .dead_letters_written
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn list_events(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LifecycleEvent>, PersistenceError> {
        let records: Vec<PersistedRecord> = self.decode_entries(&self.keys.events).await?;
        let events: Vec<LifecycleEvent> = records.iter().filter_map(PersistedRecord::to_event).collect();
        let now = Utc::now();
        Ok(apply_read_filters(
            events,
            &self.retention,
            limit,
            since,
            now,
            |e| e.timestamp,
        ))
    }

    async fn list_audits(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AuditSnapshot>, PersistenceError> {
        let records: Vec<PersistedRecord> = self.decode_entries(&self.keys.audits).await?;
        let audits: Vec<AuditSnapshot> = records.iter().filter_map(PersistedRecord::to_audit).collect();
        let now = Utc::now();
        Ok(apply_read_filters(
            audits,
            &self.retention,
            limit,
            since,
            now,
            |a| a.generated_at,
        ))
    }

    async fn list_dead_letters(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeadLetter>, PersistenceError> {
        let records: Vec<PersistedRecord> = self.decode_entries(&self.keys.dead_letters).await?;
        let letters: Vec<DeadLetter> = records
            .iter()
            .filter_map(PersistedRecord::to_dead_letter)
            .collect();
        let now = Utc::now();
        Ok(apply_read_filters(
            letters,
            &self.retention,
            limit,
            since,
            now,
            |l| l.timestamp,
        ))
    }

    async fn scan(&self) -> Result<ScanReport, PersistenceError> {
        let result = async {
            let mut report = ScanReport::default();
            for key in [&self.keys.events, &self.keys.audits, &self.keys.dead_letters] {
                let (seen, anomalies) = self.scan_stream(key).await?;
                report.records_seen += seen;
                report.anomalies.extend(anomalies);
            }
            Ok::<_, PersistenceError>(report)
        }
        .await;
        self.metrics.record_scan(
            result.as_ref().map(|r| r.anomalies.len()).unwrap_or(0),
            result.is_err(),
        );
        result
    }

    async fn recover(&self, mode: RecoveryMode) -> Result<ScanReport, PersistenceError> {
        let result = async {
            let report = self.scan().await?;
            for key in [&self.keys.events, &self.keys.audits, &self.keys.dead_letters] {
                self.recover_stream(key, mode).await?;
            }
            Ok::<_, PersistenceError>(report)
        }
        .await;
        self.metrics.record_recovery(result.is_err());
        result
    }

    /// Trims each stream to its retention policy's record cap, or a
    /// generous default when no policy is configured.
    async fn compact(&self) -> Result<(), PersistenceError> {
        let result = async {
            let cap = self.retention.max_records.unwrap_or(100_000) as usize;
            self.trim(&self.keys.events, cap).await?;
            self.trim(&self.keys.audits, self.retention.max_records.unwrap_or(10_000) as usize)
                .await?;
            self.trim(&self.keys.dead_letters, cap).await
        }
        .await;
        self.metrics.record_compaction(result.is_err());
        result
    }

    async fn close(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn metrics(&self) -> PersistenceMetricsSnapshot {
        self.metrics.snapshot()
    }
}
