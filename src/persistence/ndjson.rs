//! Single-file, newline-delimited JSON persistence backend.
//!
//! Writes are serialized through an async mutex; `compact` rewrites a `.compact.tmp`
//! sibling and renames it over the original so readers never observe a
//! partially-written file.

// Layer 1: Standard library imports
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

// Layer 3: Internal crate imports
use crate::deadletter::DeadLetter;
use crate::events::{AuditSnapshot, LifecycleEvent};
use crate::persistence::metrics::{PersistenceMetrics, PersistenceMetricsSnapshot};
use crate::persistence::record::PersistedRecord;
use crate::persistence::retention::{apply_read_filters, Anomaly, RecoveryMode, RetentionPolicy, ScanReport};
use crate::persistence::traits::{PersistenceBackend, PersistenceError};

pub struct NdjsonBackend {
    path: PathBuf,
    retention: RetentionPolicy,
    write_lock: AsyncMutex<()>,
    metrics: PersistenceMetrics,
}

impl NdjsonBackend {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Self::open_with_retention(path, RetentionPolicy::unbounded()).await
    }

    pub async fn open_with_retention(
        path: impl AsRef<Path>,
        retention: RetentionPolicy,
    ) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            retention,
            write_lock: AsyncMutex::new(()),
            metrics: PersistenceMetrics::default(),
        })
    }

    async fn append_line(&self, record: &PersistedRecord) -> Result<(), PersistenceError> {
        let line = serde_json::to_string(record)?;
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new().append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        self.metrics.record_bytes(line.len() as u64 + 1);
        Ok(())
    }

    async fn read_lines(&self) -> Result<Vec<String>, PersistenceError> {
        let file = File::open(&self.path).await?;
        let mut lines = Vec::new();
        let mut reader = BufReader::new(file).lines();
        while let Some(line) = reader.next_line().await? {
            lines.push(line);
        }
        Ok(lines)
    }

    async fn list<F, T>(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
        filter: F,
    ) -> Result<Vec<T>, PersistenceError>
    where
        F: Fn(&PersistedRecord) -> Option<T>,
        T: Clone,
    {
        let lines = self.read_lines().await?;
        let mut items: Vec<(DateTime<Utc>, T)> = Vec::new();
        for line in &lines {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<PersistedRecord>(line) {
                if let (Some(ts), Some(item)) = (record.timestamp(), filter(&record)) {
                    items.push((ts, item));
                }
            }
        }
        let now = Utc::now();
        let filtered = apply_read_filters(items, &self.retention, limit, since, now, |(ts, _)| *ts);
        Ok(filtered.into_iter().map(|(_, item)| item).collect())
    }
}

#[async_trait]
impl PersistenceBackend for NdjsonBackend {
    async fn record_event(&self, system_id: &str, event: &LifecycleEvent) {
        if self
            .append_line(&PersistedRecord::from_event(system_id, event))
            .await
            .is_err()
        {
            warn!(actor = %event.actor, "failed to persist lifecycle event");
            self.metrics.events_failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.events_written.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn record_audit(&self, system_id: &str, snapshot: &AuditSnapshot) {
        if self
            .append_line(&PersistedRecord::from_audit(system_id, snapshot))
            .await
            .is_err()
        {
            self.metrics.audits_failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.audits_written.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn record_dead_letter(&self, system_id: &str, letter: &DeadLetter) {
        if self
            .append_line(&PersistedRecord::from_dead_letter(system_id, letter))
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
        self.list(limit, since, PersistedRecord::to_event).await
    }

    async fn list_audits(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AuditSnapshot>, PersistenceError> {
        self.list(limit, since, PersistedRecord::to_audit).await
    }

    async fn list_dead_letters(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeadLetter>, PersistenceError> {
        self.list(limit, since, PersistedRecord::to_dead_letter).await
    }

    async fn scan(&self) -> Result<ScanReport, PersistenceError> {
        let result = self.scan_inner().await;
        self.metrics.record_scan(
            result.as_ref().map(|r| r.anomalies.len()).unwrap_or(0),
            result.is_err(),
        );
        result
    }

    async fn recover(&self, mode: RecoveryMode) -> Result<ScanReport, PersistenceError> {
        let result = self.recover_inner(mode).await;
        self.metrics.record_recovery(result.is_err());
        result
    }

    async fn compact(&self) -> Result<(), PersistenceError> {
        let result = self.compact_inner().await;
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

impl NdjsonBackend {
    async fn scan_inner(&self) -> Result<ScanReport, PersistenceError> {
        let lines = self.read_lines().await?;
        let mut report = ScanReport::default();
        let last_index = lines.len().saturating_sub(1);
        for (offset, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if serde_json::from_str::<PersistedRecord>(line).is_err() {
                let is_last = offset == last_index;
                let looks_truncated = is_last && !line.trim_end().ends_with('}');
                if looks_truncated {
                    report.anomalies.push(Anomaly::TruncatedLine {
                        offset: offset as u64,
                    });
                } else {
                    report.anomalies.push(Anomaly::CorruptedLine {
                        offset: offset as u64,
                        detail: "invalid JSON".to_string(),
                    });
                }
            } else {
                report.records_seen += 1;
            }
        }
        Ok(report)
    }

    async fn recover_inner(&self, mode: RecoveryMode) -> Result<ScanReport, PersistenceError> {
        let report = self.scan_inner().await?;
        match mode {
            RecoveryMode::Ignore => Ok(report),
            RecoveryMode::Repair | RecoveryMode::Quarantine => {
                if report.is_clean() {
                    return Ok(report);
                }
                let lines = self.read_lines().await?;
                let bad_offsets: std::collections::HashSet<u64> = report
                    .anomalies
                    .iter()
                    .map(|a| match a {
                        Anomaly::TruncatedLine { offset } => *offset,
                        Anomaly::CorruptedLine { offset, .. } => *offset,
                        Anomaly::OrphanSegment { .. } => u64::MAX,
                    })
                    .collect();
                if mode == RecoveryMode::Quarantine {
                    let quarantine: Vec<&String> = lines
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| bad_offsets.contains(&(*i as u64)))
                        .map(|(_, line)| line)
                        .collect();
                    if !quarantine.is_empty() {
                        let quarantine_path = self.path.with_extension("quarantine.ndjson");
                        let mut file = OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(&quarantine_path)
                            .await?;
                        for line in quarantine {
                            file.write_all(line.as_bytes()).await?;
                            file.write_all(b"\n").await?;
                        }
                    }
                }
                let kept: Vec<String> = lines
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| !bad_offsets.contains(&(*i as u64)))
                    .map(|(_, line)| line)
                    .collect();
                self.rewrite(&kept).await?;
                Ok(report)
            }
        }
    }

    async fn compact_inner(&self) -> Result<(), PersistenceError> {
        let lines = self.read_lines().await?;
        let now = Utc::now();
        let mut kept_with_ts: Vec<(DateTime<Utc>, String)> = lines
            .into_iter()
            .filter_map(|line| {
                if line.trim().is_empty() {
                    return None;
                }
                let record = serde_json::from_str::<PersistedRecord>(&line).ok()?;
                let ts = record.timestamp()?;
                Some((ts, line))
            })
            .collect();
        kept_with_ts = apply_read_filters(kept_with_ts, &self.retention, None, None, now, |(ts, _)| *ts);
        if let Some(max_bytes) = self.retention.max_total_bytes {
            let mut total = 0u64;
            let mut within_budget = Vec::new();
            for entry in kept_with_ts {
                total += entry.1.len() as u64 + 1;
                if total > max_bytes {
                    break;
                }
                within_budget.push(entry);
            }
            kept_with_ts = within_budget;
        }
        kept_with_ts.sort_by_key(|(ts, _)| *ts);
        let kept: Vec<String> = kept_with_ts.into_iter().map(|(_, line)| line).collect();
        self.rewrite(&kept).await
    }

    /// Rewrites the file atomically via a `.compact.tmp` sibling plus
    /// rename, so a reader never observes a half-written file.
    async fn rewrite(&self, lines: &[String]) -> Result<(), PersistenceError> {
        let tmp_path = self.path.with_extension("compact.tmp");
        let _guard = self.write_lock.lock().await;
        let mut tmp = File::create(&tmp_path).await?;
        for line in lines {
            tmp.write_all(line.as_bytes()).await?;
            tmp.write_all(b"\n").await?;
        }
        tmp.flush().await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::util::ActorId;

    #[tokio::test]
    async fn writes_and_reads_back_events() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.ndjson");
        let backend = NdjsonBackend::open(&path).await.expect("open backend");
        let addr = Address::new("sys", ActorId(1));
        backend.record_event("sys", &LifecycleEvent::started(addr.clone())).await;
        backend
            .record_event("sys", &LifecycleEvent::stopped(addr.clone(), None))
            .await;

        let events = backend.list_events(None, None).await.expect("list events");
        assert_eq!(events.len(), 2);
        assert_eq!(backend.metrics().events_written, 2);
    }

    #[tokio::test]
    async fn scan_reports_corrupted_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.ndjson");
        let backend = NdjsonBackend::open(&path).await.expect("open backend");
        let addr = Address::new("sys", ActorId(1));
        backend.record_event("sys", &LifecycleEvent::started(addr)).await;

        {
            let mut file = OpenOptions::new().append(true).open(&path).await.expect("open");
            file.write_all(b"not valid json\n").await.expect("write garbage");
        }

        let report = backend.scan().await.expect("scan");
        assert!(!report.is_clean());
        assert_eq!(report.records_seen, 1);
        assert_eq!(backend.metrics().scans, 1);
    }

    #[tokio::test]
    async fn compact_drops_corrupted_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.ndjson");
        let backend = NdjsonBackend::open(&path).await.expect("open backend");
        let addr = Address::new("sys", ActorId(1));
        backend.record_event("sys", &LifecycleEvent::started(addr)).await;
        {
            let mut file = OpenOptions::new().append(true).open(&path).await.expect("open");
            file.write_all(b"garbage\n").await.expect("write garbage");
        }

        backend.compact().await.expect("compact");
        let report = backend.scan().await.expect("scan after compact");
        assert!(report.is_clean());
        assert_eq!(report.records_seen, 1);
    }

    #[tokio::test]
    async fn recover_quarantine_copies_bad_lines_aside() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.ndjson");
        let backend = NdjsonBackend::open(&path).await.expect("open backend");
        let addr = Address::new("sys", ActorId(1));
        backend.record_event("sys", &LifecycleEvent::started(addr)).await;
        {
            let mut file = OpenOptions::new().append(true).open(&path).await.expect("open");
            file.write_all(b"garbage\n").await.expect("write garbage");
        }

        backend
            .recover(RecoveryMode::Quarantine)
            .await
            .expect("recover");
        let quarantine_path = path.with_extension("quarantine.ndjson");
        let contents = fs::read_to_string(&quarantine_path).await.expect("quarantine file exists");
        assert!(contents.contains("garbage"));
        let report = backend.scan().await.expect("scan after recovery");
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn repair_keeps_minimal_record_and_drops_truncated_tail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.ndjson");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .expect("create");
            file.write_all(b"{\"kind\":\"event\",\"timestamp\":1}\n{\"kind\":\"event\"")
                .await
                .expect("write scenario bytes");
        }

        let backend = NdjsonBackend::open(&path).await.expect("open backend");
        let report = backend.scan().await.expect("scan");
        assert_eq!(report.records_seen, 1);
        assert_eq!(report.anomalies.len(), 1);
        assert!(matches!(report.anomalies[0], Anomaly::TruncatedLine { offset: 1 }));

        backend
            .recover(RecoveryMode::Repair)
            .await
            .expect("recover");

        let contents = fs::read_to_string(&path).await.expect("read back");
        assert_eq!(contents, "{\"kind\":\"event\",\"timestamp\":1}\n");

        let events = backend.list_events(None, None).await.expect("list events");
        assert_eq!(events.len(), 1);
    }
}
