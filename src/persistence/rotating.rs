//! Rotating, byte-size-triggered NDJSON persistence backend.
//!
//! The active file is `<path>`. When an append would push it past
//! `max_bytes`, the backend rotates: the oldest rotated file (index
//! `max_files - 1`) is deleted if present, every remaining rotated
//! file shifts up by one index, the active file becomes `<path>.1`,
//! and a fresh empty active file is created. With `max_files == 1`
//! there is nowhere to rotate to, so the active file is truncated in
//! place instead.

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

pub struct RotatingBackend {
    path: PathBuf,
    max_bytes: u64,
    max_files: u64,
    retention: RetentionPolicy,
    lock: AsyncMutex<()>,
    metrics: PersistenceMetrics,
}

impl RotatingBackend {
    pub async fn open(
        path: impl AsRef<Path>,
        max_bytes: u64,
        max_files: u64,
    ) -> Result<Self, PersistenceError> {
        Self::open_with_retention(path, max_bytes, max_files, RetentionPolicy::unbounded()).await
    }

    pub async fn open_with_retention(
        path: impl AsRef<Path>,
        max_bytes: u64,
        max_files: u64,
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
            max_bytes: max_bytes.max(1),
            max_files: max_files.max(1),
            retention,
            lock: AsyncMutex::new(()),
            metrics: PersistenceMetrics::default(),
        })
    }

    fn rotated_path(&self, index: u64) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    async fn exists(path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// Oldest-to-newest list of the files this backend currently owns.
    async fn existing_paths(&self) -> Result<Vec<PathBuf>, PersistenceError> {
        let mut paths = Vec::new();
        let mut index = self.max_files.saturating_sub(1);
        while index >= 1 {
            let p = self.rotated_path(index);
            if Self::exists(&p).await {
                paths.push(p);
            }
            if index == 1 {
                break;
            }
            index -= 1;
        }
        paths.push(self.path.clone());
        Ok(paths)
    }

    fn base_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string()
    }

    async fn orphans(&self) -> Result<Vec<String>, PersistenceError> {
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = match dir {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        let base_name = self.base_name();
        let mut orphans = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == base_name {
                continue;
            }
            let Some(suffix) = name.strip_prefix(&format!("{base_name}.")) else {
                continue;
            };
            if suffix == "quarantine" {
                continue;
            }
            match suffix.parse::<u64>() {
                Ok(index) if index >= 1 && index <= self.max_files.saturating_sub(1) => continue,
                _ => orphans.push(name),
            }
        }
        Ok(orphans)
    }

    async fn rotate_locked(&self) -> Result<(), PersistenceError> {
        if self.max_files <= 1 {
            File::create(&self.path).await?;
            return Ok(());
        }
        let oldest = self.max_files - 1;
        let oldest_path = self.rotated_path(oldest);
        if Self::exists(&oldest_path).await {
            fs::remove_file(&oldest_path).await?;
        }
        let mut index = oldest;
        while index > 1 {
            let from = self.rotated_path(index - 1);
            if Self::exists(&from).await {
                fs::rename(&from, self.rotated_path(index)).await?;
            }
            index -= 1;
        }
        fs::rename(&self.path, self.rotated_path(1)).await?;
        File::create(&self.path).await?;
        Ok(())
    }

    async fn append_line(&self, record: &PersistedRecord) -> Result<(), PersistenceError> {
        let line = serde_json::to_string(record)?;
        let _guard = self.lock.lock().await;
        let current_len = fs::metadata(&self.path).await.map(|m| m.len()).unwrap_or(0);
        if current_len > 0 && current_len + line.len() as u64 + 1 > self.max_bytes {
            self.rotate_locked().await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        self.metrics.record_bytes(line.len() as u64 + 1);
        Ok(())
    }

    async fn all_lines(&self) -> Result<Vec<String>, PersistenceError> {
        let mut out = Vec::new();
        for path in self.existing_paths().await? {
            let file = File::open(&path).await?;
            let mut lines = BufReader::new(file).lines();
            while let Some(line) = lines.next_line().await? {
                out.push(line);
            }
        }
        Ok(out)
    }

    async fn list<F, T>(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
        filter: F,
    ) -> Result<Vec<T>, PersistenceError>
    where
        F: Fn(&PersistedRecord) -> Option<T>,
    {
        let lines = self.all_lines().await?;
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

    async fn rewrite_file(&self, path: &Path, lines: &[String]) -> Result<(), PersistenceError> {
        let mut name = path.as_os_str().to_os_string();
        name.push(".compact.tmp");
        let tmp_path = PathBuf::from(name);
        let mut tmp = File::create(&tmp_path).await?;
        for line in lines {
            tmp.write_all(line.as_bytes()).await?;
            tmp.write_all(b"\n").await?;
        }
        tmp.flush().await?;
        fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    async fn scan_inner(&self) -> Result<ScanReport, PersistenceError> {
        let mut report = ScanReport::default();
        for orphan in self.orphans().await? {
            report.anomalies.push(Anomaly::OrphanSegment { path: orphan });
        }
        let lines = self.all_lines().await?;
        let last_index = lines.len().saturating_sub(1);
        for (offset, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if serde_json::from_str::<PersistedRecord>(line).is_err() {
                let is_last = offset == last_index;
                if is_last && !line.trim_end().ends_with('}') {
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
        if matches!(mode, RecoveryMode::Ignore) {
            return Ok(report);
        }

        if matches!(mode, RecoveryMode::Quarantine) {
            let orphans = self.orphans().await?;
            if !orphans.is_empty() {
                let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
                let dir = match dir {
                    Some(dir) => dir.to_path_buf(),
                    None => PathBuf::from("."),
                };
                let quarantine_dir = dir.join(format!("{}.quarantine", self.base_name()));
                fs::create_dir_all(&quarantine_dir).await?;
                for orphan in orphans {
                    let from = dir.join(&orphan);
                    let to = quarantine_dir.join(&orphan);
                    fs::rename(&from, &to).await?;
                }
            }
        }

        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut kept = Vec::new();
        let mut quarantined = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if serde_json::from_str::<PersistedRecord>(&line).is_ok() {
                kept.push(line);
            } else {
                quarantined.push(line);
            }
        }
        if matches!(mode, RecoveryMode::Quarantine) && !quarantined.is_empty() {
            let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
            let dir = match dir {
                Some(dir) => dir.to_path_buf(),
                None => PathBuf::from("."),
            };
            let quarantine_dir = dir.join(format!("{}.quarantine", self.base_name()));
            fs::create_dir_all(&quarantine_dir).await?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(quarantine_dir.join("active.ndjson"))
                .await?;
            for line in &quarantined {
                file.write_all(line.as_bytes()).await?;
                file.write_all(b"\n").await?;
            }
        }
        self.rewrite_file(&self.path, &kept).await?;
        Ok(report)
    }

    async fn compact_inner(&self) -> Result<(), PersistenceError> {
        for path in self.existing_paths().await? {
            let file = File::open(&path).await?;
            let mut lines = BufReader::new(file).lines();
            let mut kept = Vec::new();
            while let Some(line) = lines.next_line().await? {
                if !line.trim().is_empty() && serde_json::from_str::<PersistedRecord>(&line).is_ok() {
                    kept.push(line);
                }
            }
            self.rewrite_file(&path, &kept).await?;
        }

        if let Some(max_bytes) = self.retention.max_total_bytes {
            loop {
                let paths = self.existing_paths().await?;
                let mut total = 0u64;
                for path in &paths {
                    total += fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
                }
                if total <= max_bytes || paths.len() <= 1 {
                    break;
                }
                let Some(oldest) = paths.first() else {
                    break;
                };
                if *oldest == self.path {
                    break;
                }
                fs::remove_file(oldest).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceBackend for RotatingBackend {
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

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::util::ActorId;

    async fn rotated_exists(path: &Path, index: u64) -> bool {
        let mut name = path.as_os_str().to_os_string();
        name.push(format!(".{index}"));
        fs::try_exists(PathBuf::from(name)).await.unwrap_or(false)
    }

    #[tokio::test]
    async fn rotates_once_active_file_exceeds_max_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.ndjson");
        let backend = RotatingBackend::open(&path, 120, 3).await.expect("open");
        let addr = Address::new("sys", ActorId(1));
        for _ in 0..10 {
            backend
                .record_event("sys", &LifecycleEvent::started(addr.clone()))
                .await;
        }
        assert!(rotated_exists(&path, 1).await);
        let events = backend.list_events(None, None).await.expect("list events");
        assert_eq!(events.len(), 10);
    }

    #[tokio::test]
    async fn truncates_in_place_when_max_files_is_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.ndjson");
        let backend = RotatingBackend::open(&path, 50, 1).await.expect("open");
        let addr = Address::new("sys", ActorId(1));
        for _ in 0..5 {
            backend
                .record_event("sys", &LifecycleEvent::started(addr.clone()))
                .await;
        }
        assert!(!rotated_exists(&path, 1).await);
    }

    #[tokio::test]
    async fn orphan_files_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.ndjson");
        let backend = RotatingBackend::open(&path, 1_000_000, 3).await.expect("open");
        fs::write(dir.path().join("events.ndjson.bak"), b"hi")
            .await
            .expect("write orphan");
        let report = backend.scan().await.expect("scan");
        assert!(report
            .anomalies
            .iter()
            .any(|a| matches!(a, Anomaly::OrphanSegment { .. })));
    }
}
