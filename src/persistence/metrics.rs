//! Persistence counters: per-kind write outcomes plus the
//! maintenance-operation counters the persistence contract promises.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters a persistence backend increments as it works. The
/// hot path (`record_*`) never surfaces failure as an error; it is
/// only observable here.
#[derive(Debug, Default)]
pub struct PersistenceMetrics {
    pub events_written: AtomicU64,
    pub events_failed: AtomicU64,
    pub audits_written: AtomicU64,
    pub audits_failed: AtomicU64,
    pub dead_letters_written: AtomicU64,
    pub dead_letters_failed: AtomicU64,
    pub bytes_written: AtomicU64,
    pub scans: AtomicU64,
    pub scan_errors: AtomicU64,
    pub anomalies_detected: AtomicU64,
    pub recoveries: AtomicU64,
    pub recovery_errors: AtomicU64,
    pub compactions: AtomicU64,
    pub compaction_errors: AtomicU64,
}

impl PersistenceMetrics {
    pub fn record_bytes(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_scan(&self, anomalies: usize, failed: bool) {
        self.scans.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.scan_errors.fetch_add(1, Ordering::Relaxed);
        }
        self.anomalies_detected
            .fetch_add(anomalies as u64, Ordering::Relaxed);
    }

    pub fn record_recovery(&self, failed: bool) {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.recovery_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_compaction(&self, failed: bool) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.compaction_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> PersistenceMetricsSnapshot {
        let events_written = self.events_written.load(Ordering::Relaxed);
        let audits_written = self.audits_written.load(Ordering::Relaxed);
        let dead_letters_written = self.dead_letters_written.load(Ordering::Relaxed);
        PersistenceMetricsSnapshot {
            events_written,
            events_failed: self.events_failed.load(Ordering::Relaxed),
            audits_written,
            audits_failed: self.audits_failed.load(Ordering::Relaxed),
            dead_letters_written,
            dead_letters_failed: self.dead_letters_failed.load(Ordering::Relaxed),
            records_written: events_written + audits_written + dead_letters_written,
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            scan_errors: self.scan_errors.load(Ordering::Relaxed),
            anomalies_detected: self.anomalies_detected.load(Ordering::Relaxed),
            recoveries: self.recoveries.load(Ordering::Relaxed),
            recovery_errors: self.recovery_errors.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
            compaction_errors: self.compaction_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistenceMetricsSnapshot {
    pub events_written: u64,
    pub events_failed: u64,
    pub audits_written: u64,
    pub audits_failed: u64,
    pub dead_letters_written: u64,
    pub dead_letters_failed: u64,
    pub records_written: u64,
    pub bytes_written: u64,
    pub scans: u64,
    pub scan_errors: u64,
    pub anomalies_detected: u64,
    pub recoveries: u64,
    pub recovery_errors: u64,
    pub compactions: u64,
    pub compaction_errors: u64,
}
