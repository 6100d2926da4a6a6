//! Pluggable append-only persistence.

pub mod metrics;
pub mod ndjson;
pub mod record;
pub mod retention;
pub mod rotating;
pub mod stream_log;
pub mod traits;

pub use metrics::{PersistenceMetrics, PersistenceMetricsSnapshot};
pub use ndjson::NdjsonBackend;
pub use record::PersistedRecord;
pub use retention::{Anomaly, RecoveryMode, RetentionPolicy, ScanReport};
pub use rotating::RotatingBackend;
pub use stream_log::{StreamKeys, StreamLogBackend};
pub use traits::{PersistenceBackend, PersistenceError};
