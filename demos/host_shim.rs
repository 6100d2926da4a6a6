//! Thin CLI host shim over the NDJSON and rotating backends' maintenance
//! operations. This is deliberately not a maintained command surface; it
//! only demonstrates wiring a local `tracing-subscriber` and calling
//! `scan`/`recover`/`compact` the way a real host integration would.
//!
//! Run with: cargo run --example host-shim -- ndjson scan ./events.ndjson

use anyhow::{bail, Context, Result};
use haven_rt::persistence::{
    NdjsonBackend, PersistenceBackend, RecoveryMode, RetentionPolicy, RotatingBackend,
};
use std::path::PathBuf;

fn parse_mode(raw: &str) -> Result<RecoveryMode> {
    match raw {
        "ignore" => Ok(RecoveryMode::Ignore),
        "repair" => Ok(RecoveryMode::Repair),
        "quarantine" => Ok(RecoveryMode::Quarantine),
        other => bail!("unknown recovery mode '{other}' (expected ignore|repair|quarantine)"),
    }
}

async fn run_operation(backend: &dyn PersistenceBackend, operation: &str, mode: Option<String>) -> Result<()> {
    match operation {
        "scan" => {
            let report = backend.scan().await.context("scan failed")?;
            println!("records_seen={} anomalies={}", report.records_seen, report.anomalies.len());
            for anomaly in &report.anomalies {
                println!("  {anomaly:?}");
            }
        }
        "recover" => {
            let mode = parse_mode(&mode.context("recover requires a mode: ignore|repair|quarantine")?)?;
            let report = backend.recover(mode).await.context("recover failed")?;
            println!("recovered, {} anomalies remaining", report.anomalies.len());
        }
        "compact" => {
            backend.compact().await.context("compact failed")?;
            println!("compaction complete");
        }
        other => bail!("unknown operation '{other}' (expected scan|recover|compact)"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let backend_kind = args
        .next()
        .context("usage: host-shim <ndjson|rotating> <scan|recover|compact> <path> [mode]")?;
    let operation = args.next().context("missing operation: scan|recover|compact")?;
    let path = PathBuf::from(args.next().context("missing path")?);
    let mode = args.next();

    match backend_kind.as_str() {
        "ndjson" => {
            let backend = NdjsonBackend::open_with_retention(&path, RetentionPolicy::unbounded())
                .await
                .context("opening NDJSON backend")?;
            run_operation(&backend, &operation, mode).await
        }
        "rotating" => {
            let backend = RotatingBackend::open(&path, 10 * 1024 * 1024, 5)
                .await
                .context("opening rotating backend")?;
            run_operation(&backend, &operation, mode).await
        }
        other => bail!("unknown backend '{other}' (expected ndjson|rotating)"),
    }
}
