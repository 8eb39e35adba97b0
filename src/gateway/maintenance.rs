//! Background maintenance — TTL sweeper and debounced snapshot persister.
//!
//! Both are cooperative tokio tasks, one instance each, spawned by
//! [`Bragi::start_maintenance`](crate::Bragi::start_maintenance):
//!
//! - The **sweeper** ticks on a fixed interval and removes expired
//!   entries. Missed ticks are skipped, not replayed — a process suspended
//!   for an hour sweeps once on resume, it doesn't catch up sixty times.
//! - The **persister** waits for the cache's dirty signal, sleeps the
//!   debounce window so bursts of writes coalesce, then writes one
//!   snapshot. A single writer task plus atomic rename keeps concurrent
//!   save pressure last-write-wins.
//!
//! Persistence failures are logged and the cache keeps operating
//! memory-only; nothing here can fail the request path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::cache::{persist, ContentCache};
use crate::telemetry;

/// Handles to the running maintenance tasks.
pub struct MaintenanceTasks {
    sweeper: JoinHandle<()>,
    persister: Option<JoinHandle<()>>,
}

impl MaintenanceTasks {
    /// Abort both tasks. Saves already in progress run to completion
    /// (the loops only yield at await points).
    pub fn abort(&self) {
        self.sweeper.abort();
        if let Some(persister) = &self.persister {
            persister.abort();
        }
    }
}

impl Drop for MaintenanceTasks {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Spawn the sweeper and, when a snapshot path is configured, the persister.
pub(crate) fn spawn(
    cache: Arc<ContentCache>,
    snapshot_path: Option<PathBuf>,
    sweep_interval: Duration,
    save_debounce: Duration,
) -> MaintenanceTasks {
    let sweeper = tokio::spawn(run_sweeper(Arc::clone(&cache), sweep_interval));
    let persister =
        snapshot_path.map(|path| tokio::spawn(run_persister(cache, path, save_debounce)));
    MaintenanceTasks { sweeper, persister }
}

async fn run_sweeper(cache: Arc<ContentCache>, sweep_interval: Duration) {
    let mut interval = tokio::time::interval(sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; consume it so the first real
    // sweep happens one interval after startup.
    interval.tick().await;
    loop {
        interval.tick().await;
        let swept = cache.sweep_expired();
        if swept > 0 {
            debug!(swept, "ttl sweep removed expired entries");
        }
    }
}

async fn run_persister(cache: Arc<ContentCache>, path: PathBuf, save_debounce: Duration) {
    loop {
        cache.dirty_signal().changed().await;
        tokio::time::sleep(save_debounce).await;
        if !cache.dirty_signal().take() {
            continue;
        }
        match persist::save_snapshot(&path, cache.export()) {
            Ok(()) => {
                metrics::counter!(telemetry::SNAPSHOT_SAVES_TOTAL, "status" => "ok").increment(1);
                debug!(path = %path.display(), "saved cache snapshot");
            }
            Err(e) => {
                metrics::counter!(telemetry::SNAPSHOT_SAVES_TOTAL, "status" => "error")
                    .increment(1);
                warn!(path = %path.display(), error = %e, "snapshot save failed, cache continues memory-only");
            }
        }
    }
}
