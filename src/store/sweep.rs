//! Background retention sweep
//!
//! Periodically purges entries older than the retention window. A failed or
//! panicking purge is logged and the loop carries on with the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::LogStore;

/// Default time between purge cycles
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Default age after which entries are purged
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Timing for the retention sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Time between purge cycles
    pub interval: Duration,
    /// Entries older than `now - retention` are dropped
    pub retention: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PURGE_INTERVAL,
            retention: DEFAULT_RETENTION,
        }
    }
}

/// Handle to control the running sweep task
///
/// Dropping the handle without calling `shutdown` also stops the sweep.
pub struct SweepHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stop the sweep and wait for the task to exit
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if the task already exited
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            error!(error = %e, "Retention sweep task ended abnormally");
        }
    }

    /// Check whether the sweep task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Spawn the retention sweep for `store`
///
/// The first purge runs immediately, then once per `config.interval`.
pub fn spawn(store: Arc<LogStore>, config: SweepConfig) -> SweepHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(run(store, config, shutdown_rx));

    SweepHandle {
        shutdown_tx: Some(shutdown_tx),
        task,
    }
}

async fn run(store: Arc<LogStore>, config: SweepConfig, mut shutdown_rx: oneshot::Receiver<()>) {
    info!(
        interval_secs = config.interval.as_secs(),
        retention_secs = config.retention.as_secs(),
        "Retention sweep started"
    );

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("Retention sweep shutting down");
                break;
            }
            _ = interval.tick() => {
                purge_cycle(Arc::clone(&store), config.retention).await;
            }
        }
    }
}

/// Run one purge on the blocking pool, swallowing any failure
async fn purge_cycle(store: Arc<LogStore>, retention: Duration) {
    let retention = match chrono::Duration::from_std(retention) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Retention window out of range, skipping purge");
            return;
        }
    };

    let result =
        tokio::task::spawn_blocking(move || store.purge(Utc::now(), retention)).await;

    match result {
        Ok(Ok(0)) => debug!("Purge cycle removed nothing"),
        Ok(Ok(removed)) => info!(removed, "Purged expired log entries"),
        Ok(Err(e)) => error!(error = %e, "Error during log purge"),
        Err(e) => error!(error = %e, "Log purge panicked"),
    }
}
