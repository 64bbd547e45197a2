//! Expiry Sweep Task
//!
//! Background task that periodically removes expired entries from a
//! self-hosted store table.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::Result;

/// A table that can drop its expired entries in one pass.
#[async_trait]
pub trait Sweep: Send + Sync + 'static {
    /// Removes every expired entry and returns how many were removed.
    async fn sweep_expired(&self) -> Result<u64>;

    /// Label used in log output.
    fn name(&self) -> &str;
}

/// Spawns a background task that sweeps `target` every `interval`.
///
/// The task holds only a weak reference, so it ends on its own once the
/// table is dropped. Sweep failures are logged and ignored; the next tick
/// retries.
///
/// Must be called from within a tokio runtime.
pub fn spawn_sweep_task<T: Sweep>(target: &Arc<T>, interval: Duration) -> JoinHandle<()> {
    let target: Weak<T> = Arc::downgrade(target);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let Some(table) = target.upgrade() else {
                debug!("Sweep target dropped, stopping sweep task");
                break;
            };

            match table.sweep_expired().await {
                Ok(0) => debug!(store = table.name(), "Sweep: no expired entries found"),
                Ok(removed) => {
                    info!(store = table.name(), removed, "Sweep: removed expired entries")
                }
                Err(err) => {
                    debug!(store = table.name(), error = %err, "Sweep failed, retrying next tick")
                }
            }
        }
    })
}

// == Sweep Handle ==
/// Owns a store's sweep task.
///
/// The task is aborted by [`stop`](SweepHandle::stop) or when the handle is
/// dropped, so it never outlives its store.
#[derive(Debug)]
pub struct SweepHandle {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SweepHandle {
    /// Starts sweeping `target` every `interval`.
    pub fn spawn<T: Sweep>(target: &Arc<T>, interval: Duration) -> Self {
        info!(
            store = target.name(),
            interval_secs = interval.as_secs(),
            "Starting expiry sweep task"
        );
        Self {
            task: Mutex::new(Some(spawn_sweep_task(target, interval))),
        }
    }

    /// Aborts the sweep task. Returns false if it was already stopped.
    pub fn stop(&self) -> bool {
        match self.task.lock().take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Returns true while the sweep task is scheduled.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
