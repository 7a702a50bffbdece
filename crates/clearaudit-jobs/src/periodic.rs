//! Fixed-interval background ticker with graceful shutdown.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use clearaudit_core::{Error, Result};

/// Handle for a running periodic task.
///
/// Dropping the handle closes the shutdown channel, which stops the loop at
/// its next wait.
pub struct PeriodicHandle {
    name: &'static str,
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl PeriodicHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal shutdown and wait for the current tick (if any) to finish.
    pub async fn stop(self) -> Result<()> {
        // A closed channel means the loop already exited.
        let _ = self.shutdown_tx.send(()).await;
        self.join
            .await
            .map_err(|e| Error::Cancelled(format!("{} loop did not stop cleanly: {}", self.name, e)))
    }
}

/// Run `tick` every `interval` on a background task.
///
/// The first tick runs one interval after the call. A tick in progress is
/// never interrupted; shutdown is observed between ticks.
pub fn spawn_periodic<F, Fut>(name: &'static str, interval: Duration, mut tick: F) -> PeriodicHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let join = tokio::spawn(async move {
        info!(
            component = name,
            interval_ms = interval.as_millis() as u64,
            "Periodic task started"
        );
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = sleep(interval) => {}
            }
            debug!(component = name, "Periodic tick");
            tick().await;
        }
        info!(component = name, "Periodic task stopped");
    });

    PeriodicHandle {
        name,
        shutdown_tx,
        join,
    }
}
