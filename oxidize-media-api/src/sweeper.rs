//! Periodic removal of stale staged files.

use std::sync::Arc;
use std::time::Duration;

use oxidize_media::{SweepReport, TempStore};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Run one sweep on the blocking pool.
pub async fn sweep_once(temp: Arc<TempStore>) -> Option<SweepReport> {
    match tokio::task::spawn_blocking(move || temp.sweep_expired()).await {
        Ok(report) => Some(report),
        Err(err) => {
            warn!(error = %err, "Temp sweep task failed");
            None
        }
    }
}

/// Sweep `temp` every `every`, starting immediately. Runs until aborted.
pub fn spawn_sweeper(temp: Arc<TempStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweep_once(Arc::clone(&temp)).await {
                Some(report) if report.removed > 0 || report.failed > 0 => info!(
                    scanned = report.scanned,
                    removed = report.removed,
                    failed = report.failed,
                    "Swept stale temp files"
                ),
                Some(report) => debug!(scanned = report.scanned, "Nothing to sweep"),
                None => {}
            }
        }
    })
}
