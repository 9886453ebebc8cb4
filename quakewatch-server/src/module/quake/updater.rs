///! Background poller driving cache refresh and change detection

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::cache::SnapshotCache;
use super::monitor::QuakeMonitor;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Periodically refreshes the snapshot cache and feeds the result to the
/// change monitor, independent of any inbound request.
pub struct QuakeUpdater {
    cache: Arc<SnapshotCache>,
    monitor: Arc<QuakeMonitor>,
    poll_interval: Duration,
    /// Head-of-bulletin marker, used only to log whether a poll cycle saw
    /// any movement; the monitor's own id diff decides what is broadcast.
    last_seen_id: Mutex<Option<String>>,
}

impl QuakeUpdater {
    pub fn new(
        cache: Arc<SnapshotCache>,
        monitor: Arc<QuakeMonitor>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            cache,
            monitor,
            poll_interval,
            last_seen_id: Mutex::new(None),
        }
    }

    /// Run one warming cycle inline (its failure is logged, not fatal),
    /// then spawn the perpetual polling loop.
    pub async fn start_with_initial_update(self: Arc<Self>) -> JoinHandle<()> {
        tracing::info!(
            "Starting bulletin poller (initial fetch + every {:?})",
            self.poll_interval
        );

        self.run_cycle().await;

        let updater = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(updater.poll_interval).await;
                updater.run_cycle().await;
            }
        })
    }

    /// One poll cycle. Never fails; a failed fetch is logged and the next
    /// cycle proceeds on schedule.
    async fn run_cycle(&self) {
        match self.cache.refresh().await {
            Ok(snapshot) => {
                let latest = snapshot.latest_id().map(str::to_string);
                {
                    let mut marker = self.last_seen_id.lock().await;
                    if *marker == latest {
                        tracing::debug!(
                            "Poll cycle: bulletin unchanged ({} entries)",
                            snapshot.quakes.len()
                        );
                    } else {
                        tracing::debug!(
                            "Poll cycle: bulletin head moved to {:?}",
                            latest
                        );
                        *marker = latest;
                    }
                }

                let broadcast = self.monitor.ingest(&snapshot).await;
                if broadcast > 0 {
                    tracing::info!("Poll cycle broadcast {} new earthquake(s)", broadcast);
                }
            }
            Err(e) => {
                tracing::error!("Poll cycle failed, keeping previous state: {}", e);
            }
        }
    }
}
