//! Periodic removal of stale scratch files.

use std::time::Duration;

use mixcut_common::config::SweeperConfig;
use mixcut_render_engine::scratch::{ScratchDir, SweepReport};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Sweep `scratch` once on a blocking thread.
pub async fn sweep_once(scratch: &ScratchDir, max_age: Duration) -> SweepReport {
    let scratch = scratch.clone();
    match tokio::task::spawn_blocking(move || scratch.sweep(max_age)).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Scratch sweep panicked");
            SweepReport {
                failed: 1,
                ..SweepReport::default()
            }
        }
    }
}

/// Background sweeper. Sweeps immediately, then every `interval_secs`.
pub struct TempSweeper {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl TempSweeper {
    pub fn spawn(scratch: ScratchDir, config: &SweeperConfig) -> Self {
        let shutdown = CancellationToken::new();
        let max_age = Duration::from_secs(config.max_age_secs);
        let period = Duration::from_secs(config.interval_secs.max(1));

        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = sweep_once(&scratch, max_age).await;
                        if report.removed > 0 || report.failed > 0 {
                            tracing::info!(
                                dir = %scratch.root().display(),
                                removed = report.removed,
                                skipped_in_flight = report.skipped_in_flight,
                                failed = report.failed,
                                "Swept scratch directory"
                            );
                        } else {
                            tracing::debug!(scanned = report.scanned, "Scratch directory clean");
                        }
                    }
                }
            }
            tracing::debug!("Scratch sweeper stopped");
        });

        tracing::info!(
            max_age_secs = config.max_age_secs,
            interval_secs = period.as_secs(),
            "Scratch sweeper started"
        );
        Self { shutdown, handle }
    }

    /// Stop the sweeper and wait for an in-progress sweep to finish.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Scratch sweeper task failed");
        }
    }
}
