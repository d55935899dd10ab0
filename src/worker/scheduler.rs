//! Periodic drivers for the check and rotation sweeps.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::WorkerContext;
use super::sweep::{run_check_sweep, run_rotation_sweep};

/// Starts the sweep loops.
#[derive(Debug)]
pub struct Scheduler {
    ctx: Arc<WorkerContext>,
}

impl Scheduler {
    /// Creates a scheduler over `ctx`.
    #[must_use]
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self { ctx }
    }

    /// Spawns both loops. Each sweep runs once immediately, then once per
    /// configured interval, until [`SchedulerHandle::shutdown`] is called.
    ///
    /// Every tick spawns its sweep as a separate task and does not wait
    /// for it, so a slow sweep may still be running when the next starts.
    #[must_use]
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let settings = self.ctx.settings().clone();

        tracing::info!(
            check_interval_secs = settings.check_interval.as_secs(),
            rotation_interval_secs = settings.rotation_interval.as_secs(),
            concurrency = settings.sweep_concurrency,
            "scheduler starting"
        );

        let check_ctx = Arc::clone(&self.ctx);
        let checks = spawn_periodic(
            "check_sweep",
            settings.check_interval,
            shutdown_rx.clone(),
            move || {
                let ctx = Arc::clone(&check_ctx);
                async move {
                    run_check_sweep(&ctx).await;
                }
            },
        );

        let rotation_ctx = Arc::clone(&self.ctx);
        let rotation = spawn_periodic(
            "rotation_sweep",
            settings.rotation_interval,
            shutdown_rx,
            move || {
                let ctx = Arc::clone(&rotation_ctx);
                async move {
                    run_rotation_sweep(&ctx).await;
                }
            },
        );

        SchedulerHandle {
            shutdown_tx,
            loops: vec![checks, rotation],
        }
    }
}

/// Stops the sweep loops.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    loops: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signals both loops to stop and waits for them to exit.
    ///
    /// Sweeps already spawned run to completion on the runtime; no new
    /// sweep starts after this returns.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.loops {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "scheduler loop ended abnormally");
            }
        }
        tracing::info!("scheduler stopped");
    }
}

fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    mut sweep: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!(sweep = name, "tick");
                    tokio::spawn(sweep());
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(sweep = name, "loop exited");
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::archive::LogArchive;
    use crate::config::WorkerSettings;
    use crate::notify::LogNotifier;
    use crate::store::FileRecordStore;

    fn context(dir: &TempDir, period: Duration) -> Arc<WorkerContext> {
        let settings = WorkerSettings {
            check_interval: period,
            rotation_interval: period,
            ..WorkerSettings::default()
        };
        let Ok(ctx) = WorkerContext::new(
            Arc::new(FileRecordStore::new(dir.path().join("data"))),
            Arc::new(LogNotifier),
            LogArchive::new(dir.path().join("logs")),
            settings,
        ) else {
            panic!("context");
        };
        Arc::new(ctx)
    }

    async fn wait_for(ctx: &WorkerContext, checks: u64, rotations: u64) -> bool {
        for _ in 0..100 {
            let stats = ctx.stats().snapshot();
            if stats.check_sweeps >= checks && stats.rotation_sweeps >= rotations {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn both_sweeps_run_immediately() {
        let Ok(dir) = TempDir::new() else {
            panic!("tempdir");
        };
        let ctx = context(&dir, Duration::from_secs(3600));
        let handle = Scheduler::new(Arc::clone(&ctx)).start();

        assert!(wait_for(&ctx, 1, 1).await);
        handle.shutdown().await;
        let stats = ctx.stats().snapshot();
        assert_eq!(stats.check_sweeps, 1);
        assert_eq!(stats.rotation_sweeps, 1);
    }

    #[tokio::test]
    async fn sweeps_repeat_each_period() {
        let Ok(dir) = TempDir::new() else {
            panic!("tempdir");
        };
        let ctx = context(&dir, Duration::from_millis(50));
        let handle = Scheduler::new(Arc::clone(&ctx)).start();

        assert!(wait_for(&ctx, 3, 3).await);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn no_sweep_starts_after_shutdown() {
        let Ok(dir) = TempDir::new() else {
            panic!("tempdir");
        };
        let ctx = context(&dir, Duration::from_millis(50));
        let handle = Scheduler::new(Arc::clone(&ctx)).start();
        assert!(wait_for(&ctx, 1, 1).await);
        handle.shutdown().await;

        // Let any sweep spawned by the last tick finish.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let settled = ctx.stats().snapshot();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(ctx.stats().snapshot(), settled);
    }
}
