//! Explicit worker context shared by every sweep task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use utoipa::ToSchema;

use super::in_flight::InFlight;
use super::probe::Prober;
use crate::archive::LogArchive;
use crate::config::WorkerSettings;
use crate::error::MonitorError;
use crate::notify::Notifier;
use crate::store::RecordStore;

/// Everything a sweep needs: collaborators, settings and shared state.
///
/// Built once at startup and handed to the scheduler behind an [`Arc`].
#[derive(Debug)]
pub struct WorkerContext {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    archive: LogArchive,
    prober: Prober,
    settings: WorkerSettings,
    in_flight: InFlight,
    stats: WorkerStats,
}

impl WorkerContext {
    /// Creates a context.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Internal`] if the probe HTTP client cannot
    /// be built.
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        archive: LogArchive,
        settings: WorkerSettings,
    ) -> Result<Self, MonitorError> {
        Ok(Self {
            store,
            notifier,
            archive,
            prober: Prober::new()?,
            settings,
            in_flight: InFlight::new(),
            stats: WorkerStats::default(),
        })
    }

    /// Record store holding the checks.
    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Alert channel.
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Per-check log archive.
    #[must_use]
    pub fn archive(&self) -> &LogArchive {
        &self.archive
    }

    /// Probe executor.
    #[must_use]
    pub fn prober(&self) -> &Prober {
        &self.prober
    }

    /// Sweep settings.
    #[must_use]
    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Single-flight guard for check ids.
    #[must_use]
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Running counters.
    #[must_use]
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }
}

/// Monotonic counters updated by the sweeps.
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Check sweeps started.
    pub check_sweeps: AtomicU64,
    /// Rotation sweeps started.
    pub rotation_sweeps: AtomicU64,
    /// Checks probed.
    pub checks_probed: AtomicU64,
    /// Records rejected by the validator.
    pub checks_invalid: AtomicU64,
    /// Checks skipped because another sweep held them.
    pub checks_skipped: AtomicU64,
    /// Checks that could not be read from the store.
    pub read_failures: AtomicU64,
    /// Updated checks that could not be written back.
    pub persist_failures: AtomicU64,
    /// Log entries that could not be appended.
    pub log_failures: AtomicU64,
    /// Alerts delivered.
    pub alerts_sent: AtomicU64,
    /// Alerts the notifier failed to deliver.
    pub alerts_failed: AtomicU64,
    /// Logs compressed and truncated.
    pub logs_rotated: AtomicU64,
    /// Logs whose rotation failed.
    pub rotation_failures: AtomicU64,
}

/// Increments a counter by one.
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl WorkerStats {
    /// Copies the counters into a serializable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            check_sweeps: load(&self.check_sweeps),
            rotation_sweeps: load(&self.rotation_sweeps),
            checks_probed: load(&self.checks_probed),
            checks_invalid: load(&self.checks_invalid),
            checks_skipped: load(&self.checks_skipped),
            read_failures: load(&self.read_failures),
            persist_failures: load(&self.persist_failures),
            log_failures: load(&self.log_failures),
            alerts_sent: load(&self.alerts_sent),
            alerts_failed: load(&self.alerts_failed),
            logs_rotated: load(&self.logs_rotated),
            rotation_failures: load(&self.rotation_failures),
        }
    }
}

/// Point-in-time copy of [`WorkerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatsSnapshot {
    /// Check sweeps started.
    pub check_sweeps: u64,
    /// Rotation sweeps started.
    pub rotation_sweeps: u64,
    /// Checks probed.
    pub checks_probed: u64,
    /// Records rejected by the validator.
    pub checks_invalid: u64,
    /// Checks skipped because another sweep held them.
    pub checks_skipped: u64,
    /// Checks that could not be read from the store.
    pub read_failures: u64,
    /// Updated checks that could not be written back.
    pub persist_failures: u64,
    /// Log entries that could not be appended.
    pub log_failures: u64,
    /// Alerts delivered.
    pub alerts_sent: u64,
    /// Alerts the notifier failed to deliver.
    pub alerts_failed: u64,
    /// Logs compressed and truncated.
    pub logs_rotated: u64,
    /// Logs whose rotation failed.
    pub rotation_failures: u64,
}
