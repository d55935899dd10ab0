//! One pass over all checks, and one pass over all active logs.

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::WorkerContext;
use super::context::bump;
use super::processor::{ProcessReport, process_outcome};
use crate::domain::{CheckId, CheckState, validate_check};
use crate::store::Collection;

/// Totals of one check sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckSweepReport {
    /// Id tagging this sweep's log lines.
    pub sweep_id: Uuid,
    /// Ids listed by the store.
    pub listed: usize,
    /// Checks probed.
    pub probed: usize,
    /// Records rejected by the validator (never probed).
    pub invalid: usize,
    /// Checks skipped because another sweep was processing them.
    pub skipped: usize,
    /// Records that could not be read.
    pub read_failures: usize,
    /// Checks found up.
    pub up: usize,
    /// Checks found down.
    pub down: usize,
    /// Alerts delivered.
    pub alerts: usize,
}

enum Unit {
    Skipped,
    Invalid,
    ReadFailed,
    Processed(ProcessReport),
}

/// Runs every stored check once: read, validate, probe, process.
///
/// Work units run concurrently up to the configured limit and are fully
/// independent: a failure in one never affects another. Checks held by an
/// overlapping sweep are skipped. Failing to list the store ends the sweep
/// early with an empty report.
pub async fn run_check_sweep(ctx: &WorkerContext) -> CheckSweepReport {
    let sweep_id = Uuid::new_v4();
    bump(&ctx.stats().check_sweeps);
    let span = tracing::info_span!("check_sweep", %sweep_id);

    async move {
        let mut report = CheckSweepReport {
            sweep_id,
            ..CheckSweepReport::default()
        };
        let ids = match ctx.store().list(Collection::Checks).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "could not list checks");
                return report;
            }
        };
        report.listed = ids.len();
        tracing::debug!(count = ids.len(), "check sweep started");

        let concurrency = ctx.settings().sweep_concurrency.max(1);
        let report = stream::iter(ids)
            .map(|raw_id| run_unit(ctx, raw_id))
            .buffer_unordered(concurrency)
            .fold(report, |mut report, unit| async move {
                match unit {
                    Unit::Skipped => report.skipped += 1,
                    Unit::Invalid => report.invalid += 1,
                    Unit::ReadFailed => report.read_failures += 1,
                    Unit::Processed(processed) => {
                        report.probed += 1;
                        match processed.evaluation.state {
                            CheckState::Up => report.up += 1,
                            CheckState::Down => report.down += 1,
                        }
                        if processed.alert_sent {
                            report.alerts += 1;
                        }
                    }
                }
                report
            })
            .await;

        tracing::info!(
            listed = report.listed,
            probed = report.probed,
            invalid = report.invalid,
            skipped = report.skipped,
            up = report.up,
            down = report.down,
            alerts = report.alerts,
            "check sweep finished"
        );
        report
    }
    .instrument(span)
    .await
}

async fn run_unit(ctx: &WorkerContext, raw_id: String) -> Unit {
    let id = match CheckId::parse(&raw_id) {
        Ok(id) => id,
        Err(e) => {
            bump(&ctx.stats().checks_invalid);
            tracing::warn!(check_id = %raw_id, error = %e, "skipping record with malformed id");
            return Unit::Invalid;
        }
    };

    let Some(_guard) = ctx.in_flight().try_acquire(&id) else {
        bump(&ctx.stats().checks_skipped);
        tracing::debug!(check_id = %id, "check still in flight, skipping");
        return Unit::Skipped;
    };

    let record = match ctx.store().read(Collection::Checks, id.as_str()).await {
        Ok(record) => record,
        Err(e) => {
            bump(&ctx.stats().read_failures);
            tracing::warn!(check_id = %id, error = %e, "could not read check");
            return Unit::ReadFailed;
        }
    };

    let check = match validate_check(&record) {
        Ok(check) if check.id == id => check,
        Ok(check) => {
            bump(&ctx.stats().checks_invalid);
            tracing::warn!(check_id = %id, stored_id = %check.id, "record id does not match its key");
            return Unit::Invalid;
        }
        Err(e) => {
            bump(&ctx.stats().checks_invalid);
            tracing::warn!(check_id = %id, error = %e, "invalid check, not probed");
            return Unit::Invalid;
        }
    };

    let outcome = ctx.prober().probe(&check).await;
    bump(&ctx.stats().checks_probed);
    Unit::Processed(process_outcome(ctx, record, check, outcome).await)
}

/// Totals of one rotation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    /// Id tagging this sweep's log lines.
    pub sweep_id: Uuid,
    /// Active logs listed.
    pub listed: usize,
    /// Logs compressed and truncated.
    pub rotated: usize,
    /// Logs whose compression or truncation failed.
    pub failed: usize,
    /// Logs skipped because their check was being processed.
    pub skipped: usize,
}

/// Compresses every active log into `<logId>-<millis>` and truncates it.
///
/// A log is truncated only after its segment was written. Logs of checks
/// currently being processed are left for the next rotation so that no
/// entry is appended between compression and truncation.
pub async fn run_rotation_sweep(ctx: &WorkerContext) -> RotationReport {
    let sweep_id = Uuid::new_v4();
    bump(&ctx.stats().rotation_sweeps);
    let span = tracing::info_span!("rotation_sweep", %sweep_id);

    async move {
        let mut report = RotationReport {
            sweep_id,
            ..RotationReport::default()
        };
        let log_ids = match ctx.archive().list(false).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "could not list logs");
                return report;
            }
        };
        report.listed = log_ids.len();

        for log_id in log_ids {
            let check_id = CheckId::parse(&log_id).ok();
            let guard = match &check_id {
                Some(id) => match ctx.in_flight().try_acquire(id) {
                    Some(guard) => Some(guard),
                    None => {
                        report.skipped += 1;
                        tracing::debug!(%log_id, "check in flight, rotation deferred");
                        continue;
                    }
                },
                None => None,
            };

            let archive_id = format!("{log_id}-{}", Utc::now().timestamp_millis());
            if let Err(e) = ctx.archive().compress(&log_id, &archive_id).await {
                report.failed += 1;
                bump(&ctx.stats().rotation_failures);
                tracing::warn!(%log_id, error = %e, "could not compress log");
                continue;
            }
            match ctx.archive().truncate(&log_id).await {
                Ok(()) => {
                    report.rotated += 1;
                    bump(&ctx.stats().logs_rotated);
                    tracing::debug!(%log_id, %archive_id, "log rotated");
                }
                Err(e) => {
                    report.failed += 1;
                    bump(&ctx.stats().rotation_failures);
                    tracing::warn!(%log_id, %archive_id, error = %e, "could not truncate log");
                }
            }
            drop(guard);
        }

        tracing::info!(
            listed = report.listed,
            rotated = report.rotated,
            failed = report.failed,
            skipped = report.skipped,
            "rotation sweep finished"
        );
        report
    }
    .instrument(span)
    .await
}
