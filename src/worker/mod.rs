//! Background worker: periodic check sweeps and log rotation.
//!
//! ```text
//! Scheduler ──tick──▶ run_check_sweep ──▶ per check (bounded concurrency):
//!                                          InFlight guard
//!                                          store.read → validate_check
//!                                          Prober::probe
//!                                          process_outcome
//!                                            ├─ archive.append
//!                                            ├─ store.update
//!                                            └─ notifier.send (on transition)
//!
//! Scheduler ──tick──▶ run_rotation_sweep ──▶ per log: compress → truncate
//! ```

pub mod context;
pub mod in_flight;
pub mod probe;
pub mod processor;
pub mod scheduler;
pub mod sweep;

#[cfg(test)]
mod test_support;

pub use context::{StatsSnapshot, WorkerContext, WorkerStats};
pub use in_flight::{InFlight, InFlightGuard};
pub use probe::Prober;
pub use processor::{Evaluation, ProcessReport, alert_message, evaluate, process_outcome};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use sweep::{CheckSweepReport, RotationReport, run_check_sweep, run_rotation_sweep};
