//! Domain layer: checks, probe outcomes, log entries and record validation.
//!
//! Everything in here is pure data plus the rules that relate it; no I/O.

pub mod check;
pub mod check_id;
pub mod outcome;
pub mod validation;

pub use check::{Check, CheckState, HttpMethod, Protocol};
pub use check_id::CheckId;
pub use outcome::{CheckOutcome, LogEntry};
pub use validation::{ValidationError, validate_check};
