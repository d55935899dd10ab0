//! Probe outcomes and the log entries built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Check, CheckState};

/// `errorDetail` value recorded when the probe deadline elapsed.
pub const TIMEOUT_DETAIL: &str = "timeout";

/// Classified result of a single probe. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    /// `true` for transport errors and timeouts.
    pub had_error: bool,
    /// Transport error description, or `"timeout"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Status code of the response, if one arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,
}

impl CheckOutcome {
    /// A response was received.
    #[must_use]
    pub const fn responded(code: u16) -> Self {
        Self {
            had_error: false,
            error_detail: None,
            response_code: Some(code),
        }
    }

    /// A transport-level error occurred before any response.
    #[must_use]
    pub fn transport_error(detail: impl Into<String>) -> Self {
        Self {
            had_error: true,
            error_detail: Some(detail.into()),
            response_code: None,
        }
    }

    /// The deadline elapsed with no response.
    #[must_use]
    pub fn timed_out() -> Self {
        Self::transport_error(TIMEOUT_DETAIL)
    }

    /// Returns `true` if this outcome is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.had_error && self.error_detail.as_deref() == Some(TIMEOUT_DETAIL)
    }
}

/// One line of a check's log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The check as it was before this run.
    pub check: Check,
    /// What the probe observed.
    pub outcome: CheckOutcome,
    /// State computed from the outcome.
    pub state: CheckState,
    /// Whether the run was judged to warrant an alert.
    #[serde(rename = "alertSent")]
    pub alert_warranted: bool,
    /// When the outcome was processed.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Serializes the entry as a single JSON line (no trailing newline).
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
