//! Normalization of raw check records read from the store.
//!
//! Records are written by the API layer and may be incomplete, carry stale
//! legacy keys, or be outright garbage (an unparseable file reads as an
//! empty object). [`validate_check`] turns such a record into a [`Check`]
//! or reports every field that is missing or invalid. Execution history
//! (`state`, `lastCheckedAt`) is defaulted, never rejected.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::check_id::{CHECK_ID_LEN, is_path_safe};
use super::{Check, CheckId, CheckState, HttpMethod, Protocol};

/// Required length of a user phone number.
pub const PHONE_LEN: usize = 10;
/// Smallest accepted `timeoutSeconds`.
pub const MIN_TIMEOUT_SECS: u64 = 1;
/// Largest accepted `timeoutSeconds`.
pub const MAX_TIMEOUT_SECS: u64 = 5;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Record key that failed.
    pub field: &'static str,
    /// Why it failed.
    pub reason: String,
}

/// Every reason a raw record could not be turned into a [`Check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Failed fields, in record order.
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Returns `true` if `field` is among the failures.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }

    /// Names of the failed fields.
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        self.issues.iter().map(|issue| issue.field).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", issue.field, issue.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Collects field failures while the record is walked.
#[derive(Debug, Default)]
struct Issues(Vec<FieldIssue>);

impl Issues {
    fn push(&mut self, field: &'static str, reason: impl Into<String>) {
        self.0.push(FieldIssue {
            field,
            reason: reason.into(),
        });
    }

    fn check<T>(&mut self, field: &'static str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(reason) => {
                self.push(field, reason);
                None
            }
        }
    }
}

/// Validates and normalizes a raw check record.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming every required field that is
/// missing or invalid.
pub fn validate_check(raw: &Value) -> Result<Check, ValidationError> {
    let empty = serde_json::Map::new();
    let record = raw.as_object().unwrap_or(&empty);
    let mut issues = Issues::default();

    let id = issues.check("id", parse_id(record.get("id")));
    let user_phone = issues.check("userPhone", parse_phone(record.get("userPhone")));
    let protocol = issues.check(
        "protocol",
        required_str(record.get("protocol")).and_then(|s| s.parse::<Protocol>()),
    );
    let url = issues.check("url", parse_url(record.get("url")));
    let method = issues.check(
        "method",
        required_str(record.get("method")).and_then(|s| s.parse::<HttpMethod>()),
    );
    let success_codes = issues.check(
        "successCodes",
        parse_codes(record.get("successCodes").or_else(|| record.get("statusCodes"))),
    );
    let timeout_seconds = issues.check("timeoutSeconds", parse_timeout(record.get("timeoutSeconds")));

    let state = record
        .get("state")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<CheckState>().ok())
        .unwrap_or_default();
    let last_checked_at = parse_last_checked(
        record
            .get("lastCheckedAt")
            .or_else(|| record.get("lastChecked")),
    );

    match (id, user_phone, protocol, url, method, success_codes, timeout_seconds) {
        (
            Some(id),
            Some(user_phone),
            Some(protocol),
            Some(url),
            Some(method),
            Some(success_codes),
            Some(timeout_seconds),
        ) => Ok(Check {
            id,
            user_phone,
            protocol,
            url,
            method,
            success_codes,
            timeout_seconds,
            state,
            last_checked_at,
        }),
        _ => Err(ValidationError { issues: issues.0 }),
    }
}

fn required_str(value: Option<&Value>) -> Result<&str, String> {
    match value {
        None | Some(Value::Null) => Err("missing".to_string()),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err("must be a string".to_string()),
    }
}

fn parse_id(value: Option<&Value>) -> Result<CheckId, String> {
    let raw = required_str(value)?;
    if raw.chars().count() != CHECK_ID_LEN {
        return Err(format!("must be exactly {CHECK_ID_LEN} characters"));
    }
    if !is_path_safe(raw) {
        return Err("must not contain path separators".to_string());
    }
    CheckId::parse(raw).map_err(|e| e.to_string())
}

fn parse_phone(value: Option<&Value>) -> Result<String, String> {
    let raw = required_str(value)?;
    if raw.len() == PHONE_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
        Ok(raw.to_string())
    } else {
        Err(format!("must be exactly {PHONE_LEN} digits"))
    }
}

fn parse_url(value: Option<&Value>) -> Result<String, String> {
    let trimmed = required_str(value)?.trim();
    if trimmed.is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

/// Accepts JSON integers, including floats with no fractional part.
fn as_integer(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn parse_codes(value: Option<&Value>) -> Result<BTreeSet<u16>, String> {
    let items = match value {
        None | Some(Value::Null) => return Err("missing".to_string()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err("must be an array".to_string()),
    };
    if items.is_empty() {
        return Err("must not be empty".to_string());
    }
    items
        .iter()
        .map(|item| {
            as_integer(item)
                .filter(|code| (100..=999).contains(code))
                .and_then(|code| u16::try_from(code).ok())
                .ok_or_else(|| format!("`{item}` is not an HTTP status code"))
        })
        .collect()
}

fn parse_timeout(value: Option<&Value>) -> Result<u64, String> {
    let range = MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS;
    match value {
        None | Some(Value::Null) => Err("missing".to_string()),
        Some(v) => as_integer(v)
            .filter(|secs| range.contains(secs))
            .ok_or_else(|| {
                format!("must be an integer between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS}")
            }),
    }
}

fn parse_last_checked(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .filter(|ms| *ms > 0)
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        _ => None,
    }
}
