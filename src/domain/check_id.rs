//! Type-safe check identifier.
//!
//! [`CheckId`] wraps the 20-character opaque id assigned to a check by the
//! API layer. The id doubles as the record key in the `checks` collection
//! and as the name of the check's log file, so it is also required to be
//! safe as a single path component.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Exact length, in characters, of every check id.
pub const CHECK_ID_LEN: usize = 20;

/// Unique identifier of a check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CheckId(String);

impl CheckId {
    /// Parses a check id.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidRequest`] if the id is not exactly
    /// [`CHECK_ID_LEN`] characters or contains a path separator or `..`.
    pub fn parse(raw: &str) -> Result<Self, MonitorError> {
        if raw.chars().count() != CHECK_ID_LEN {
            return Err(MonitorError::InvalidRequest(format!(
                "check id must be exactly {CHECK_ID_LEN} characters"
            )));
        }
        if !is_path_safe(raw) {
            return Err(MonitorError::InvalidRequest(
                "check id must not contain path separators".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns `true` if `name` can be used as a single file name component.
pub(crate) fn is_path_safe(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\', '\0']) && !name.contains("..")
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CheckId {
    type Error = MonitorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CheckId> for String {
    fn from(id: CheckId) -> Self {
        id.0
    }
}

impl AsRef<str> for CheckId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
