//! Normalized check model.
//!
//! A [`Check`] is what the worker executes: a user-owned endpoint plus the
//! set of status codes that count as "up". Instances are only produced by
//! the validator from raw store records.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CheckId;

/// Transport scheme used to reach the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// Returns the scheme as used in a URL.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(format!("unsupported protocol `{other}`")),
        }
    }
}

/// HTTP method used for the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the lowercase name used in stored records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }

    /// Returns the method as sent on the wire.
    #[must_use]
    pub const fn as_upper(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unsupported method `{other}`")),
        }
    }
}

/// Last observed availability of a check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    /// Endpoint answered with an accepted status code.
    Up,
    /// Endpoint failed, timed out or answered with an unexpected code.
    /// Also the state of a never-checked record.
    #[default]
    Down,
}

impl CheckState {
    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("unknown state `{other}`")),
        }
    }
}

/// A validated, executable check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    /// Unique check id (also the log file name).
    pub id: CheckId,
    /// 10-digit phone number of the owning user.
    pub user_phone: String,
    /// Scheme used for the probe.
    pub protocol: Protocol,
    /// Host and path (and optional query), without scheme.
    pub url: String,
    /// Probe method.
    pub method: HttpMethod,
    /// Status codes that count as "up".
    pub success_codes: BTreeSet<u16>,
    /// Probe deadline in seconds, within `1..=5`.
    pub timeout_seconds: u64,
    /// Last persisted state.
    pub state: CheckState,
    /// When the check last ran; `None` if it never has.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Check {
    /// Full probe URL, `protocol://url`.
    #[must_use]
    pub fn target_url(&self) -> String {
        format!("{}://{}", self.protocol, self.url)
    }

    /// Probe deadline as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Returns `true` if `code` is one of the accepted status codes.
    #[must_use]
    pub fn accepts(&self, code: u16) -> bool {
        self.success_codes.contains(&code)
    }

    /// Writes `state` and `lastCheckedAt` into a raw store record, keeping
    /// every other key the API layer stored.
    ///
    /// Falls back to the full serialized check when `record` is not a JSON
    /// object. Legacy `lastChecked` keys are replaced by `lastCheckedAt`.
    pub fn merge_into(&self, record: &mut serde_json::Value) {
        let Some(object) = record.as_object_mut() else {
            if let Ok(full) = serde_json::to_value(self) {
                *record = full;
            }
            return;
        };
        object.insert(
            "state".to_string(),
            serde_json::Value::from(self.state.as_str()),
        );
        object.remove("lastChecked");
        object.insert(
            "lastCheckedAt".to_string(),
            self.last_checked_at
                .map_or(serde_json::Value::Null, |at| {
                    serde_json::Value::from(at.timestamp_millis())
                }),
        );
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Check {
        let Ok(id) = CheckId::parse("AAAAAAAAAAAAAAAAAAAA") else {
            panic!("valid id");
        };
        Check {
            id,
            user_phone: "5551234567".to_string(),
            protocol: Protocol::Https,
            url: "example.com/health?deep=1".to_string(),
            method: HttpMethod::Get,
            success_codes: BTreeSet::from([200, 204]),
            timeout_seconds: 3,
            state: CheckState::Down,
            last_checked_at: None,
        }
    }

    #[test]
    fn target_url_prefixes_scheme() {
        assert_eq!(sample().target_url(), "https://example.com/health?deep=1");
    }

    #[test]
    fn accepts_only_listed_codes() {
        let check = sample();
        assert!(check.accepts(200));
        assert!(check.accepts(204));
        assert!(!check.accepts(500));
    }

    #[test]
    fn enum_parsing() {
        assert_eq!("http".parse::<Protocol>(), Ok(Protocol::Http));
        assert!("ftp".parse::<Protocol>().is_err());
        assert_eq!("delete".parse::<HttpMethod>(), Ok(HttpMethod::Delete));
        assert!("GET".parse::<HttpMethod>().is_err());
        assert_eq!(CheckState::default(), CheckState::Down);
    }

    #[test]
    fn serializes_camel_case_with_millis() {
        let mut check = sample();
        check.last_checked_at = Utc.timestamp_millis_opt(1_700_000_000_000).single();
        let value = serde_json::to_value(&check).unwrap_or_default();
        assert_eq!(value["userPhone"], json!("5551234567"));
        assert_eq!(value["successCodes"], json!([200, 204]));
        assert_eq!(value["lastCheckedAt"], json!(1_700_000_000_000_i64));
        assert_eq!(value["method"], json!("get"));
    }

    #[test]
    fn merge_preserves_unknown_keys() {
        let mut check = sample();
        check.state = CheckState::Up;
        check.last_checked_at = Utc.timestamp_millis_opt(42).single();
        let mut record = json!({
            "id": "AAAAAAAAAAAAAAAAAAAA",
            "label": "homepage",
            "state": "down",
            "lastChecked": 7,
        });
        check.merge_into(&mut record);
        assert_eq!(record["label"], json!("homepage"));
        assert_eq!(record["state"], json!("up"));
        assert_eq!(record["lastCheckedAt"], json!(42));
        assert!(record.get("lastChecked").is_none());
    }

    #[test]
    fn merge_replaces_non_object() {
        let check = sample();
        let mut record = json!("garbage");
        check.merge_into(&mut record);
        assert_eq!(record["id"], json!("AAAAAAAAAAAAAAAAAAAA"));
    }
}
