//! Downtime payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Timestamp layout accepted by the downtime endpoint
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Body of a downtime creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDowntime {
    pub comment: String,
    pub starttime: String,
    pub endtime: String,
}

impl NewDowntime {
    /// Build a creation body from UTC start and end times
    #[must_use]
    pub fn new(comment: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            comment: comment.into(),
            starttime: start.format(TIMESTAMP_FORMAT).to_string(),
            endtime: end.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// A downtime record as returned by `GET rest/downtime`
///
/// Downtimes expose no stable id; the `start_time`/`comment` pair is what a
/// delete request is keyed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeObject {
    #[serde(deserialize_with = "string_or_number")]
    pub start_time: String,
    #[serde(default)]
    pub comment: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DowntimeObject {
    #[must_use]
    pub fn new(start_time: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            comment: comment.into(),
            extra: Map::new(),
        }
    }
}

/// List envelope of `GET rest/downtime`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DowntimeList {
    #[serde(default)]
    pub list: Vec<DowntimeObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for start_time, got {other}"
        ))),
    }
}
