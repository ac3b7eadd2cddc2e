//! Reload status payload and its typed coercion
//!
//! `GET rest/reload` answers with a loosely typed map where numeric fields
//! arrive either as JSON numbers or as strings. [`ReloadStatus::from_payload`]
//! turns that map into a typed record. Fields that should be numeric but do
//! not parse are treated as absent rather than guessed at.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Keys a reconciliation result sets itself, never taken from the payload
pub const RESERVED_KEYS: [&str; 2] = ["changed", "warnings"];

/// Run state of the Opsview server as reported by the reload endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerStatus {
    Running,
    Reloading,
    Stopped,
    ConfigError,
    RunningWithWarnings,
}

impl ServerStatus {
    /// Map a numeric status code, `None` for codes outside 0-4
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Running),
            1 => Some(Self::Reloading),
            2 => Some(Self::Stopped),
            3 => Some(Self::ConfigError),
            4 => Some(Self::RunningWithWarnings),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Reloading => 1,
            Self::Stopped => 2,
            Self::ConfigError => 3,
            Self::RunningWithWarnings => 4,
        }
    }

    /// Operator-facing description of the state
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Running => "Server running with no warnings",
            Self::Reloading => "Server reloading",
            Self::Stopped => "Server not running",
            Self::ConfigError => "Configuration error or critical error",
            Self::RunningWithWarnings => "Warnings exist",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl Serialize for ServerStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Snapshot of the reload endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReloadStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_status: Option<ServerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    /// Every other field, with integer-valued strings coerced to numbers.
    /// [`RESERVED_KEYS`] are dropped.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReloadStatus {
    /// Build a typed snapshot from the raw response map
    #[must_use]
    pub fn from_payload(mut raw: Map<String, Value>) -> Self {
        let server_status = raw
            .remove("server_status")
            .as_ref()
            .and_then(parse_integer)
            .and_then(ServerStatus::from_code);

        let configuration_status = match raw.remove("configuration_status") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        let messages = match raw.remove("messages") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(s)) => vec![s],
            _ => Vec::new(),
        };

        let extra = raw
            .into_iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key, coerce_integer(value)))
            .collect();

        Self {
            server_status,
            configuration_status,
            messages,
            extra,
        }
    }

    /// Whether configuration changes are waiting for a reload
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.configuration_status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("pending"))
    }
}

impl<'de> Deserialize<'de> for ReloadStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_payload)
    }
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_integer(value: Value) -> Value {
    match value {
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => Value::Number(Number::from(n)),
            Err(_) => Value::String(s),
        },
        other => other,
    }
}
