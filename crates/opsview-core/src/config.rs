//! Configuration types for reconciliation runs

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Downtime length used when none is requested
pub const DEFAULT_DURATION: &str = "1h";

/// Bounds for the polling and deletion loops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Maximum find/delete rounds before giving up
    #[serde(default = "default_max_delete_rounds")]
    pub max_delete_rounds: u32,
    /// Maximum status polls while waiting for a reload
    #[serde(default = "default_max_reload_polls")]
    pub max_reload_polls: u32,
    /// Pause between reload status polls
    ///
    /// Kept apart from common TCP keepalive intervals.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Overall time budget per operation, unbounded if unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_max_delete_rounds() -> u32 {
    50
}

fn default_max_reload_polls() -> u32 {
    // ~15 minutes at the default interval
    130
}

fn default_poll_interval_secs() -> u64 {
    7
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            max_delete_rounds: default_max_delete_rounds(),
            max_reload_polls: default_max_reload_polls(),
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: None,
        }
    }
}

impl ReconcilePolicy {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Start the clock for one operation
    pub(crate) fn deadline(&self) -> Deadline {
        Deadline {
            started: Instant::now(),
            limit: self.timeout(),
        }
    }
}

/// Elapsed-time guard for a single operation
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub(crate) fn check(&self) -> Result<(), CoreError> {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => {
                Err(CoreError::DeadlineExceeded(limit))
            }
            _ => Ok(()),
        }
    }
}

/// Whether a downtime should exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
}

/// Desired downtime for one host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DowntimeRequest {
    /// Opsview host name
    pub host: String,
    #[serde(default)]
    pub state: DesiredState,
    /// Length such as `"1h 30m"`, only used when present
    #[serde(default = "default_duration")]
    pub duration: String,
    /// Free text placed before the identifier tag
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_duration() -> String {
    DEFAULT_DURATION.to_string()
}

impl DowntimeRequest {
    pub fn present(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            state: DesiredState::Present,
            duration: default_duration(),
            comment: None,
        }
    }

    pub fn absent(host: impl Into<String>) -> Self {
        Self {
            state: DesiredState::Absent,
            ..Self::present(host)
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = duration.into();
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
