//! Core error types for opsview-core

use std::time::Duration;

use thiserror::Error;

use opsview_api::ServerStatus;
use opsview_client::ClientError;

/// Errors that can occur while reconciling against Opsview
#[derive(Error, Debug)]
pub enum CoreError {
    /// Duration string could not be parsed
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    /// A remote call failed
    #[error("remote call failed: {0}")]
    Remote(#[from] ClientError),

    /// A downtime delete failed after earlier deletes had been applied
    #[error("downtime delete failed after {deleted} successful deletion(s): {source}")]
    DeleteFailed {
        /// Deletes already applied during this invocation
        deleted: usize,
        /// Underlying client error
        #[source]
        source: ClientError,
    },

    /// Server cannot take a reload in its current state
    #[error("cannot reload: {0}")]
    ReloadUnavailable(ServerStatus),

    /// Reload finished in a failed state
    #[error("failed to reload: {0}")]
    ReloadFailed(ServerStatus),

    /// Matching downtimes kept reappearing
    #[error("downtime deletion did not converge after {rounds} round(s)")]
    DeleteDidNotConverge {
        /// Find/delete rounds performed
        rounds: u32,
    },

    /// Server stayed in the reloading state
    #[error("reload timed out after {polls} status poll(s)")]
    ReloadTimedOut {
        /// Status polls performed while waiting
        polls: u32,
    },

    /// Reload status lacked a usable `server_status`
    #[error("malformed reload status: {0}")]
    MalformedStatus(String),

    /// Response payload did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Operation was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Operation exceeded its overall time budget
    #[error("operation exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

impl CoreError {
    /// Whether a bounded retry loop gave up
    #[must_use]
    pub fn is_non_convergence(&self) -> bool {
        matches!(
            self,
            CoreError::DeleteDidNotConverge { .. }
                | CoreError::ReloadTimedOut { .. }
                | CoreError::DeadlineExceeded(_)
        )
    }
}
