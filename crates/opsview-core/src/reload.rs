//! Configuration reload state machine
//!
//! The server owns the reload state; this module only observes it through
//! `GET rest/reload` and may start a reload when configuration changes are
//! pending.
//!
//! ```text
//! Running / RunningWithWarnings / ConfigError
//!     -- pending or forced --> trigger --> Reloading --(poll)--> final state
//! Reloading / Stopped at start --> ReloadUnavailable
//! final Stopped / ConfigError  --> ReloadFailed
//! ```

use tracing::{debug, info, instrument, warn};

use opsview_api::{ReloadStatus, ServerStatus};
use opsview_client::OpsviewApi;

use crate::cancel::Cancellation;
use crate::config::{Deadline, ReconcilePolicy};
use crate::error::CoreError;
use crate::outcome::Outcome;

/// Prefix of warnings relayed from the server's message list
const WARNING_PREFIX: &str = "Opsview: ";

/// Reload the server configuration if changes are pending, or if `force`
///
/// Waits for the reload to finish and reports the final status snapshot.
/// Server messages of a reload that finished with warnings become
/// [`Outcome::warnings`].
///
/// # Errors
/// - [`CoreError::ReloadUnavailable`] if the server is reloading or stopped
///   before anything is triggered
/// - [`CoreError::ReloadFailed`] if the server ends up stopped or in
///   configuration error
/// - [`CoreError::ReloadTimedOut`] if it is still reloading after
///   `policy.max_reload_polls` polls
/// - [`CoreError::MalformedStatus`] if the status has no usable run state
/// - [`CoreError::Cancelled`], [`CoreError::DeadlineExceeded`] or
///   [`CoreError::Remote`]
#[instrument(skip(api, policy, cancel))]
pub async fn reconcile_reload(
    api: &dyn OpsviewApi,
    force: bool,
    policy: &ReconcilePolicy,
    cancel: &Cancellation,
) -> Result<Outcome, CoreError> {
    let deadline = policy.deadline();
    let mut outcome = Outcome::unchanged();

    let (status, state) = poll_status(api, cancel, &deadline).await?;
    if matches!(state, ServerStatus::Reloading | ServerStatus::Stopped) {
        return Err(CoreError::ReloadUnavailable(state));
    }

    if status.is_pending() || force {
        info!(
            pending = status.is_pending(),
            force, "triggering configuration reload"
        );
        outcome.changed = true;
        api.reload(true).await?;
        wait_reload(api, policy, cancel, &deadline).await?;
    } else {
        debug!("no configuration changes pending");
    }

    let (status, state) = poll_status(api, cancel, &deadline).await?;
    match state {
        ServerStatus::RunningWithWarnings => {
            for message in &status.messages {
                warn!(server_message = %message, "reload finished with warning");
                outcome.warnings.push(format!("{WARNING_PREFIX}{message}"));
            }
        }
        ServerStatus::Stopped | ServerStatus::ConfigError => {
            return Err(CoreError::ReloadFailed(state));
        }
        ServerStatus::Running | ServerStatus::Reloading => {}
    }

    outcome.status = Some(status);
    Ok(outcome)
}

/// Poll until the server leaves [`ServerStatus::Reloading`]
async fn wait_reload(
    api: &dyn OpsviewApi,
    policy: &ReconcilePolicy,
    cancel: &Cancellation,
    deadline: &Deadline,
) -> Result<(), CoreError> {
    for attempt in 1..=policy.max_reload_polls {
        let (_, state) = poll_status(api, cancel, deadline).await?;
        debug!(attempt, server_status = state.code(), "reload status");

        if state != ServerStatus::Reloading {
            return Ok(());
        }

        if attempt < policy.max_reload_polls {
            cancel.sleep(policy.poll_interval()).await?;
        }
    }

    Err(CoreError::ReloadTimedOut {
        polls: policy.max_reload_polls,
    })
}

/// Fetch and coerce one status snapshot
async fn poll_status(
    api: &dyn OpsviewApi,
    cancel: &Cancellation,
    deadline: &Deadline,
) -> Result<(ReloadStatus, ServerStatus), CoreError> {
    cancel.check()?;
    deadline.check()?;

    let status = ReloadStatus::from_payload(api.reload_status().await?);
    let state = status.server_status.ok_or_else(|| {
        CoreError::MalformedStatus("missing or unrecognised server_status".to_string())
    })?;

    Ok((status, state))
}
