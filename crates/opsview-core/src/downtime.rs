//! Downtime reconciliation
//!
//! Windows created here carry the host's identifier tag at the end of their
//! comment. Deletion finds windows by that tag and removes them round by
//! round until the server reports none left.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, instrument};

use opsview_api::{DowntimeList, DowntimeObject, NewDowntime};
use opsview_client::OpsviewApi;

use crate::cancel::Cancellation;
use crate::config::{DesiredState, DowntimeRequest, ReconcilePolicy};
use crate::duration::parse_duration;
use crate::error::CoreError;
use crate::ident::{downtime_comment, downtime_ident};
use crate::outcome::Outcome;

const RESOURCE: &str = "downtime";

/// Apply a [`DowntimeRequest`]
///
/// # Errors
/// See [`create_downtime`] and [`delete_downtime`].
pub async fn reconcile_downtime(
    api: &dyn OpsviewApi,
    request: &DowntimeRequest,
    policy: &ReconcilePolicy,
    cancel: &Cancellation,
) -> Result<Outcome, CoreError> {
    match request.state {
        DesiredState::Present => {
            cancel.check()?;
            create_downtime(
                api,
                &request.host,
                &request.duration,
                request.comment.as_deref(),
            )
            .await
        }
        DesiredState::Absent => delete_downtime(api, &request.host, policy, cancel).await,
    }
}

/// Create a new downtime for `host` starting now
///
/// Every call creates a new window, even if a matching one exists.
///
/// # Errors
/// Returns [`CoreError::InvalidDuration`] before any remote call if the
/// duration does not parse, or [`CoreError::Remote`] if creation fails.
pub async fn create_downtime(
    api: &dyn OpsviewApi,
    host: &str,
    duration: &str,
    comment: Option<&str>,
) -> Result<Outcome, CoreError> {
    create_downtime_at(api, host, duration, comment, Utc::now()).await
}

/// [`create_downtime`] with an explicit clock reading
///
/// The window opens one minute before `now` so it is active immediately
/// even when the server clock runs slightly ahead.
///
/// # Errors
/// See [`create_downtime`].
#[instrument(skip(api, now))]
pub async fn create_downtime_at(
    api: &dyn OpsviewApi,
    host: &str,
    duration: &str,
    comment: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Outcome, CoreError> {
    let start = now - TimeDelta::minutes(1);
    let end = start
        .checked_add_signed(parse_duration(duration)?)
        .ok_or_else(|| CoreError::InvalidDuration(duration.to_string()))?;

    let body = NewDowntime::new(downtime_comment(host, comment), start, end);
    let params = [("hst.hostname", host.to_string())];

    api.post(RESOURCE, &params, serde_json::to_value(&body).map_err(invalid_response)?)
        .await?;

    info!(
        start = %body.starttime,
        end = %body.endtime,
        comment = %body.comment,
        "downtime created"
    );

    Ok(Outcome::changed())
}

/// Downtimes whose comment ends with the identifier tag of `host`
///
/// The server-side comment filter is only a pre-selection; the suffix is
/// checked again here.
///
/// # Errors
/// Returns [`CoreError::Remote`] if the query fails, or
/// [`CoreError::InvalidResponse`] if the list cannot be decoded.
#[instrument(skip(api))]
pub async fn find_downtime(
    api: &dyn OpsviewApi,
    host: &str,
) -> Result<Vec<DowntimeObject>, CoreError> {
    let ident = downtime_ident(host);
    let params = [
        ("object_count_only", "1".to_string()),
        ("comment", format!("%{ident}")),
    ];

    let response = api.get(RESOURCE, &params).await?;
    let listed: DowntimeList = serde_json::from_value(response).map_err(invalid_response)?;
    let returned = listed.list.len();

    let matches: Vec<DowntimeObject> = listed
        .list
        .into_iter()
        .filter(|obj| obj.comment.ends_with(&ident))
        .collect();

    debug!(
        ident = %ident,
        returned,
        matched = matches.len(),
        "downtime lookup"
    );

    Ok(matches)
}

/// Delete every downtime tagged for `host`
///
/// Repeats find-then-delete until a find comes back empty, so windows that
/// appear between rounds are removed too. `changed` is set if anything was
/// deleted.
///
/// # Errors
/// - [`CoreError::DeleteFailed`] if a delete fails; earlier deletes stay applied
/// - [`CoreError::DeleteDidNotConverge`] if matches remain after
///   `policy.max_delete_rounds` delete rounds
/// - [`CoreError::Cancelled`] or [`CoreError::DeadlineExceeded`]
/// - [`CoreError::Remote`] if a find fails
#[instrument(skip(api, policy, cancel))]
pub async fn delete_downtime(
    api: &dyn OpsviewApi,
    host: &str,
    policy: &ReconcilePolicy,
    cancel: &Cancellation,
) -> Result<Outcome, CoreError> {
    let deadline = policy.deadline();
    let mut deleted = 0usize;
    let mut round = 0u32;

    loop {
        cancel.check()?;
        deadline.check()?;

        let matches = find_downtime(api, host).await?;
        if matches.is_empty() {
            if deleted == 0 {
                debug!("no matching downtime");
                return Ok(Outcome::unchanged());
            }
            info!(deleted, rounds = round, "downtime removed");
            return Ok(Outcome::changed());
        }

        if round == policy.max_delete_rounds {
            return Err(CoreError::DeleteDidNotConverge { rounds: round });
        }
        round += 1;

        debug!(round, matches = matches.len(), "deleting matched downtime");

        for downtime in &matches {
            cancel.check()?;
            deadline.check()?;

            let params = [
                ("only_objects_set", "1".to_string()),
                ("start_time", downtime.start_time.clone()),
                ("comment", downtime.comment.clone()),
            ];
            api.delete(RESOURCE, &params)
                .await
                .map_err(|source| CoreError::DeleteFailed { deleted, source })?;
            deleted += 1;
        }
    }
}

fn invalid_response(err: serde_json::Error) -> CoreError {
    CoreError::InvalidResponse(err.to_string())
}
