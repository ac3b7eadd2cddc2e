use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{Map, Value, json};

use opsview_api::{DowntimeObject, NewDowntime, ServerStatus};
use opsview_client::{ClientError, OpsviewApi, Params};
use opsview_core::*;

// Mock implementation

#[derive(Default)]
struct MockState {
    downtimes: Vec<DowntimeObject>,
    posted_hosts: Vec<String>,
    delete_params: Vec<Vec<(String, String)>>,
    finds: usize,
    /// Windows created by another actor, one per delete call
    arrivals: VecDeque<DowntimeObject>,
    /// Deletes succeed but nothing is removed
    stale: bool,
    /// Comment filter matches the tag anywhere, not only as suffix
    loose_filter: bool,
    /// Fail the delete call once this many deletes succeeded
    fail_delete_after: Option<usize>,
    /// Cancelled by the first successful delete
    cancel_on_delete: Option<CancelHandle>,
    statuses: VecDeque<Value>,
    status_polls: usize,
    reload_calls: usize,
}

#[derive(Default)]
struct MockOpsview {
    state: Mutex<MockState>,
}

impl MockOpsview {
    fn with_downtimes(downtimes: Vec<DowntimeObject>) -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().downtimes = downtimes;
        mock
    }

    fn with_statuses(statuses: Vec<Value>) -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().statuses = statuses.into();
        mock
    }

    fn tagged(host: &str, start_time: &str) -> DowntimeObject {
        DowntimeObject::new(start_time, downtime_comment(host, Some("maintenance")))
    }
}

fn param<'a>(params: &'a Params<'_>, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.as_str())
}

#[async_trait]
impl OpsviewApi for MockOpsview {
    async fn get(&self, resource: &str, params: &Params<'_>) -> Result<Value, ClientError> {
        assert_eq!(resource, "downtime");
        let mut state = self.state.lock().unwrap();
        state.finds += 1;

        let pattern = param(params, "comment").unwrap_or_default();
        let tag = pattern.trim_start_matches('%');
        let list: Vec<&DowntimeObject> = state
            .downtimes
            .iter()
            .filter(|d| {
                if state.loose_filter {
                    d.comment.contains(tag)
                } else {
                    d.comment.ends_with(tag)
                }
            })
            .collect();

        Ok(json!({ "list": list, "summary": { "rows": list.len().to_string() } }))
    }

    async fn post(
        &self,
        resource: &str,
        params: &Params<'_>,
        body: Value,
    ) -> Result<Value, ClientError> {
        assert_eq!(resource, "downtime");
        let body: NewDowntime = serde_json::from_value(body)?;
        let mut state = self.state.lock().unwrap();
        state
            .posted_hosts
            .push(param(params, "hst.hostname").unwrap_or_default().to_string());
        state
            .downtimes
            .push(DowntimeObject::new(body.starttime, body.comment));
        Ok(json!({ "summary": { "num_hosts": "1" } }))
    }

    async fn delete(&self, resource: &str, params: &Params<'_>) -> Result<Value, ClientError> {
        assert_eq!(resource, "downtime");
        let mut state = self.state.lock().unwrap();

        if state.fail_delete_after == Some(state.delete_params.len()) {
            return Err(ClientError::Api {
                status: 500,
                message: "database locked".to_string(),
            });
        }

        state.delete_params.push(
            params
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        );

        let start_time = param(params, "start_time").unwrap_or_default().to_string();
        let comment = param(params, "comment").unwrap_or_default().to_string();
        if !state.stale {
            if let Some(pos) = state
                .downtimes
                .iter()
                .position(|d| d.start_time == start_time && d.comment == comment)
            {
                state.downtimes.remove(pos);
            }
        }

        if let Some(arrival) = state.arrivals.pop_front() {
            state.downtimes.push(arrival);
        }

        if let Some(handle) = &state.cancel_on_delete {
            handle.cancel();
        }

        Ok(Value::Null)
    }

    async fn reload(&self, asynchronous: bool) -> Result<(), ClientError> {
        assert!(asynchronous);
        self.state.lock().unwrap().reload_calls += 1;
        Ok(())
    }

    async fn reload_status(&self) -> Result<Map<String, Value>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.status_polls += 1;
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front().unwrap()
        } else {
            state.statuses.front().cloned().unwrap()
        };
        match status {
            Value::Object(map) => Ok(map),
            _ => panic!("status fixtures must be objects"),
        }
    }
}

fn policy() -> ReconcilePolicy {
    ReconcilePolicy {
        poll_interval_secs: 0,
        ..ReconcilePolicy::default()
    }
}

fn status(code: &str, configuration: &str) -> Value {
    json!({
        "server_status": code,
        "configuration_status": configuration,
        "average_duration": "5",
        "lastupdated": "1709287140"
    })
}

// Downtime

#[tokio::test]
async fn test_create_then_find() {
    let api = MockOpsview::default();
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

    let outcome = create_downtime_at(&api, "web01", "1h 30m", Some("kernel patching"), now)
        .await
        .unwrap();
    assert!(outcome.changed);

    let found = find_downtime(&api, "web01").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].comment,
        downtime_comment("web01", Some("kernel patching"))
    );
    assert_eq!(found[0].start_time, "2024-03-01 09:59:00");
    assert_eq!(api.state.lock().unwrap().posted_hosts, vec!["web01"]);
}

#[tokio::test]
async fn test_create_is_not_idempotent() {
    let api = MockOpsview::default();

    create_downtime(&api, "web01", "1h", None).await.unwrap();
    create_downtime(&api, "web01", "1h", None).await.unwrap();

    assert_eq!(find_downtime(&api, "web01").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_with_invalid_duration_makes_no_call() {
    let api = MockOpsview::default();

    let err = create_downtime(&api, "web01", "5x", None).await.unwrap_err();

    match err {
        CoreError::InvalidDuration(input) => assert_eq!(input, "5x"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(api.state.lock().unwrap().posted_hosts.is_empty());
}

#[tokio::test]
async fn test_find_ignores_other_hosts_and_loose_matches() {
    let web = downtime_ident("web01");
    let api = MockOpsview::with_downtimes(vec![
        MockOpsview::tagged("web01", "2024-03-01 09:00:00"),
        MockOpsview::tagged("db01", "2024-03-01 09:00:00"),
        DowntimeObject::new("2024-03-01 08:00:00", format!("{web} copied by hand")),
    ]);
    api.state.lock().unwrap().loose_filter = true;

    let found = find_downtime(&api, "web01").await.unwrap();

    assert_eq!(found.len(), 1);
    assert!(found[0].comment.ends_with(&web));
}

#[tokio::test]
async fn test_delete_without_matches_is_unchanged() {
    let api = MockOpsview::with_downtimes(vec![MockOpsview::tagged(
        "db01",
        "2024-03-01 09:00:00",
    )]);

    let first = delete_downtime(&api, "web01", &policy(), &Cancellation::never())
        .await
        .unwrap();
    let second = delete_downtime(&api, "web01", &policy(), &Cancellation::never())
        .await
        .unwrap();

    assert!(!first.changed);
    assert!(!second.changed);
    assert!(api.state.lock().unwrap().delete_params.is_empty());
}

#[tokio::test]
async fn test_delete_converges() {
    let api = MockOpsview::with_downtimes(vec![
        MockOpsview::tagged("web01", "2024-03-01 09:00:00"),
        MockOpsview::tagged("web01", "2024-03-02 09:00:00"),
        MockOpsview::tagged("web01", "2024-03-03 09:00:00"),
        MockOpsview::tagged("db01", "2024-03-01 09:00:00"),
    ]);

    let outcome = delete_downtime(&api, "web01", &policy(), &Cancellation::never())
        .await
        .unwrap();

    assert!(outcome.changed);
    assert!(find_downtime(&api, "web01").await.unwrap().is_empty());
    assert_eq!(find_downtime(&api, "db01").await.unwrap().len(), 1);

    let state = api.state.lock().unwrap();
    assert_eq!(state.delete_params.len(), 3);
    assert_eq!(
        state.delete_params[0],
        vec![
            ("only_objects_set".to_string(), "1".to_string()),
            ("start_time".to_string(), "2024-03-01 09:00:00".to_string()),
            (
                "comment".to_string(),
                downtime_comment("web01", Some("maintenance"))
            ),
        ]
    );

    // Then idempotent
    drop(state);
    let again = delete_downtime(&api, "web01", &policy(), &Cancellation::never())
        .await
        .unwrap();
    assert!(!again.changed);
}

#[tokio::test]
async fn test_delete_picks_up_windows_created_meanwhile() {
    let api = MockOpsview::with_downtimes(vec![MockOpsview::tagged(
        "web01",
        "2024-03-01 09:00:00",
    )]);
    api.state
        .lock()
        .unwrap()
        .arrivals
        .push_back(MockOpsview::tagged("web01", "2024-03-01 09:30:00"));

    let outcome = delete_downtime(&api, "web01", &policy(), &Cancellation::never())
        .await
        .unwrap();

    assert!(outcome.changed);
    let state = api.state.lock().unwrap();
    assert_eq!(state.delete_params.len(), 2);
    assert_eq!(state.finds, 3);
    assert!(state.downtimes.is_empty());
}

#[tokio::test]
async fn test_delete_gives_up_on_stale_remote() {
    let api = MockOpsview::with_downtimes(vec![MockOpsview::tagged(
        "web01",
        "2024-03-01 09:00:00",
    )]);
    api.state.lock().unwrap().stale = true;
    let policy = ReconcilePolicy {
        max_delete_rounds: 3,
        ..policy()
    };

    let err = delete_downtime(&api, "web01", &policy, &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::DeleteDidNotConverge { rounds: 3 }));
    assert!(err.is_non_convergence());
    assert_eq!(api.state.lock().unwrap().delete_params.len(), 3);
}

#[tokio::test]
async fn test_partial_delete_failure_is_reported() {
    let api = MockOpsview::with_downtimes(vec![
        MockOpsview::tagged("web01", "2024-03-01 09:00:00"),
        MockOpsview::tagged("web01", "2024-03-02 09:00:00"),
        MockOpsview::tagged("web01", "2024-03-03 09:00:00"),
    ]);
    api.state.lock().unwrap().fail_delete_after = Some(1);

    let err = delete_downtime(&api, "web01", &policy(), &Cancellation::never())
        .await
        .unwrap_err();

    match err {
        CoreError::DeleteFailed { deleted, source } => {
            assert_eq!(deleted, 1);
            assert!(matches!(source, ClientError::Api { status: 500, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(api.state.lock().unwrap().downtimes.len(), 2);
}

#[tokio::test]
async fn test_cancelled_delete_makes_no_call() {
    let api = MockOpsview::with_downtimes(vec![MockOpsview::tagged(
        "web01",
        "2024-03-01 09:00:00",
    )]);
    let (handle, cancel) = Cancellation::new();
    handle.cancel();

    let err = delete_downtime(&api, "web01", &policy(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Cancelled));
    assert_eq!(api.state.lock().unwrap().finds, 0);
}

#[tokio::test]
async fn test_cancel_between_deletes_stops_the_round() {
    let api = MockOpsview::with_downtimes(vec![
        MockOpsview::tagged("web01", "2024-03-01 09:00:00"),
        MockOpsview::tagged("web01", "2024-03-02 09:00:00"),
        MockOpsview::tagged("web01", "2024-03-03 09:00:00"),
    ]);
    let (handle, cancel) = Cancellation::new();
    api.state.lock().unwrap().cancel_on_delete = Some(handle);

    let err = delete_downtime(&api, "web01", &policy(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Cancelled));
    let state = api.state.lock().unwrap();
    assert_eq!(state.delete_params.len(), 1);
    assert_eq!(state.downtimes.len(), 2);
}

#[tokio::test]
async fn test_expired_deadline_stops_delete() {
    let api = MockOpsview::with_downtimes(vec![MockOpsview::tagged(
        "web01",
        "2024-03-01 09:00:00",
    )]);
    let policy = ReconcilePolicy {
        timeout_secs: Some(0),
        ..policy()
    };

    let err = delete_downtime(&api, "web01", &policy, &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::DeadlineExceeded(_)));
    assert!(err.is_non_convergence());
    let state = api.state.lock().unwrap();
    assert_eq!(state.finds, 0);
    assert!(state.delete_params.is_empty());
}

#[tokio::test]
async fn test_reconcile_downtime_dispatch() {
    let api = MockOpsview::default();

    let present = DowntimeRequest::present("web01").with_comment("upgrade");
    let outcome = reconcile_downtime(&api, &present, &policy(), &Cancellation::never())
        .await
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(find_downtime(&api, "web01").await.unwrap().len(), 1);

    let absent = DowntimeRequest::absent("web01");
    let outcome = reconcile_downtime(&api, &absent, &policy(), &Cancellation::never())
        .await
        .unwrap();
    assert!(outcome.changed);
    assert!(find_downtime(&api, "web01").await.unwrap().is_empty());
}

// Reload

#[tokio::test]
async fn test_reload_waits_for_completion() {
    let api = MockOpsview::with_statuses(vec![
        status("0", "pending"),
        status("1", "pending"),
        status("1", "pending"),
        status("0", "uptodate"),
    ]);

    let outcome = reconcile_reload(&api, false, &policy(), &Cancellation::never())
        .await
        .unwrap();

    assert!(outcome.changed);
    assert!(outcome.warnings.is_empty());
    let snapshot = outcome.status.unwrap();
    assert_eq!(snapshot.server_status, Some(ServerStatus::Running));
    assert_eq!(snapshot.configuration_status.as_deref(), Some("uptodate"));
    assert_eq!(snapshot.extra["average_duration"], json!(5));

    let state = api.state.lock().unwrap();
    assert_eq!(state.reload_calls, 1);
    assert_eq!(state.status_polls, 5);
}

#[tokio::test]
async fn test_reload_not_pending_is_unchanged() {
    let api = MockOpsview::with_statuses(vec![status("0", "uptodate")]);

    let outcome = reconcile_reload(&api, false, &policy(), &Cancellation::never())
        .await
        .unwrap();

    assert!(!outcome.changed);
    assert!(outcome.status.is_some());
    assert_eq!(api.state.lock().unwrap().reload_calls, 0);
}

#[tokio::test]
async fn test_pending_is_case_insensitive() {
    let api = MockOpsview::with_statuses(vec![status("0", "PENDING"), status("0", "uptodate")]);

    let outcome = reconcile_reload(&api, false, &policy(), &Cancellation::never())
        .await
        .unwrap();

    assert!(outcome.changed);
}

#[tokio::test]
async fn test_forced_reload() {
    let api = MockOpsview::with_statuses(vec![status("0", "uptodate")]);

    let outcome = reconcile_reload(&api, true, &policy(), &Cancellation::never())
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(api.state.lock().unwrap().reload_calls, 1);
}

#[tokio::test]
async fn test_reload_unavailable_when_stopped_or_reloading() {
    for (code, expected) in [("2", ServerStatus::Stopped), ("1", ServerStatus::Reloading)] {
        let api = MockOpsview::with_statuses(vec![status(code, "pending")]);

        let err = reconcile_reload(&api, true, &policy(), &Cancellation::never())
            .await
            .unwrap_err();

        match err {
            CoreError::ReloadUnavailable(state) => assert_eq!(state, expected),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(api.state.lock().unwrap().reload_calls, 0);
    }
}

#[tokio::test]
async fn test_reload_warnings_are_surfaced() {
    let mut warned = status("4", "uptodate");
    warned["messages"] = json!(["host web01 has no service checks", "unused keyword"]);
    let api = MockOpsview::with_statuses(vec![status("0", "pending"), warned]);

    let outcome = reconcile_reload(&api, false, &policy(), &Cancellation::never())
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(
        outcome.warnings,
        vec![
            "Opsview: host web01 has no service checks",
            "Opsview: unused keyword"
        ]
    );
}

#[tokio::test]
async fn test_reload_terminal_failure() {
    let api = MockOpsview::with_statuses(vec![
        status("0", "pending"),
        status("1", "pending"),
        status("3", "pending"),
    ]);

    let err = reconcile_reload(&api, false, &policy(), &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::ReloadFailed(ServerStatus::ConfigError)
    ));
    assert_eq!(
        err.to_string(),
        "failed to reload: Configuration error or critical error"
    );
}

#[tokio::test]
async fn test_reload_stopped_after_wait() {
    let api = MockOpsview::with_statuses(vec![
        status("0", "pending"),
        status("1", "pending"),
        status("2", "pending"),
    ]);

    let err = reconcile_reload(&api, false, &policy(), &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::ReloadFailed(ServerStatus::Stopped)));
    assert_eq!(err.to_string(), "failed to reload: Server not running");
    assert_eq!(api.state.lock().unwrap().reload_calls, 1);
}

#[tokio::test]
async fn test_reload_wait_is_bounded() {
    let api = MockOpsview::with_statuses(vec![status("0", "pending"), status("1", "pending")]);
    let policy = ReconcilePolicy {
        max_reload_polls: 3,
        ..policy()
    };

    let err = reconcile_reload(&api, false, &policy, &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::ReloadTimedOut { polls: 3 }));
    assert!(err.is_non_convergence());
    assert_eq!(api.state.lock().unwrap().status_polls, 4);
}

#[tokio::test]
async fn test_malformed_status() {
    let api = MockOpsview::with_statuses(vec![json!({ "configuration_status": "pending" })]);

    let err = reconcile_reload(&api, false, &policy(), &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::MalformedStatus(_)));
    assert_eq!(api.state.lock().unwrap().reload_calls, 0);
}

#[tokio::test]
async fn test_cancelled_reload_makes_no_call() {
    let api = MockOpsview::with_statuses(vec![status("0", "pending")]);
    let (handle, cancel) = Cancellation::new();
    handle.cancel();

    let err = reconcile_reload(&api, false, &policy(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Cancelled));
    assert_eq!(api.state.lock().unwrap().status_polls, 0);
}

#[tokio::test]
async fn test_expired_deadline_stops_reload() {
    let api = MockOpsview::with_statuses(vec![status("0", "pending")]);
    let policy = ReconcilePolicy {
        timeout_secs: Some(0),
        ..policy()
    };

    let err = reconcile_reload(&api, false, &policy, &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::DeadlineExceeded(_)));
    let state = api.state.lock().unwrap();
    assert_eq!(state.status_polls, 0);
    assert_eq!(state.reload_calls, 0);
}
