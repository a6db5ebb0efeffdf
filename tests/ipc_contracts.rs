use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use salesboard_lib::commands::dashboard::{
    get_dashboard_data, get_monthly_snapshot, get_weekly_snapshot, list_members,
};
use salesboard_lib::commands::records::{daily_crud, project_crud, save_weekly_snapshot, DailyFilter};
use salesboard_lib::commands::settings::{get_settings, save_settings};
use salesboard_lib::commands::sync::{
    fetch_remote_data, get_dead_letters, get_sync_queue, requeue_sync_item, set_online_status, sync_now,
};
use salesboard_lib::models::daily::DailyRecord;
use salesboard_lib::models::project::Project;
use salesboard_lib::models::snapshot::PeriodSnapshot;
use salesboard_lib::AppState;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct FakeApi {
    received: Mutex<Vec<(String, Value)>>,
    auth_headers: Mutex<Vec<String>>,
    rejected_member: Option<String>,
}

impl FakeApi {
    fn received(&self) -> Vec<(String, Value)> {
        self.received.lock().unwrap().clone()
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn data_all() -> Json<Value> {
    Json(json!({
        "weekly": [
            { "period": "2025-W12", "metrics": { "approach": { "value": 155, "target": 160, "change": 9.2 } } }
        ],
        "monthly": [{ "period": "2025-03" }],
        "members": [
            { "id": "sato", "name": "佐藤 健" },
            { "id": "suzuki", "name": "鈴木 花子" }
        ]
    }))
}

async fn weekly_snapshot(UrlPath(period): UrlPath<String>) -> Result<Json<Value>, StatusCode> {
    if period != "2025-W12" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "period": period, "metrics": { "approach": { "value": 171, "target": 160 } } })))
}

async fn monthly_snapshot(UrlPath(period): UrlPath<String>) -> Result<Json<Value>, StatusCode> {
    if period != "2025-03" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "period": period })))
}

async fn members() -> Json<Value> {
    Json(json!([
        { "id": "sato", "name": "佐藤 健" },
        { "id": "suzuki", "name": "鈴木 花子" },
        { "id": "tanaka", "name": "田中 一郎" }
    ]))
}

async fn capture_daily(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        api.auth_headers.lock().unwrap().push(auth.to_string());
    }
    if api.rejected_member.as_deref() == body["memberId"].as_str() {
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    api.received.lock().unwrap().push(("daily".to_string(), body));
    StatusCode::CREATED
}

async fn capture_project(State(api): State<Arc<FakeApi>>, Json(body): Json<Value>) -> StatusCode {
    api.received.lock().unwrap().push(("project".to_string(), body));
    StatusCode::CREATED
}

async fn capture_weekly(
    State(api): State<Arc<FakeApi>>,
    UrlPath(period): UrlPath<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    api.received.lock().unwrap().push((format!("weekly/{period}"), body));
    StatusCode::OK
}

async fn spawn_api(api: Arc<FakeApi>) -> String {
    let app = Router::new()
        .route("/health", get(health))
        .route("/data/all", get(data_all))
        .route("/daily", post(capture_daily))
        .route("/projects", post(capture_project))
        .route("/weekly/:period", get(weekly_snapshot).put(capture_weekly))
        .route("/monthly/:period", get(monthly_snapshot))
        .route("/members", get(members))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn local_state() -> (TempDir, AppState) {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let state = AppState::initialize(tmp.path()).expect("initialize state");
    (tmp, state)
}

async fn api_state(api: Arc<FakeApi>) -> (TempDir, AppState) {
    let base_url = spawn_api(api).await;
    let tmp = tempfile::tempdir().expect("create temp dir");
    salesboard_lib::commands::settings::save_settings_to_disk(
        tmp.path(),
        json!({
            "dataSource": "api",
            "api": { "baseUrl": base_url, "key": "test-token", "authScheme": "bearer" }
        }),
    )
    .expect("write settings");
    let state = AppState::initialize(tmp.path()).expect("initialize state");
    (tmp, state)
}

fn daily(date: &str, member: &str, approach: i64) -> DailyRecord {
    serde_json::from_value(json!({
        "date": date,
        "memberId": member,
        "approach": approach,
        "meeting": 4,
        "negotiation": 2,
        "proposal": 1,
        "contract": 1,
        "amount": 250000.0
    }))
    .expect("daily record")
}

fn project(company: &str) -> Project {
    serde_json::from_value(json!({
        "companyName": company,
        "name": "Pilot",
        "status": "initial",
        "assignedTo": "sato",
        "budget": 1200000.0
    }))
    .expect("project")
}

#[tokio::test]
async fn settings_commands_round_trip_and_merge_partial_updates() {
    let (_tmp, state) = local_state();

    let initial = get_settings(&state).await.expect("load settings");
    assert_eq!(initial["dataSource"], json!("local"));
    assert_eq!(initial["syncIntervalSecs"], json!(300));

    let saved = save_settings(
        &state,
        json!({ "syncIntervalSecs": 600, "cache": { "enabled": false } }),
    )
    .await
    .expect("save settings");
    assert_eq!(saved["syncIntervalSecs"], json!(600));
    assert_eq!(saved["cache"]["enabled"], json!(false));
    assert_eq!(saved["cache"]["expirySecs"], json!(600));

    let reloaded = get_settings(&state).await.expect("reload settings");
    assert_eq!(reloaded, saved);
}

#[tokio::test]
async fn daily_crud_contract_and_queue_bookkeeping() {
    let (_tmp, state) = local_state();

    let created = daily_crud(&state, "create".into(), Some(daily("2025-03-10", "sato", 10)), None, None)
        .await
        .expect("create");
    assert_eq!(created["status"], json!("created"));
    assert_eq!(created["id"], json!("2025-03-10_sato"));

    daily_crud(&state, "create".into(), Some(daily("2025-03-12", "suzuki", 7)), None, None)
        .await
        .expect("create second");

    let read = daily_crud(&state, "read".into(), None, Some("2025-03-10_sato".into()), None)
        .await
        .expect("read");
    assert_eq!(read["memberId"], json!("sato"));
    assert!(read["updatedAt"].is_string());

    let range = daily_crud(
        &state,
        "range".into(),
        None,
        None,
        Some(DailyFilter {
            start: Some("2025-03-11".parse().unwrap()),
            end: Some("2025-03-31".parse().unwrap()),
            member_id: None,
        }),
    )
    .await
    .expect("range");
    assert_eq!(range.as_array().unwrap().len(), 1);
    assert_eq!(range[0]["memberId"], json!("suzuki"));

    let by_member = daily_crud(
        &state,
        "member".into(),
        None,
        None,
        Some(DailyFilter { member_id: Some("sato".into()), ..Default::default() }),
    )
    .await
    .expect("member");
    assert_eq!(by_member.as_array().unwrap().len(), 1);

    let updated = daily_crud(
        &state,
        "update".into(),
        Some(daily("2025-03-10", "sato", 12)),
        Some("2025-03-10_sato".into()),
        None,
    )
    .await
    .expect("update");
    assert_eq!(updated["record"]["approach"], json!(12));

    let queue = get_sync_queue(&state).await.expect("queue");
    let queue = queue.as_array().unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0]["id"], json!("daily_2025-03-10_sato"));
    assert_eq!(queue[0]["revision"], json!(2));
    assert_eq!(queue[0]["recordType"], json!("dailyData"));

    let deleted = daily_crud(&state, "delete".into(), None, Some("2025-03-10_sato".into()), None)
        .await
        .expect("delete");
    assert_eq!(deleted["status"], json!("deleted"));
    assert_eq!(get_sync_queue(&state).await.unwrap().as_array().unwrap().len(), 1);

    let missing = daily_crud(&state, "update".into(), Some(daily("2025-04-01", "nobody", 1)), None, None)
        .await
        .expect_err("update of unknown record");
    assert!(missing.contains("not found"));

    let mut duplicate = daily("2025-03-12", "suzuki", 3);
    duplicate.id = "manual-entry".to_string();
    let dup = daily_crud(&state, "create".into(), Some(duplicate), None, None)
        .await
        .expect_err("second record for the same member and date");
    assert!(dup.contains("already exists"));

    let invalid = daily_crud(&state, "bogus".into(), None, None, None)
        .await
        .expect_err("unknown operation");
    assert!(invalid.contains("Unknown operation"));
}

#[tokio::test]
async fn daily_create_rejects_inconsistent_funnel() {
    let (_tmp, state) = local_state();
    let mut record = daily("2025-03-10", "sato", 10);
    record.meeting = 20;

    let err = daily_crud(&state, "create".into(), Some(record), None, None)
        .await
        .expect_err("validation failure");
    assert!(err.contains("meeting"));
    assert!(get_sync_queue(&state).await.unwrap().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn project_crud_assigns_ids_and_keeps_created_at() {
    let (_tmp, state) = local_state();

    let created = project_crud(&state, "create".into(), Some(project("Acme")), None)
        .await
        .expect("create");
    let id = created["id"].as_i64().expect("numeric id");
    let created_at = created["project"]["createdAt"].clone();
    assert!(created_at.is_string());

    let mut changed = project("Acme");
    changed.status = serde_json::from_value(json!("negotiation")).unwrap();
    let updated = project_crud(&state, "update".into(), Some(changed), Some(id))
        .await
        .expect("update");
    assert_eq!(updated["project"]["status"], json!("negotiation"));
    assert_eq!(updated["project"]["createdAt"], created_at);

    let listed = project_crud(&state, "list".into(), None, None).await.expect("list");
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let queue = get_sync_queue(&state).await.expect("queue");
    assert_eq!(queue[0]["id"], json!(format!("project_{id}")));

    let deleted = project_crud(&state, "delete".into(), None, Some(id)).await.expect("delete");
    assert_eq!(deleted["status"], json!("deleted"));
    let again = project_crud(&state, "delete".into(), None, Some(id)).await.expect("delete again");
    assert_eq!(again["status"], json!("not_found"));
}

#[tokio::test]
async fn offline_writes_are_pushed_once_connectivity_returns() {
    let api = Arc::new(FakeApi::default());
    let (_tmp, state) = api_state(api.clone()).await;

    set_online_status(&state, false).await.expect("go offline");
    daily_crud(&state, "create".into(), Some(daily("2025-03-10", "sato", 10)), None, None)
        .await
        .expect("create daily");
    project_crud(&state, "create".into(), Some(project("Acme")), None)
        .await
        .expect("create project");
    save_weekly_snapshot(&state, PeriodSnapshot::new("2025-W12"))
        .await
        .expect("save weekly");

    let skipped = sync_now(&state).await.expect("sync while offline");
    assert_eq!(skipped, json!({"status": "skipped", "reason": "offline"}));
    assert!(api.received().is_empty());

    let toggled = set_online_status(&state, true).await.expect("go online");
    assert_eq!(toggled["changed"], json!(true));
    let outcome = sync_now(&state).await.expect("sync");
    assert_eq!(outcome["status"], json!("completed"));
    assert_eq!(outcome["succeeded"], json!(3));

    let received = api.received();
    let routes: Vec<&str> = received.iter().map(|(route, _)| route.as_str()).collect();
    assert_eq!(routes, vec!["daily", "project", "weekly/2025-W12"]);
    assert_eq!(received[0].1["memberId"], json!("sato"));
    assert_eq!(api.auth_headers.lock().unwrap()[0], "Bearer test-token");
    assert!(get_sync_queue(&state).await.unwrap().as_array().unwrap().is_empty());

    let again = sync_now(&state).await.expect("second sync");
    assert_eq!(again["succeeded"], json!(0));
    assert_eq!(api.received().len(), 3);
}

#[tokio::test]
async fn rejected_writes_are_dead_lettered_and_can_be_requeued() {
    let api = Arc::new(FakeApi {
        rejected_member: Some("ghost".to_string()),
        ..Default::default()
    });
    let (_tmp, state) = api_state(api.clone()).await;

    set_online_status(&state, false).await.expect("go offline");
    daily_crud(&state, "create".into(), Some(daily("2025-03-10", "ghost", 10)), None, None)
        .await
        .expect("create rejected");
    daily_crud(&state, "create".into(), Some(daily("2025-03-10", "sato", 10)), None, None)
        .await
        .expect("create accepted");
    set_online_status(&state, true).await.expect("go online");

    let outcome = sync_now(&state).await.expect("sync");
    assert_eq!(outcome["succeeded"], json!(1));
    assert_eq!(outcome["dead_lettered"], json!(1));

    let dead = get_dead_letters(&state).await.expect("dead letters");
    assert_eq!(dead[0]["id"], json!("daily_2025-03-10_ghost"));
    assert!(dead[0]["lastError"].as_str().unwrap().contains("422"));

    set_online_status(&state, false).await.expect("go offline");
    let requeued = requeue_sync_item(&state, "daily_2025-03-10_ghost".into())
        .await
        .expect("requeue");
    assert_eq!(requeued["attemptCount"], json!(0));
    assert!(requeued["deadLetteredAt"].is_null());
    assert_eq!(get_sync_queue(&state).await.unwrap().as_array().unwrap().len(), 1);

    let unknown = requeue_sync_item(&state, "daily_nope".into()).await;
    assert!(unknown.is_err());
}

#[tokio::test]
async fn fetch_remote_data_populates_store_and_dashboard() {
    let api = Arc::new(FakeApi::default());
    let (_tmp, state) = api_state(api).await;

    let fetched = fetch_remote_data(&state).await.expect("fetch");
    assert_eq!(fetched, json!({"status": "saved", "weekly": 1, "monthly": 1, "members": 2}));
    assert!(get_sync_queue(&state).await.unwrap().as_array().unwrap().is_empty());

    let dashboard = get_dashboard_data(&state).await.expect("dashboard");
    assert_eq!(dashboard["origin"], json!("cache"));
    assert_eq!(dashboard["weekly"][0]["period"], json!("2025-W12"));
    assert_eq!(dashboard["sync"]["online"], json!(true));

    let members = list_members(&state).await.expect("members");
    assert_eq!(members["data"].as_array().unwrap().len(), 2);

    set_online_status(&state, false).await.expect("go offline");
    let err = fetch_remote_data(&state).await.expect_err("offline fetch");
    assert!(err.contains("offline"));
}

#[tokio::test]
async fn snapshot_and_member_reads_use_their_own_endpoints() {
    let api = Arc::new(FakeApi::default());
    let (_tmp, state) = api_state(api).await;

    let weekly = get_weekly_snapshot(&state, "2025-W12".into()).await.expect("weekly");
    assert_eq!(weekly["origin"], json!("live"));
    assert_eq!(weekly["data"]["metrics"]["approach"]["value"], json!(171.0));

    let monthly = get_monthly_snapshot(&state, "2025-03".into()).await.expect("monthly");
    assert_eq!(monthly["origin"], json!("live"));
    assert_eq!(monthly["data"]["period"], json!("2025-03"));

    let missing = get_weekly_snapshot(&state, "2019-W01".into()).await.expect("missing");
    assert_eq!(missing["origin"], json!("live"));
    assert!(missing["data"].is_null());

    let members = list_members(&state).await.expect("members");
    assert_eq!(members["origin"], json!("live"));
    assert_eq!(members["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn local_edit_wins_over_remote_snapshot_until_pushed() {
    let api = Arc::new(FakeApi::default());
    let (_tmp, state) = api_state(api).await;
    set_online_status(&state, false).await.expect("go offline");

    let mut edited = PeriodSnapshot::new("2025-W12");
    edited.metrics.approach.value = 999.0;
    save_weekly_snapshot(&state, edited).await.expect("save");

    let snapshot = get_weekly_snapshot(&state, "2025-W12".into()).await.expect("read");
    assert_eq!(snapshot["origin"], json!("local"));
    assert_eq!(snapshot["data"]["metrics"]["approach"]["value"], json!(999.0));

    let dashboard = get_dashboard_data(&state).await.expect("dashboard");
    assert_eq!(dashboard["weekly"][0]["metrics"]["approach"]["value"], json!(999.0));
    assert_eq!(dashboard["sync"]["pending"], json!(1));
}

#[tokio::test]
async fn dashboard_falls_back_to_bundled_then_local_data() {
    let (_tmp, state) = local_state();

    let bundled = get_dashboard_data(&state).await.expect("dashboard");
    assert_eq!(bundled["origin"], json!("static"));
    assert!(!bundled["weekly"].as_array().unwrap().is_empty());

    save_weekly_snapshot(&state, PeriodSnapshot::new("2025-W20"))
        .await
        .expect("save");
    let local = get_dashboard_data(&state).await.expect("dashboard");
    assert_eq!(local["origin"], json!("local"));
    assert_eq!(local["weekly"][0]["period"], json!("2025-W20"));

    let sync = sync_now(&state).await.expect("sync without backend");
    assert_eq!(sync, json!({"status": "skipped", "reason": "no_remote"}));
}
