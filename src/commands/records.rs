use crate::error::Error;
use crate::models::daily::DailyRecord;
use crate::models::project::Project;
use crate::models::snapshot::PeriodSnapshot;
use crate::store::{SnapshotKind, WriteOrigin};
use crate::AppState;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

/// Optional arguments for the `range` and `member` daily operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub member_id: Option<String>,
}

pub async fn daily_crud(
    state: &AppState,
    operation: String,
    record: Option<DailyRecord>,
    id: Option<String>,
    filter: Option<DailyFilter>,
) -> Result<Value, String> {
    let store = &state.store;
    let filter = filter.unwrap_or_default();

    match operation.as_str() {
        "create" => {
            let record = record.ok_or("Record required for create")?;
            let saved = store
                .put_daily(record, WriteOrigin::Local)
                .map_err(save_error)?;
            state.synchronizer.request_sync();
            Ok(json!({"status": "created", "id": saved.id, "record": saved}))
        }
        "update" => {
            let mut record = record.ok_or("Record required for update")?;
            if let Some(id) = id {
                record.id = id;
            }
            if record.id.is_empty() {
                record.id = DailyRecord::derived_id(record.date, &record.member_id);
            }
            let exists = store
                .get_daily(&record.id)
                .map_err(|e| format!("Read error: {e}"))?
                .is_some();
            if !exists {
                return Err(format!("Daily record not found: {}", record.id));
            }
            let saved = store
                .put_daily(record, WriteOrigin::Local)
                .map_err(save_error)?;
            state.synchronizer.request_sync();
            Ok(json!({"status": "updated", "id": saved.id, "record": saved}))
        }
        "read" => {
            let id = id.ok_or("ID required for read")?;
            let record = store.get_daily(&id).map_err(|e| format!("Read error: {e}"))?;
            Ok(serde_json::to_value(record).unwrap_or(Value::Null))
        }
        "list" => {
            let records = store.list_daily().map_err(|e| format!("Query error: {e}"))?;
            Ok(serde_json::to_value(records).unwrap_or_else(|_| json!([])))
        }
        "range" => {
            let start = filter.start.ok_or("Start date required for range")?;
            let end = filter.end.ok_or("End date required for range")?;
            let records = store
                .get_daily_by_date_range(start, end)
                .map_err(|e| format!("Query error: {e}"))?;
            Ok(serde_json::to_value(records).unwrap_or_else(|_| json!([])))
        }
        "member" => {
            let member_id = filter.member_id.ok_or("Member ID required for member")?;
            let records = store
                .get_daily_by_member(&member_id)
                .map_err(|e| format!("Query error: {e}"))?;
            Ok(serde_json::to_value(records).unwrap_or_else(|_| json!([])))
        }
        "delete" => {
            let id = id.ok_or("ID required for delete")?;
            let deleted = store.delete_daily(&id).map_err(|e| format!("Delete error: {e}"))?;
            let status = if deleted { "deleted" } else { "not_found" };
            Ok(json!({"status": status, "id": id}))
        }
        _ => Err(format!("Unknown operation: {operation}")),
    }
}

pub async fn project_crud(
    state: &AppState,
    operation: String,
    project: Option<Project>,
    id: Option<i64>,
) -> Result<Value, String> {
    let store = &state.store;

    match operation.as_str() {
        "create" => {
            let mut project = project.ok_or("Project required for create")?;
            project.id = None;
            let saved = store
                .put_project(project, WriteOrigin::Local)
                .map_err(|e| format!("Save error: {e}"))?;
            state.synchronizer.request_sync();
            Ok(json!({"status": "created", "id": saved.id, "project": saved}))
        }
        "update" => {
            let mut project = project.ok_or("Project required for update")?;
            let id = id.or(project.id).ok_or("ID required for update")?;
            let exists = store
                .get_project(id)
                .map_err(|e| format!("Read error: {e}"))?
                .is_some();
            if !exists {
                return Err(format!("Project not found: {id}"));
            }
            project.id = Some(id);
            let saved = store
                .put_project(project, WriteOrigin::Local)
                .map_err(|e| format!("Save error: {e}"))?;
            state.synchronizer.request_sync();
            Ok(json!({"status": "updated", "id": saved.id, "project": saved}))
        }
        "read" => {
            let id = id.ok_or("ID required for read")?;
            let project = store.get_project(id).map_err(|e| format!("Read error: {e}"))?;
            Ok(serde_json::to_value(project).unwrap_or(Value::Null))
        }
        "list" => {
            let projects = store.list_projects().map_err(|e| format!("Query error: {e}"))?;
            Ok(serde_json::to_value(projects).unwrap_or_else(|_| json!([])))
        }
        "delete" => {
            let id = id.ok_or("ID required for delete")?;
            let deleted = store.delete_project(id).map_err(|e| format!("Delete error: {e}"))?;
            let status = if deleted { "deleted" } else { "not_found" };
            Ok(json!({"status": status, "id": id}))
        }
        _ => Err(format!("Unknown operation: {operation}")),
    }
}

pub async fn save_weekly_snapshot(state: &AppState, snapshot: PeriodSnapshot) -> Result<Value, String> {
    save_snapshot(state, SnapshotKind::Weekly, snapshot)
}

pub async fn save_monthly_snapshot(state: &AppState, snapshot: PeriodSnapshot) -> Result<Value, String> {
    save_snapshot(state, SnapshotKind::Monthly, snapshot)
}

fn save_snapshot(state: &AppState, kind: SnapshotKind, snapshot: PeriodSnapshot) -> Result<Value, String> {
    let saved = state
        .store
        .put_snapshot(kind, snapshot, WriteOrigin::Local)
        .map_err(|e| format!("Save error: {e}"))?;
    state.synchronizer.request_sync();
    Ok(json!({"status": "saved", "period": saved.period}))
}

fn save_error(e: Error) -> String {
    if e.is_constraint_violation() {
        format!("A record for this member and date already exists: {e}")
    } else {
        format!("Save error: {e}")
    }
}
