use crate::models::dataset::RemoteDataset;
use crate::models::snapshot::PeriodSnapshot;
use crate::models::sync_status::RecordType;
use crate::remote::{DataOrigin, Sourced};
use crate::store::SnapshotKind;
use crate::AppState;
use serde_json::{json, Value};

/// Everything the dashboard renders in one payload, tagged with where the
/// remote half came from.
pub async fn get_dashboard_data(state: &AppState) -> Result<Value, String> {
    let mut loaded = state.gateway.load_dataset().await;

    if loaded.origin == DataOrigin::Static {
        let local = state
            .store
            .local_dataset()
            .map_err(|e| format!("Read error: {e}"))?;
        if !local.is_empty() {
            loaded = Sourced::new(DataOrigin::Local, local);
        }
    }
    overlay_pending_snapshots(state, &mut loaded.data)?;

    let projects = state
        .store
        .list_projects()
        .map_err(|e| format!("Query error: {e}"))?;
    let summary = state
        .store
        .sync_summary()
        .map_err(|e| format!("Query error: {e}"))?;

    Ok(json!({
        "origin": loaded.origin,
        "weekly": loaded.data.weekly,
        "monthly": loaded.data.monthly,
        "members": loaded.data.members,
        "projects": projects,
        "sync": {
            "online": state.connectivity().is_online(),
            "syncing": state.synchronizer.is_syncing(),
            "pending": summary.pending,
            "synced": summary.synced,
            "deadLettered": summary.dead_lettered,
        }
    }))
}

pub async fn get_weekly_snapshot(state: &AppState, period: String) -> Result<Value, String> {
    get_snapshot(state, SnapshotKind::Weekly, &period).await
}

pub async fn get_monthly_snapshot(state: &AppState, period: String) -> Result<Value, String> {
    get_snapshot(state, SnapshotKind::Monthly, &period).await
}

/// An unpushed local edit wins over the remote copy; otherwise remote, then local, then static.
async fn get_snapshot(state: &AppState, kind: SnapshotKind, period: &str) -> Result<Value, String> {
    let local = state
        .store
        .get_snapshot(kind, period)
        .map_err(|e| format!("Read error: {e}"))?;
    let pending = has_pending_edit(state, kind.record_type(), period)?;

    let sourced = match local {
        Some(snapshot) if pending => Sourced::new(DataOrigin::Local, Some(snapshot)),
        local => {
            let remote = state.gateway.load_snapshot(kind, period).await;
            match (remote.origin, remote.data, local) {
                (DataOrigin::Static, _, Some(snapshot)) | (_, None, Some(snapshot)) => {
                    Sourced::new(DataOrigin::Local, Some(snapshot))
                }
                (origin, data, _) => Sourced::new(origin, data),
            }
        }
    };

    serde_json::to_value(sourced).map_err(|e| format!("Serialize error: {e}"))
}

pub async fn list_members(state: &AppState) -> Result<Value, String> {
    let loaded = state.gateway.load_members().await;
    let sourced = if loaded.origin == DataOrigin::Static || loaded.data.is_empty() {
        let local = state
            .store
            .list_members()
            .map_err(|e| format!("Query error: {e}"))?;
        if local.is_empty() {
            loaded
        } else {
            Sourced::new(DataOrigin::Local, local)
        }
    } else {
        loaded
    };
    serde_json::to_value(sourced).map_err(|e| format!("Serialize error: {e}"))
}

fn has_pending_edit(state: &AppState, record_type: RecordType, data_id: &str) -> Result<bool, String> {
    let status = state
        .store
        .get_sync_status(&record_type.status_id(data_id))
        .map_err(|e| format!("Read error: {e}"))?;
    Ok(status.is_some_and(|s| !s.synced && s.dead_lettered_at.is_none()))
}

fn overlay_pending_snapshots(state: &AppState, dataset: &mut RemoteDataset) -> Result<(), String> {
    let pending = state
        .store
        .list_unsynced()
        .map_err(|e| format!("Query error: {e}"))?;

    for status in pending {
        let (kind, target) = match status.record_type {
            RecordType::WeeklyData => (SnapshotKind::Weekly, &mut dataset.weekly),
            RecordType::MonthlyData => (SnapshotKind::Monthly, &mut dataset.monthly),
            _ => continue,
        };
        let snapshot = state
            .store
            .get_snapshot(kind, &status.data_id)
            .map_err(|e| format!("Read error: {e}"))?;
        if let Some(snapshot) = snapshot {
            replace_or_push(target, snapshot);
        }
    }
    Ok(())
}

fn replace_or_push(list: &mut Vec<PeriodSnapshot>, snapshot: PeriodSnapshot) {
    match list.iter_mut().find(|s| s.period == snapshot.period) {
        Some(existing) => *existing = snapshot,
        None => list.push(snapshot),
    }
}
