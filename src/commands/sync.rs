use crate::AppState;
use serde_json::{json, Value};

pub async fn sync_now(state: &AppState) -> Result<Value, String> {
    let outcome = state
        .synchronizer
        .sync_data()
        .await
        .map_err(|e| format!("Sync error: {e}"))?;
    serde_json::to_value(outcome).map_err(|e| format!("Serialize error: {e}"))
}

pub async fn fetch_remote_data(state: &AppState) -> Result<Value, String> {
    let dataset = state
        .synchronizer
        .fetch_and_save_data()
        .await
        .map_err(|e| format!("Fetch error: {e}"))?;
    Ok(json!({
        "status": "saved",
        "weekly": dataset.weekly.len(),
        "monthly": dataset.monthly.len(),
        "members": dataset.members.len(),
    }))
}

pub async fn get_sync_queue(state: &AppState) -> Result<Value, String> {
    let pending = state
        .store
        .list_unsynced()
        .map_err(|e| format!("Query error: {e}"))?;
    Ok(serde_json::to_value(pending).unwrap_or_else(|_| json!([])))
}

pub async fn get_dead_letters(state: &AppState) -> Result<Value, String> {
    let dead = state
        .store
        .list_dead_letters()
        .map_err(|e| format!("Query error: {e}"))?;
    Ok(serde_json::to_value(dead).unwrap_or_else(|_| json!([])))
}

pub async fn requeue_sync_item(state: &AppState, id: String) -> Result<Value, String> {
    let status = state
        .store
        .requeue(&id)
        .map_err(|e| format!("Requeue error: {e}"))?;
    state.synchronizer.request_sync();
    serde_json::to_value(status).map_err(|e| format!("Serialize error: {e}"))
}

/// Manual override of the online flag; going online starts a pass via the watcher.
pub async fn set_online_status(state: &AppState, online: bool) -> Result<Value, String> {
    let changed = state.connectivity().set_online(online);
    Ok(json!({"online": online, "changed": changed}))
}
