use crate::remote::http::AuthScheme;
use crate::remote::sheets::SheetNames;
use crate::remote::CachePolicy;
use crate::AppState;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_SCHEMA_VERSION: i64 = 2;
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Local,
    Api,
    Spreadsheet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSettings {
    pub data_source: DataSource,
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub auth_scheme: AuthScheme,
    pub spreadsheet_id: String,
    pub spreadsheet_api_key: String,
    pub sheets: SheetNames,
    pub cache: CachePolicy,
    pub sync_interval: Duration,
    pub refresh_interval: Duration,
    pub connectivity_probe: Duration,
    pub request_timeout: Duration,
    pub max_sync_attempts: u32,
    /// Relative paths resolve against the working directory.
    pub static_data_dir: PathBuf,
}

pub async fn get_settings(state: &AppState) -> Result<Value, String> {
    load_settings_from_disk(&state.data_dir)
}

/// Changes to the data source or intervals take effect on the next start.
pub async fn save_settings(state: &AppState, settings: Value) -> Result<Value, String> {
    save_settings_to_disk(&state.data_dir, settings)
}

pub fn load_effective_settings(data_dir: &Path) -> Result<EffectiveSettings, String> {
    let settings = load_settings_from_disk(data_dir)?;
    Ok(effective_from_value(&settings))
}

fn effective_from_value(settings: &Value) -> EffectiveSettings {
    let str_at = |pointer: &str| {
        settings
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string()
    };
    let secs_at = |key: &str, default: u64| {
        Duration::from_secs(settings.get(key).and_then(Value::as_u64).unwrap_or(default))
    };

    let data_source = match settings.get("dataSource").and_then(Value::as_str) {
        Some("api") => DataSource::Api,
        Some("spreadsheet") => DataSource::Spreadsheet,
        _ => DataSource::Local,
    };
    let api_key = Some(str_at("/api/key")).filter(|key| !key.is_empty());

    EffectiveSettings {
        data_source,
        api_base_url: str_at("/api/baseUrl"),
        api_key,
        auth_scheme: AuthScheme::parse(&str_at("/api/authScheme")),
        spreadsheet_id: str_at("/spreadsheet/id"),
        spreadsheet_api_key: str_at("/spreadsheet/apiKey"),
        sheets: SheetNames {
            weekly: str_at("/spreadsheet/sheets/weekly"),
            monthly: str_at("/spreadsheet/sheets/monthly"),
            members: str_at("/spreadsheet/sheets/members"),
        },
        cache: CachePolicy {
            enabled: settings
                .pointer("/cache/enabled")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            ttl: Duration::from_secs(
                settings
                    .pointer("/cache/expirySecs")
                    .and_then(Value::as_u64)
                    .unwrap_or(600),
            ),
        },
        sync_interval: secs_at("syncIntervalSecs", 300),
        refresh_interval: secs_at("refreshIntervalSecs", 300),
        connectivity_probe: secs_at("connectivityProbeSecs", 30),
        request_timeout: secs_at("requestTimeoutSecs", 30),
        max_sync_attempts: settings
            .get("maxSyncAttempts")
            .and_then(Value::as_u64)
            .unwrap_or(3) as u32,
        static_data_dir: PathBuf::from(str_at("/staticDataDir")),
    }
}

pub fn load_settings_from_disk(data_dir: &Path) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings.json: {e}"))?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|e| {
            log::warn!("settings.json is malformed, using defaults: {e}");
            json!({})
        })
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(data_dir: &Path, settings: Value) -> Result<Value, String> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let mut merged = load_settings_from_disk(data_dir).unwrap_or_else(|_| default_settings());
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    log::info!("settings saved to {}", path.display());
    Ok(migrated)
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE)
}

fn ensure_data_dir(data_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(data_dir)
        .map_err(|e| format!("Failed to create data directory {}: {e}", data_dir.display()))
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write settings.json: {e}"))
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let version = out
        .get("schema_version")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if version < 1 {
        migrate_millisecond_intervals(&mut out);
    }

    deep_merge_defaults(&mut out, &defaults);

    if version < 2 {
        // V2 adds the connectivity probe and the dead-letter threshold.
        ensure_key(&mut out, "connectivityProbeSecs", json!(30));
        ensure_key(&mut out, "maxSyncAttempts", json!(3));
    }

    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "dataSource": "local",
        "api": {
            "baseUrl": "",
            "key": "",
            "authScheme": "bearer"
        },
        "spreadsheet": {
            "id": "",
            "apiKey": "",
            "sheets": {
                "weekly": "Weekly",
                "monthly": "Monthly",
                "members": "Members"
            }
        },
        "cache": {
            "enabled": true,
            "expirySecs": 600
        },
        "syncIntervalSecs": 300,
        "refreshIntervalSecs": 300,
        "connectivityProbeSecs": 30,
        "requestTimeoutSecs": 30,
        "maxSyncAttempts": 3,
        "staticDataDir": "data"
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                } else if default_value.is_object() {
                    *existing = default_value.clone();
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn ensure_key(target: &mut Value, key: &str, value: Value) {
    if let Some(obj) = target.as_object_mut() {
        obj.entry(key.to_string()).or_insert(value);
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

/// Pre-versioned files stored intervals in milliseconds under different keys.
fn migrate_millisecond_intervals(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    for (legacy, current) in [
        ("refreshInterval", "refreshIntervalSecs"),
        ("syncInterval", "syncIntervalSecs"),
    ] {
        if let Some(ms) = obj.remove(legacy).and_then(|v| v.as_u64()) {
            obj.insert(current.to_string(), json!(ms / 1000));
        }
    }

    if let Some(cache) = obj.get_mut("cache").and_then(Value::as_object_mut) {
        if let Some(ms) = cache.remove("expiry").and_then(|v| v.as_u64()) {
            cache.insert("expirySecs".to_string(), json!(ms / 1000));
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    // Clamp numerics.
    clamp_u64(obj, "syncIntervalSecs", 30, 86_400, 300);
    clamp_u64(obj, "refreshIntervalSecs", 30, 86_400, 300);
    clamp_u64(obj, "connectivityProbeSecs", 5, 3_600, 30);
    clamp_u64(obj, "requestTimeoutSecs", 1, 300, 30);
    clamp_u64(obj, "maxSyncAttempts", 1, 20, 3);

    // Validate enums.
    sanitize_enum(obj, "dataSource", &["local", "api", "spreadsheet"], "local");
    ensure_string(obj, "staticDataDir", "data");

    if let Some(api) = obj.get_mut("api").and_then(Value::as_object_mut) {
        sanitize_enum(api, "authScheme", &["bearer", "apiKey"], "bearer");
        ensure_string(api, "baseUrl", "");
        ensure_string(api, "key", "");
    }

    if let Some(sheet) = obj.get_mut("spreadsheet").and_then(Value::as_object_mut) {
        ensure_string(sheet, "id", "");
        ensure_string(sheet, "apiKey", "");
        if let Some(names) = sheet.get_mut("sheets").and_then(Value::as_object_mut) {
            ensure_string(names, "weekly", "Weekly");
            ensure_string(names, "monthly", "Monthly");
            ensure_string(names, "members", "Members");
        }
    }

    if let Some(cache) = obj.get_mut("cache").and_then(Value::as_object_mut) {
        ensure_bool(cache, "enabled", true);
        clamp_u64(cache, "expirySecs", 0, 86_400, 600);
    }
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn sanitize_enum(map: &mut Map<String, Value>, key: &str, allowed: &[&str], default: &str) {
    let valid = map
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| allowed.contains(value))
        .unwrap_or(default);
    map.insert(key.to_string(), json!(valid));
}

fn ensure_bool(map: &mut Map<String, Value>, key: &str, default: bool) {
    let value = map.get(key).and_then(Value::as_bool).unwrap_or(default);
    map.insert(key.to_string(), json!(value));
}

fn ensure_string(map: &mut Map<String, Value>, key: &str, default: &str) {
    if !map.get(key).is_some_and(Value::is_string) {
        map.insert(key.to_string(), json!(default));
    }
}
