use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "dailyData")]
    DailyData,
    #[serde(rename = "project")]
    Project,
    #[serde(rename = "weeklyData")]
    WeeklyData,
    #[serde(rename = "monthlyData")]
    MonthlyData,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::DailyData => "dailyData",
            RecordType::Project => "project",
            RecordType::WeeklyData => "weeklyData",
            RecordType::MonthlyData => "monthlyData",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "dailyData" => Some(RecordType::DailyData),
            "project" => Some(RecordType::Project),
            "weeklyData" => Some(RecordType::WeeklyData),
            "monthlyData" => Some(RecordType::MonthlyData),
            _ => None,
        }
    }

    /// Sync-status ids are derived from the record key, so a second edit of the
    /// same record supersedes the first instead of queueing behind it.
    pub fn status_id(&self, data_id: &str) -> String {
        let prefix = match self {
            RecordType::DailyData => "daily",
            RecordType::Project => "project",
            RecordType::WeeklyData => "weekly",
            RecordType::MonthlyData => "monthly",
        };
        format!("{prefix}_{data_id}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    Synced,
    DeadLettered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub id: String,
    pub record_type: RecordType,
    pub data_id: String,
    pub synced: bool,
    pub revision: i64,
    pub attempt_count: u32,
    pub last_error: Option<String>,
    /// Milliseconds since the epoch.
    pub created_at: i64,
    pub synced_at: Option<i64>,
    pub dead_lettered_at: Option<i64>,
}

impl SyncStatus {
    pub fn state(&self) -> SyncState {
        if self.synced {
            SyncState::Synced
        } else if self.dead_lettered_at.is_some() {
            SyncState::DeadLettered
        } else {
            SyncState::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub pending: usize,
    pub synced: usize,
    pub dead_lettered: usize,
}
