use super::{OutboundWrite, RemoteBackend};
use crate::error::{Error, Result};
use crate::models::dataset::RemoteDataset;
use crate::models::member::Member;
use crate::models::snapshot::{FunnelMetrics, PeriodSnapshot};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::time::Duration;

pub const DEFAULT_SHEETS_API: &str = "https://sheets.googleapis.com/v4";

const STAGES: [&str; 6] = ["approach", "meeting", "negotiation", "proposal", "contract", "amount"];

/// Display headers used in the team's spreadsheets, mapped to canonical field names.
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("期間", "period"),
    ("期間（短縮）", "period_short"),
    ("担当者ID", "id"),
    ("key", "id"),
    ("担当者名", "name"),
    ("担当者", "name"),
];

const STAGE_LABELS: &[(&str, &str)] = &[
    ("アプローチ", "approach"),
    ("面談", "meeting"),
    ("商談", "negotiation"),
    ("提案", "proposal"),
    ("契約", "contract"),
    ("契約金額", "amount"),
];

const SUFFIX_LABELS: &[(&str, &str)] = &[
    ("実績", "value"),
    ("目標", "target"),
    ("前期比", "change"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNames {
    pub weekly: String,
    pub monthly: String,
    pub members: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            weekly: "Weekly".to_string(),
            monthly: "Monthly".to_string(),
            members: "Members".to_string(),
        }
    }
}

/// Read-only backend over a Google Sheets spreadsheet (one sheet per record type).
pub struct SheetsBackend {
    api_base: String,
    spreadsheet_id: String,
    api_key: String,
    sheets: SheetNames,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsBackend {
    pub fn new(
        spreadsheet_id: &str,
        api_key: &str,
        sheets: SheetNames,
        timeout: Duration,
    ) -> Result<Self> {
        if spreadsheet_id.trim().is_empty() || api_key.trim().is_empty() {
            return Err(Error::Config(
                "spreadsheet id and API key are both required".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base: DEFAULT_SHEETS_API.to_string(),
            spreadsheet_id: spreadsheet_id.trim().to_string(),
            api_key: api_key.trim().to_string(),
            sheets,
            client,
        })
    }

    /// Points the backend at a different Sheets-compatible host.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    async fn batch_get(&self) -> Result<Vec<Vec<Vec<Value>>>> {
        let url = format!(
            "{}/spreadsheets/{}/values:batchGet",
            self.api_base, self.spreadsheet_id
        );
        let response = self
            .client
            .get(&url)
            .query(&[
                ("ranges", self.sheets.weekly.as_str()),
                ("ranges", self.sheets.monthly.as_str()),
                ("ranges", self.sheets.members.as_str()),
                ("majorDimension", "ROWS"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Network(format!(
                "Sheets API returned HTTP {} for spreadsheet {}: {body}",
                status.as_u16(),
                self.spreadsheet_id
            )));
        }

        let parsed: BatchGetResponse = response.json().await?;
        Ok(parsed.value_ranges.into_iter().map(|r| r.values).collect())
    }
}

#[async_trait]
impl RemoteBackend for SheetsBackend {
    fn name(&self) -> &'static str {
        "spreadsheet"
    }

    fn supports_writes(&self) -> bool {
        false
    }

    async fn ping(&self) -> Result<()> {
        let url = format!("{}/spreadsheets/{}", self.api_base, self.spreadsheet_id);
        let response = self
            .client
            .get(&url)
            .query(&[("fields", "spreadsheetId"), ("key", self.api_key.as_str())])
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Network(format!(
                "Sheets API returned HTTP {}",
                response.status().as_u16()
            )))
        }
    }

    async fn fetch_all(&self) -> Result<RemoteDataset> {
        let mut ranges = self.batch_get().await?.into_iter();
        let weekly = ranges.next().unwrap_or_default();
        let monthly = ranges.next().unwrap_or_default();
        let members = ranges.next().unwrap_or_default();

        Ok(RemoteDataset {
            weekly: snapshots_from_rows(&weekly),
            monthly: snapshots_from_rows(&monthly),
            members: members_from_rows(&members),
        })
    }

    async fn fetch_weekly(&self, period: &str) -> Result<Option<PeriodSnapshot>> {
        let dataset = self.fetch_all().await?;
        Ok(dataset.weekly.into_iter().find(|s| s.period == period))
    }

    async fn fetch_monthly(&self, period: &str) -> Result<Option<PeriodSnapshot>> {
        let dataset = self.fetch_all().await?;
        Ok(dataset.monthly.into_iter().find(|s| s.period == period))
    }

    async fn fetch_members(&self) -> Result<Vec<Member>> {
        Ok(self.fetch_all().await?.members)
    }

    async fn push(&self, write: &OutboundWrite) -> Result<()> {
        Err(Error::Config(format!(
            "spreadsheet backend is read-only; cannot push {}",
            write.describe()
        )))
    }
}

/// Maps a sheet header to its canonical field name.
pub fn canonical_header(raw: &str) -> String {
    let header = raw.trim();

    if let Some((_, canonical)) = HEADER_ALIASES.iter().find(|(alias, _)| *alias == header) {
        return canonical.to_string();
    }

    // Longest stage label first so "契約金額" is not read as "契約" + "金額".
    let mut stages: Vec<&(&str, &str)> = STAGE_LABELS.iter().collect();
    stages.sort_by_key(|(label, _)| std::cmp::Reverse(label.chars().count()));
    for (stage_label, stage) in stages {
        if let Some(rest) = header.strip_prefix(stage_label) {
            if let Some((_, suffix)) = SUFFIX_LABELS.iter().find(|(label, _)| *label == rest) {
                return format!("{stage}_{suffix}");
            }
        }
    }

    header.to_lowercase().replace([' ', '-'], "_")
}

/// Columns that identify a row and must keep their exact text (`"007"` stays `"007"`).
const TEXT_FIELDS: [&str; 4] = ["id", "name", "period", "period_short"];

fn text_cell(cell: &Value) -> Option<Value> {
    let text = match cell {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(Value::String(text))
}

/// Numeric-looking cells become JSON numbers; blanks are dropped.
fn coerce_cell(cell: &Value) -> Option<Value> {
    let text = match cell {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => return Some(other.clone()),
    };
    if text.is_empty() {
        return None;
    }

    let numeric: String = text
        .trim_start_matches(['¥', '$'])
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if let Ok(n) = numeric.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    if let Some(n) = numeric.parse::<f64>().ok().and_then(Number::from_f64) {
        return Some(Value::Number(n));
    }
    Some(Value::String(text))
}

fn rows_to_objects(values: &[Vec<Value>]) -> Vec<Map<String, Value>> {
    let Some((header_row, rows)) = values.split_first() else {
        return Vec::new();
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|h| canonical_header(h.as_str().unwrap_or_default()))
        .collect();

    rows.iter()
        .map(|row| {
            headers
                .iter()
                .zip(row.iter())
                .filter_map(|(header, cell)| {
                    let value = if TEXT_FIELDS.contains(&header.as_str()) {
                        text_cell(cell)
                    } else {
                        coerce_cell(cell)
                    };
                    value.map(|v| (header.clone(), v))
                })
                .collect()
        })
        .collect()
}

pub fn snapshots_from_rows(values: &[Vec<Value>]) -> Vec<PeriodSnapshot> {
    rows_to_objects(values)
        .into_iter()
        .filter_map(|mut fields| {
            let period = fields.remove("period")?.as_str()?.to_string();

            let mut metrics = FunnelMetrics::default();
            for stage in STAGES {
                let Some(metric) = metrics.get_mut(stage) else {
                    continue;
                };
                if let Some(v) = fields.remove(&format!("{stage}_value")).and_then(|v| v.as_f64()) {
                    metric.value = v;
                }
                if let Some(v) = fields.remove(&format!("{stage}_target")).and_then(|v| v.as_f64()) {
                    metric.target = v;
                }
                if let Some(v) = fields.remove(&format!("{stage}_change")).and_then(|v| v.as_f64()) {
                    metric.change = v;
                }
            }

            Some(PeriodSnapshot {
                period,
                metrics,
                extra: fields,
            })
        })
        .collect()
}

pub fn members_from_rows(values: &[Vec<Value>]) -> Vec<Member> {
    rows_to_objects(values)
        .into_iter()
        .filter_map(|fields| {
            let id = fields.get("id")?.as_str()?.to_string();
            let name = fields.get("name")?.as_str()?.to_string();
            Some(Member { id, name })
        })
        .collect()
}
