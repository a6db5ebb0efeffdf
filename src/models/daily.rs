use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    /// Empty means "derive from date and member" on first save.
    #[serde(default)]
    pub id: String,
    pub date: NaiveDate,
    pub member_id: String,
    pub approach: i64,
    pub meeting: i64,
    pub negotiation: i64,
    pub proposal: i64,
    pub contract: i64,
    pub amount: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl DailyRecord {
    pub fn derived_id(date: NaiveDate, member_id: &str) -> String {
        format!("{}_{}", date.format("%Y-%m-%d"), member_id)
    }

    /// Funnel stages in order, paired with their field names.
    pub fn funnel(&self) -> [(&'static str, i64); 5] {
        [
            ("approach", self.approach),
            ("meeting", self.meeting),
            ("negotiation", self.negotiation),
            ("proposal", self.proposal),
            ("contract", self.contract),
        ]
    }
}
