use super::member::Member;
use super::snapshot::PeriodSnapshot;
use serde::{Deserialize, Serialize};

/// Full payload of `GET /data/all`, and the unit the fallback layers work in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteDataset {
    #[serde(default)]
    pub weekly: Vec<PeriodSnapshot>,
    #[serde(default)]
    pub monthly: Vec<PeriodSnapshot>,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl RemoteDataset {
    pub fn is_empty(&self) -> bool {
        self.weekly.is_empty() && self.monthly.is_empty() && self.members.is_empty()
    }
}
