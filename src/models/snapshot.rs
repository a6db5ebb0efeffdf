use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub target: f64,
    #[serde(default)]
    pub change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunnelMetrics {
    #[serde(default)]
    pub approach: MetricValue,
    #[serde(default)]
    pub meeting: MetricValue,
    #[serde(default)]
    pub negotiation: MetricValue,
    #[serde(default)]
    pub proposal: MetricValue,
    #[serde(default)]
    pub contract: MetricValue,
    #[serde(default)]
    pub amount: MetricValue,
}

impl FunnelMetrics {
    pub fn get_mut(&mut self, stage: &str) -> Option<&mut MetricValue> {
        match stage {
            "approach" => Some(&mut self.approach),
            "meeting" => Some(&mut self.meeting),
            "negotiation" => Some(&mut self.negotiation),
            "proposal" => Some(&mut self.proposal),
            "contract" => Some(&mut self.contract),
            "amount" => Some(&mut self.amount),
            _ => None,
        }
    }
}

/// Weekly or monthly KPI snapshot keyed by its period label (e.g. `2025-W12`, `2025-03`).
/// Dashboard-specific sections (trend, conversion, distribution) ride along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSnapshot {
    pub period: String,
    #[serde(default)]
    pub metrics: FunnelMetrics,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PeriodSnapshot {
    pub fn new(period: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            ..Default::default()
        }
    }
}
