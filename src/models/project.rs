use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Initial,
    Meeting,
    Proposal,
    Negotiation,
    Contract,
    Lost,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Initial => "initial",
            ProjectStatus::Meeting => "meeting",
            ProjectStatus::Proposal => "proposal",
            ProjectStatus::Negotiation => "negotiation",
            ProjectStatus::Contract => "contract",
            ProjectStatus::Lost => "lost",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "initial" => Some(ProjectStatus::Initial),
            "meeting" => Some(ProjectStatus::Meeting),
            "proposal" => Some(ProjectStatus::Proposal),
            "negotiation" => Some(ProjectStatus::Negotiation),
            "contract" => Some(ProjectStatus::Contract),
            "lost" => Some(ProjectStatus::Lost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Assigned by the store on first save.
    #[serde(default)]
    pub id: Option<i64>,
    pub company_name: String,
    pub name: String,
    pub status: ProjectStatus,
    pub assigned_to: String,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
