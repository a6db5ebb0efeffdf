//! Remote side of the dashboard: REST or Google Sheets backends behind one
//! trait, plus the caching/fallback gateway the rest of the crate talks to.

pub mod gateway;
pub mod http;
pub mod sheets;
pub mod static_data;
#[cfg(test)]
pub(crate) mod testing;

use crate::error::Result;
use crate::models::daily::DailyRecord;
use crate::models::dataset::RemoteDataset;
use crate::models::member::Member;
use crate::models::project::Project;
use crate::models::snapshot::PeriodSnapshot;
use async_trait::async_trait;

pub use gateway::{CachePolicy, DataOrigin, Gateway, Sourced};

/// A local write on its way to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundWrite {
    Daily(DailyRecord),
    Project(Project),
    Weekly(PeriodSnapshot),
    Monthly(PeriodSnapshot),
}

impl OutboundWrite {
    pub fn describe(&self) -> String {
        match self {
            OutboundWrite::Daily(r) => format!("daily record {}", r.id),
            OutboundWrite::Project(p) => format!("project {}", p.id.unwrap_or_default()),
            OutboundWrite::Weekly(s) => format!("weekly snapshot {}", s.period),
            OutboundWrite::Monthly(s) => format!("monthly snapshot {}", s.period),
        }
    }
}

#[async_trait]
pub trait RemoteBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports_writes(&self) -> bool {
        true
    }

    /// Cheap reachability check used by the connectivity probe.
    async fn ping(&self) -> Result<()>;

    async fn fetch_all(&self) -> Result<RemoteDataset>;

    async fn fetch_weekly(&self, period: &str) -> Result<Option<PeriodSnapshot>>;

    async fn fetch_monthly(&self, period: &str) -> Result<Option<PeriodSnapshot>>;

    async fn fetch_members(&self) -> Result<Vec<Member>>;

    async fn push(&self, write: &OutboundWrite) -> Result<()>;
}
