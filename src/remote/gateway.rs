use super::static_data::StaticData;
use super::{OutboundWrite, RemoteBackend};
use crate::error::{Error, Result};
use crate::models::dataset::RemoteDataset;
use crate::models::member::Member;
use crate::models::snapshot::PeriodSnapshot;
use crate::store::SnapshotKind;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Live,
    Cache,
    Static,
    Local,
}

/// Data plus where it came from, so the UI can flag stale views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub origin: DataOrigin,
    pub data: T,
}

impl<T> Sourced<T> {
    pub fn new(origin: DataOrigin, data: T) -> Self {
        Self { origin, data }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        Sourced {
            origin: self.origin,
            data: f(self.data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub enabled: bool,
    pub ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(600),
        }
    }
}

struct CachedDataset {
    fetched_at: Instant,
    dataset: RemoteDataset,
}

pub struct Gateway {
    backend: Option<Arc<dyn RemoteBackend>>,
    static_data: StaticData,
    policy: CachePolicy,
    cache: Mutex<Option<CachedDataset>>,
}

impl Gateway {
    pub fn new(
        backend: Option<Arc<dyn RemoteBackend>>,
        static_data: StaticData,
        policy: CachePolicy,
    ) -> Self {
        Self {
            backend,
            static_data,
            policy,
            cache: Mutex::new(None),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map(|b| b.name()).unwrap_or("local")
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// True when there is a backend that accepts writes.
    pub fn can_push(&self) -> bool {
        self.backend.as_ref().is_some_and(|b| b.supports_writes())
    }

    pub async fn ping(&self) -> Result<()> {
        match &self.backend {
            Some(backend) => backend.ping().await,
            None => Err(Error::NotConfigured),
        }
    }

    /// Uncached fetch; refreshes the cache on success.
    pub async fn fetch_all(&self) -> Result<RemoteDataset> {
        let backend = self.backend.as_ref().ok_or(Error::NotConfigured)?;
        let dataset = backend.fetch_all().await?;
        self.store_cache(&dataset);
        Ok(dataset)
    }

    /// Fresh cache, then the backend, then a stale cache, then the bundled files.
    pub async fn load_dataset(&self) -> Sourced<RemoteDataset> {
        if let Some(dataset) = self.cached(true) {
            log::debug!("serving dataset from cache");
            return Sourced::new(DataOrigin::Cache, dataset);
        }

        if let Some(backend) = &self.backend {
            match backend.fetch_all().await {
                Ok(dataset) => {
                    self.store_cache(&dataset);
                    return Sourced::new(DataOrigin::Live, dataset);
                }
                Err(e) => log::warn!("{} backend fetch failed: {e}", backend.name()),
            }
        }

        if let Some(dataset) = self.cached(false) {
            log::info!("serving stale cached dataset");
            return Sourced::new(DataOrigin::Cache, dataset);
        }

        log::info!("falling back to static data in {}", self.static_data.dir().display());
        Sourced::new(DataOrigin::Static, self.static_data.load())
    }

    /// Single-period read: fresh cache, then `GET /{kind}/{period}`, then a stale
    /// cache, then the bundled files.
    pub async fn load_snapshot(
        &self,
        kind: SnapshotKind,
        period: &str,
    ) -> Sourced<Option<PeriodSnapshot>> {
        let find = |dataset: RemoteDataset| {
            let list = match kind {
                SnapshotKind::Weekly => dataset.weekly,
                SnapshotKind::Monthly => dataset.monthly,
            };
            list.into_iter().find(|s| s.period == period)
        };

        if let Some(hit) = self.cached(true).and_then(find) {
            return Sourced::new(DataOrigin::Cache, Some(hit));
        }

        if let Some(backend) = &self.backend {
            let fetched = match kind {
                SnapshotKind::Weekly => backend.fetch_weekly(period).await,
                SnapshotKind::Monthly => backend.fetch_monthly(period).await,
            };
            match fetched {
                Ok(snapshot) => return Sourced::new(DataOrigin::Live, snapshot),
                Err(e) => log::warn!("{} backend fetch of {period} failed: {e}", backend.name()),
            }
        }

        if let Some(dataset) = self.cached(false) {
            return Sourced::new(DataOrigin::Cache, find(dataset));
        }
        Sourced::new(DataOrigin::Static, find(self.static_data.load()))
    }

    pub async fn load_members(&self) -> Sourced<Vec<Member>> {
        if let Some(dataset) = self.cached(true).filter(|d| !d.members.is_empty()) {
            return Sourced::new(DataOrigin::Cache, dataset.members);
        }

        if let Some(backend) = &self.backend {
            match backend.fetch_members().await {
                Ok(members) => return Sourced::new(DataOrigin::Live, members),
                Err(e) => log::warn!("{} backend member fetch failed: {e}", backend.name()),
            }
        }

        if let Some(dataset) = self.cached(false) {
            return Sourced::new(DataOrigin::Cache, dataset.members);
        }
        Sourced::new(DataOrigin::Static, self.static_data.load().members)
    }

    pub async fn push(&self, write: &OutboundWrite) -> Result<()> {
        let backend = self.backend.as_ref().ok_or(Error::NotConfigured)?;
        backend.push(write).await?;
        self.invalidate_cache();
        Ok(())
    }

    pub fn invalidate_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    fn cached(&self, fresh_only: bool) -> Option<RemoteDataset> {
        if !self.policy.enabled {
            return None;
        }
        let cache = self.cache.lock().ok()?;
        let entry = cache.as_ref()?;
        if fresh_only && entry.fetched_at.elapsed() > self.policy.ttl {
            return None;
        }
        Some(entry.dataset.clone())
    }

    fn store_cache(&self, dataset: &RemoteDataset) {
        if !self.policy.enabled {
            return;
        }
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(CachedDataset {
                fetched_at: Instant::now(),
                dataset: dataset.clone(),
            });
        }
    }
}
