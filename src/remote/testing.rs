//! In-process backend for unit tests.

use super::{OutboundWrite, RemoteBackend};
use crate::error::{Error, Result};
use crate::models::dataset::RemoteDataset;
use crate::models::member::Member;
use crate::models::snapshot::PeriodSnapshot;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct FakeBackend {
    dataset: Mutex<RemoteDataset>,
    pushed: Mutex<Vec<OutboundWrite>>,
    rejected: Mutex<HashSet<String>>,
    unreachable: AtomicBool,
    read_only: bool,
    fetch_calls: AtomicUsize,
    single_calls: AtomicUsize,
    push_delay: Option<Duration>,
}

impl FakeBackend {
    pub fn with_dataset(dataset: RemoteDataset) -> Self {
        Self {
            dataset: Mutex::new(dataset),
            ..Default::default()
        }
    }

    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            push_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Pushes whose `describe()` matches are answered with HTTP 422.
    pub fn reject(&self, description: &str) {
        self.rejected.lock().unwrap().insert(description.to_string());
    }

    pub fn pushed(&self) -> Vec<OutboundWrite> {
        self.pushed.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Calls to the per-period and member endpoints.
    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> Result<RemoteDataset> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self.dataset.lock().unwrap().clone())
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(Error::Network("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn supports_writes(&self) -> bool {
        !self.read_only
    }

    async fn ping(&self) -> Result<()> {
        self.check_reachable()
    }

    async fn fetch_all(&self) -> Result<RemoteDataset> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self.dataset.lock().unwrap().clone())
    }

    async fn fetch_weekly(&self, period: &str) -> Result<Option<PeriodSnapshot>> {
        Ok(self.snapshot()?.weekly.into_iter().find(|s| s.period == period))
    }

    async fn fetch_monthly(&self, period: &str) -> Result<Option<PeriodSnapshot>> {
        Ok(self.snapshot()?.monthly.into_iter().find(|s| s.period == period))
    }

    async fn fetch_members(&self) -> Result<Vec<Member>> {
        Ok(self.snapshot()?.members)
    }

    async fn push(&self, write: &OutboundWrite) -> Result<()> {
        if let Some(delay) = self.push_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_reachable()?;
        if self.rejected.lock().unwrap().contains(&write.describe()) {
            return Err(Error::Rejected {
                status: 422,
                body: "unprocessable".to_string(),
            });
        }
        self.pushed.lock().unwrap().push(write.clone());
        Ok(())
    }
}
