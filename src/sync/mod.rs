//! Drains the local sync queue towards the remote backend and keeps the
//! online flag current.

pub mod connectivity;

use crate::error::{Error, Result};
use crate::models::dataset::RemoteDataset;
use crate::models::sync_status::{RecordType, SyncState, SyncStatus};
use crate::remote::{Gateway, OutboundWrite};
use crate::store::LocalRecordStore;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub use connectivity::{Connectivity, ListenerId};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRunning,
    Offline,
    NoRemote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub succeeded: usize,
    /// Pushed, but the record was edited again mid-push and stays pending.
    pub superseded: usize,
    pub failed: usize,
    pub dead_lettered: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.superseded + self.failed + self.dead_lettered
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Skipped { reason: SkipReason },
    Completed(SyncReport),
}

/// Clears the in-progress flag when a pass ends, even on early return.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Synchronizer {
    store: Arc<LocalRecordStore>,
    gateway: Arc<Gateway>,
    connectivity: Connectivity,
    in_progress: AtomicBool,
    max_attempts: u32,
}

impl Synchronizer {
    pub fn new(
        store: Arc<LocalRecordStore>,
        gateway: Arc<Gateway>,
        connectivity: Connectivity,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            gateway,
            connectivity,
            in_progress: AtomicBool::new(false),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<PassGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard(&self.in_progress))
    }

    /// One pass over the pending queue, in insertion order. A failing item is
    /// recorded on its entry and does not stop the pass.
    pub async fn sync_data(&self) -> Result<SyncOutcome> {
        let Some(_guard) = self.try_begin() else {
            log::debug!("sync pass already running; skipping");
            return Ok(SyncOutcome::Skipped { reason: SkipReason::AlreadyRunning });
        };
        if !self.connectivity.is_online() {
            return Ok(SyncOutcome::Skipped { reason: SkipReason::Offline });
        }
        if !self.gateway.can_push() {
            return Ok(SyncOutcome::Skipped { reason: SkipReason::NoRemote });
        }

        let pending = self.store.list_unsynced()?;
        let mut report = SyncReport::default();
        if pending.is_empty() {
            return Ok(SyncOutcome::Completed(report));
        }
        log::info!("syncing {} pending record(s) to {}", pending.len(), self.gateway.backend_name());

        for status in &pending {
            if let Err(e) = self.sync_one(status, &mut report).await {
                log::error!("failed to record sync result for {}: {e}", status.id);
                report.failed += 1;
                report.failures.push(SyncFailure {
                    id: status.id.clone(),
                    error: e.to_string(),
                });
            }
        }

        log::info!(
            "sync pass done: {} succeeded, {} superseded, {} failed, {} dead-lettered",
            report.succeeded,
            report.superseded,
            report.failed,
            report.dead_lettered
        );
        Ok(SyncOutcome::Completed(report))
    }

    /// Errors returned here are store failures while recording the outcome.
    async fn sync_one(&self, status: &SyncStatus, report: &mut SyncReport) -> Result<()> {
        let pushed = match self.outbound_for(status) {
            Ok(write) => self.gateway.push(&write).await,
            Err(e) => Err(e),
        };

        match pushed {
            Ok(()) => {
                if self.store.mark_synced_at_revision(&status.id, status.revision)? {
                    report.succeeded += 1;
                } else {
                    report.superseded += 1;
                }
            }
            Err(e) if e.is_permanent() => {
                log::warn!("{} cannot be synced: {e}", status.id);
                self.store.dead_letter(&status.id, status.revision, &e.to_string())?;
                report.dead_lettered += 1;
                report.failures.push(SyncFailure {
                    id: status.id.clone(),
                    error: e.to_string(),
                });
            }
            Err(e) => {
                log::warn!("push of {} failed: {e}", status.id);
                let state = self.store.record_sync_failure(
                    &status.id,
                    status.revision,
                    &e.to_string(),
                    self.max_attempts,
                )?;
                if state == SyncState::DeadLettered {
                    report.dead_lettered += 1;
                } else {
                    report.failed += 1;
                }
                report.failures.push(SyncFailure {
                    id: status.id.clone(),
                    error: e.to_string(),
                });
            }
        }
        Ok(())
    }

    fn outbound_for(&self, status: &SyncStatus) -> Result<OutboundWrite> {
        let data_id = status.data_id.as_str();
        let write = match status.record_type {
            RecordType::DailyData => self.store.get_daily(data_id)?.map(OutboundWrite::Daily),
            RecordType::Project => match data_id.parse::<i64>() {
                Ok(id) => self.store.get_project(id)?.map(OutboundWrite::Project),
                Err(_) => None,
            },
            RecordType::WeeklyData => self.store.get_weekly(data_id)?.map(OutboundWrite::Weekly),
            RecordType::MonthlyData => self.store.get_monthly(data_id)?.map(OutboundWrite::Monthly),
        };
        write.ok_or_else(|| Error::not_found(status.record_type.as_str(), data_id))
    }

    /// Pulls the full remote dataset into the store. On failure the store is untouched.
    pub async fn fetch_and_save_data(&self) -> Result<RemoteDataset> {
        if !self.connectivity.is_online() {
            return Err(Error::Offline);
        }
        let dataset = self.gateway.fetch_all().await?;
        self.store.save_remote_dataset(&dataset)?;
        log::info!(
            "saved remote dataset: {} weekly, {} monthly, {} members",
            dataset.weekly.len(),
            dataset.monthly.len(),
            dataset.members.len()
        );
        Ok(dataset)
    }

    /// Fire-and-forget pass after a local write.
    pub fn request_sync(self: &Arc<Self>) {
        if !self.connectivity.is_online() || !self.gateway.can_push() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::debug!("no async runtime; deferring sync to the next trigger");
            return;
        };
        let this = Arc::clone(self);
        handle.spawn(async move {
            if let Err(e) = this.sync_data().await {
                log::error!("background sync failed: {e}");
            }
        });
    }

    /// Runs a pass on every offline to online transition.
    pub fn spawn_connectivity_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut rx = self.connectivity.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online {
                    log::info!("back online; starting sync");
                    log_outcome("reconnect", this.sync_data().await);
                }
            }
        })
    }

    pub fn spawn_periodic(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                log_outcome("periodic", this.sync_data().await);
            }
        })
    }

    /// Keeps the local copy of remote data fresh while online.
    pub fn spawn_refresh(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !this.connectivity.is_online() || !this.gateway.is_configured() {
                    continue;
                }
                if let Err(e) = this.fetch_and_save_data().await {
                    log::warn!("scheduled refresh failed: {e}");
                }
            }
        })
    }

    /// Pings the backend on a timer and feeds the result into the online flag.
    pub fn spawn_probe(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                this.probe().await;
            }
        })
    }

    /// Returns the resulting online state.
    pub async fn probe(&self) -> bool {
        if !self.gateway.is_configured() {
            return self.connectivity.is_online();
        }
        let reachable = match self.gateway.ping().await {
            Ok(()) => true,
            Err(e) => {
                log::debug!("connectivity probe failed: {e}");
                false
            }
        };
        self.connectivity.set_online(reachable);
        reachable
    }
}

fn log_outcome(trigger: &str, outcome: Result<SyncOutcome>) {
    match outcome {
        Ok(SyncOutcome::Completed(report)) if report.attempted() > 0 => {
            log::info!("{trigger} sync: {} of {} pushed", report.succeeded, report.attempted());
        }
        Ok(SyncOutcome::Skipped { reason }) => log::debug!("{trigger} sync skipped: {reason:?}"),
        Ok(_) => {}
        Err(e) => log::error!("{trigger} sync failed: {e}"),
    }
}
