pub mod commands;
pub mod error;
pub mod models;
pub mod remote;
pub mod store;
pub mod sync;
pub mod validation;

use commands::settings::{load_effective_settings, DataSource, EffectiveSettings};
use remote::http::HttpBackend;
use remote::sheets::SheetsBackend;
use remote::static_data::StaticData;
use remote::{Gateway, RemoteBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::LocalRecordStore;
use sync::{Connectivity, Synchronizer};

pub const DATA_DIR_ENV: &str = "SALESBOARD_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "salesboard-data";
pub const DB_FILE: &str = "state.db";

/// One instance of each component, shared by every command.
pub struct AppState {
    pub data_dir: PathBuf,
    pub settings: EffectiveSettings,
    pub store: Arc<LocalRecordStore>,
    pub gateway: Arc<Gateway>,
    pub synchronizer: Arc<Synchronizer>,
}

impl AppState {
    pub fn initialize(data_dir: &Path) -> Result<Self, String> {
        let settings = load_effective_settings(data_dir)?;
        let backend = build_backend(&settings);
        Self::with_backend(data_dir, settings, backend)
    }

    pub fn with_backend(
        data_dir: &Path,
        settings: EffectiveSettings,
        backend: Option<Arc<dyn RemoteBackend>>,
    ) -> Result<Self, String> {
        let store = Arc::new(
            LocalRecordStore::open(&data_dir.join(DB_FILE))
                .map_err(|e| format!("DB error: {e}"))?,
        );
        let gateway = Arc::new(Gateway::new(
            backend,
            StaticData::new(&settings.static_data_dir),
            settings.cache,
        ));
        let synchronizer = Arc::new(Synchronizer::new(
            store.clone(),
            gateway.clone(),
            Connectivity::new(true),
            settings.max_sync_attempts,
        ));
        log::info!(
            "data source: {} (data dir {})",
            gateway.backend_name(),
            data_dir.display()
        );

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            settings,
            store,
            gateway,
            synchronizer,
        })
    }

    pub fn connectivity(&self) -> &Connectivity {
        self.synchronizer.connectivity()
    }
}

/// A misconfigured backend degrades to local-only mode instead of failing startup.
fn build_backend(settings: &EffectiveSettings) -> Option<Arc<dyn RemoteBackend>> {
    let built: Result<Arc<dyn RemoteBackend>, error::Error> = match settings.data_source {
        DataSource::Local => return None,
        DataSource::Api => HttpBackend::new(
            &settings.api_base_url,
            settings.api_key.as_deref(),
            settings.auth_scheme,
            settings.request_timeout,
        )
        .map(|b| Arc::new(b) as Arc<dyn RemoteBackend>),
        DataSource::Spreadsheet => SheetsBackend::new(
            &settings.spreadsheet_id,
            &settings.spreadsheet_api_key,
            settings.sheets.clone(),
            settings.request_timeout,
        )
        .map(|b| Arc::new(b) as Arc<dyn RemoteBackend>),
    };

    match built {
        Ok(backend) => Some(backend),
        Err(e) => {
            log::warn!("remote backend disabled: {e}");
            None
        }
    }
}

pub fn data_dir_from_env() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub async fn run() -> Result<(), String> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let state = AppState::initialize(&data_dir_from_env())?;
    let sync = &state.synchronizer;

    let mut tasks = vec![
        sync.spawn_connectivity_watcher(),
        sync.spawn_periodic(state.settings.sync_interval),
    ];
    if state.gateway.is_configured() {
        tasks.push(sync.spawn_probe(state.settings.connectivity_probe));
        tasks.push(sync.spawn_refresh(state.settings.refresh_interval));

        if sync.probe().await {
            if let Err(e) = sync.fetch_and_save_data().await {
                log::warn!("initial fetch failed: {e}");
            }
        }
    }

    match sync.sync_data().await {
        Ok(outcome) => log::info!("startup sync: {outcome:?}"),
        Err(e) => log::error!("startup sync failed: {e}"),
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {e}"))?;
    log::info!("shutting down");
    for task in tasks {
        task.abort();
    }
    Ok(())
}
