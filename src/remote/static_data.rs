use crate::models::dataset::RemoteDataset;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

pub const WEEKLY_FILE: &str = "weekly-data.json";
pub const MONTHLY_FILE: &str = "monthly-data.json";
pub const MEMBERS_FILE: &str = "members-data.json";

/// Bundled JSON files used when neither the backend nor the cache can answer.
#[derive(Debug, Clone)]
pub struct StaticData {
    dir: PathBuf,
}

impl StaticData {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self) -> RemoteDataset {
        RemoteDataset {
            weekly: read_list(&self.dir.join(WEEKLY_FILE)),
            monthly: read_list(&self.dir.join(MONTHLY_FILE)),
            members: read_list(&self.dir.join(MEMBERS_FILE)),
        }
    }
}

fn read_list<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("static data {} unavailable: {e}", path.display());
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("static data {} is malformed: {e}", path.display());
            Vec::new()
        }
    }
}
