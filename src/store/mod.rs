//! SQLite-backed local record store.
//!
//! Every user-originated write is paired with a `sync_status` row in the same
//! transaction; the synchronizer drains those rows towards the remote backend.

mod records;
pub mod schema;
mod sync_status;

use crate::error::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub use records::SnapshotKind;

/// Whether a write came from the user (and must be pushed) or from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    Local,
    Remote,
}

pub struct LocalRecordStore {
    conn: Mutex<Connection>,
}

impl LocalRecordStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::StorageUnavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(db_path)?;
        schema::initialize_schema(&conn)?;
        log::info!("opened record store at {}", db_path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StorageUnavailable("connection lock poisoned".to_string()))
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
