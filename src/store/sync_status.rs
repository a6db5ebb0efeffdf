use super::{now_millis, LocalRecordStore};
use crate::error::{Error, Result};
use crate::models::sync_status::{RecordType, SyncState, SyncStatus, SyncSummary};
use rusqlite::{params, Connection, OptionalExtension, Row};

const STATUS_COLUMNS: &str =
    "id, record_type, data_id, synced, revision, attempt_count, last_error, created_at, synced_at, dead_lettered_at";

/// Marks a record as needing a push. Re-queueing an existing entry supersedes it:
/// back to pending, attempts reset, revision bumped, queue position kept.
pub(super) fn enqueue(conn: &Connection, record_type: RecordType, data_id: &str) -> Result<()> {
    conn.execute(
        "
        INSERT INTO sync_status (id, record_type, data_id, synced, created_at, revision, attempt_count)
        VALUES (?1, ?2, ?3, 0, ?4, 1, 0)
        ON CONFLICT(id) DO UPDATE SET
            synced = 0,
            synced_at = NULL,
            revision = sync_status.revision + 1,
            attempt_count = 0,
            last_error = NULL,
            dead_lettered_at = NULL,
            created_at = excluded.created_at
        ",
        params![
            record_type.status_id(data_id),
            record_type.as_str(),
            data_id,
            now_millis()
        ],
    )?;
    Ok(())
}

pub(super) fn drop_pending(conn: &Connection, record_type: RecordType, data_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM sync_status WHERE id = ?1 AND synced = 0 AND dead_lettered_at IS NULL",
        params![record_type.status_id(data_id)],
    )?;
    Ok(())
}

fn load_status(conn: &Connection, id: &str) -> Result<Option<SyncStatus>> {
    let status = conn
        .query_row(
            &format!("SELECT {STATUS_COLUMNS} FROM sync_status WHERE id = ?1"),
            params![id],
            status_from_row,
        )
        .optional()?;
    Ok(status)
}

fn require_status(conn: &Connection, id: &str) -> Result<SyncStatus> {
    load_status(conn, id)?.ok_or_else(|| Error::not_found("sync status", id))
}

impl LocalRecordStore {
    /// Pending entries in insertion order. Dead-lettered entries are excluded.
    pub fn list_unsynced(&self) -> Result<Vec<SyncStatus>> {
        self.query_statuses("WHERE synced = 0 AND dead_lettered_at IS NULL")
    }

    pub fn list_dead_letters(&self) -> Result<Vec<SyncStatus>> {
        self.query_statuses("WHERE synced = 0 AND dead_lettered_at IS NOT NULL")
    }

    pub fn list_sync_statuses(&self) -> Result<Vec<SyncStatus>> {
        self.query_statuses("")
    }

    pub fn get_sync_status(&self, id: &str) -> Result<Option<SyncStatus>> {
        let conn = self.conn()?;
        load_status(&conn, id)
    }

    pub fn mark_synced(&self, id: &str) -> Result<SyncStatus> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        require_status(&tx, id)?;
        tx.execute(
            "UPDATE sync_status SET synced = 1, synced_at = ?2, dead_lettered_at = NULL WHERE id = ?1",
            params![id, now_millis()],
        )?;
        let status = require_status(&tx, id)?;
        tx.commit()?;

        log::debug!("sync status {id} marked synced");
        Ok(status)
    }

    /// Flips the entry only if no newer edit superseded `revision` while it was
    /// being pushed. Returns whether the entry is now synced.
    pub fn mark_synced_at_revision(&self, id: &str, revision: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE sync_status SET synced = 1, synced_at = ?3 WHERE id = ?1 AND revision = ?2 AND synced = 0",
            params![id, revision, now_millis()],
        )?;
        if changed == 0 {
            require_status(&conn, id)?;
            log::debug!("sync status {id} was superseded during push; left pending");
        }
        Ok(changed > 0)
    }

    /// Counts a failed push. Dead-letters the entry once `max_attempts` is reached.
    pub fn record_sync_failure(
        &self,
        id: &str,
        revision: i64,
        error: &str,
        max_attempts: u32,
    ) -> Result<SyncState> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE sync_status SET attempt_count = attempt_count + 1, last_error = ?3
             WHERE id = ?1 AND revision = ?2 AND synced = 0 AND dead_lettered_at IS NULL",
            params![id, revision, error],
        )?;
        tx.execute(
            "UPDATE sync_status SET dead_lettered_at = ?3
             WHERE id = ?1 AND revision = ?2 AND synced = 0 AND dead_lettered_at IS NULL AND attempt_count >= ?4",
            params![id, revision, now_millis(), max_attempts],
        )?;
        let status = require_status(&tx, id)?;
        tx.commit()?;

        if status.state() == SyncState::DeadLettered {
            log::warn!(
                "sync status {id} dead-lettered after {} attempts: {error}",
                status.attempt_count
            );
        }
        Ok(status.state())
    }

    /// Parks the entry immediately; used for failures retrying cannot fix.
    pub fn dead_letter(&self, id: &str, revision: i64, error: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE sync_status SET attempt_count = attempt_count + 1, last_error = ?3, dead_lettered_at = ?4
             WHERE id = ?1 AND revision = ?2 AND synced = 0 AND dead_lettered_at IS NULL",
            params![id, revision, error, now_millis()],
        )?;
        if changed == 0 {
            require_status(&conn, id)?;
        } else {
            log::warn!("sync status {id} dead-lettered: {error}");
        }
        Ok(changed > 0)
    }

    /// Puts a dead-lettered entry back into the queue with a fresh attempt budget.
    pub fn requeue(&self, id: &str) -> Result<SyncStatus> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        require_status(&tx, id)?;
        tx.execute(
            "UPDATE sync_status SET attempt_count = 0, last_error = NULL, dead_lettered_at = NULL
             WHERE id = ?1 AND synced = 0",
            params![id],
        )?;
        let status = require_status(&tx, id)?;
        tx.commit()?;
        Ok(status)
    }

    pub fn sync_summary(&self) -> Result<SyncSummary> {
        let conn = self.conn()?;
        let summary = conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN synced = 0 AND dead_lettered_at IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN synced = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN synced = 0 AND dead_lettered_at IS NOT NULL THEN 1 ELSE 0 END), 0)
             FROM sync_status",
            [],
            |row| {
                Ok(SyncSummary {
                    pending: row.get::<_, i64>(0)? as usize,
                    synced: row.get::<_, i64>(1)? as usize,
                    dead_lettered: row.get::<_, i64>(2)? as usize,
                })
            },
        )?;
        Ok(summary)
    }

    fn query_statuses(&self, filter: &str) -> Result<Vec<SyncStatus>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STATUS_COLUMNS} FROM sync_status {filter} ORDER BY seq ASC"
        ))?;
        let statuses = stmt
            .query_map([], status_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(statuses)
    }
}

fn status_from_row(row: &Row<'_>) -> rusqlite::Result<SyncStatus> {
    let raw_type: String = row.get(1)?;
    let record_type = RecordType::parse(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown record type: {raw_type}").into(),
        )
    })?;

    Ok(SyncStatus {
        id: row.get(0)?,
        record_type,
        data_id: row.get(2)?,
        synced: row.get::<_, i64>(3)? != 0,
        revision: row.get(4)?,
        attempt_count: row.get::<_, i64>(5)? as u32,
        last_error: row.get(6)?,
        created_at: row.get(7)?,
        synced_at: row.get(8)?,
        dead_lettered_at: row.get(9)?,
    })
}
