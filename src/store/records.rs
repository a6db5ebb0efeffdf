use super::{now_millis, now_rfc3339, sync_status, LocalRecordStore, WriteOrigin};
use crate::error::{Error, Result};
use crate::models::daily::DailyRecord;
use crate::models::dataset::RemoteDataset;
use crate::models::member::Member;
use crate::models::project::{Project, ProjectStatus};
use crate::models::snapshot::PeriodSnapshot;
use crate::models::sync_status::RecordType;
use crate::validation::{validate_daily, validate_project, validate_snapshot};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const DAILY_COLUMNS: &str =
    "id, date, member_id, approach, meeting, negotiation, proposal, contract, amount, notes, updated_at";

const PROJECT_COLUMNS: &str =
    "id, company_name, name, status, assigned_to, budget, description, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Weekly,
    Monthly,
}

impl SnapshotKind {
    fn table(&self) -> &'static str {
        match self {
            SnapshotKind::Weekly => "weekly_snapshots",
            SnapshotKind::Monthly => "monthly_snapshots",
        }
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            SnapshotKind::Weekly => RecordType::WeeklyData,
            SnapshotKind::Monthly => RecordType::MonthlyData,
        }
    }
}

impl LocalRecordStore {
    // ----- daily records -----

    pub fn put_daily(&self, mut record: DailyRecord, origin: WriteOrigin) -> Result<DailyRecord> {
        validate_daily(&record)?;
        if record.id.trim().is_empty() {
            record.id = DailyRecord::derived_id(record.date, &record.member_id);
        }
        if origin == WriteOrigin::Local || record.updated_at.is_none() {
            record.updated_at = Some(now_rfc3339());
        }

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        upsert_daily(&tx, &record)?;
        if origin == WriteOrigin::Local {
            sync_status::enqueue(&tx, RecordType::DailyData, &record.id)?;
        }
        tx.commit()?;

        log::debug!("saved daily record {} ({origin:?})", record.id);
        Ok(record)
    }

    pub fn get_daily(&self, id: &str) -> Result<Option<DailyRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {DAILY_COLUMNS} FROM daily_records WHERE id = ?1"),
                params![id],
                daily_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Inclusive on both ends. Order is unspecified; callers sort as needed.
    pub fn get_daily_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyRecord>> {
        if start > end {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DAILY_COLUMNS} FROM daily_records WHERE date BETWEEN ?1 AND ?2"
        ))?;
        let records = stmt
            .query_map(params![start, end], daily_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn get_daily_by_member(&self, member_id: &str) -> Result<Vec<DailyRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DAILY_COLUMNS} FROM daily_records WHERE member_id = ?1"
        ))?;
        let records = stmt
            .query_map(params![member_id], daily_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn list_daily(&self) -> Result<Vec<DailyRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DAILY_COLUMNS} FROM daily_records ORDER BY date DESC, member_id ASC"
        ))?;
        let records = stmt
            .query_map([], daily_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Removes the record and any still-pending push for it.
    pub fn delete_daily(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM daily_records WHERE id = ?1", params![id])?;
        sync_status::drop_pending(&tx, RecordType::DailyData, id)?;
        tx.commit()?;
        Ok(removed > 0)
    }

    // ----- projects -----

    pub fn put_project(&self, mut project: Project, origin: WriteOrigin) -> Result<Project> {
        validate_project(&project)?;
        let now = now_rfc3339();
        if origin == WriteOrigin::Local || project.updated_at.is_none() {
            project.updated_at = Some(now.clone());
        }

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        let id = match project.id {
            None => {
                tx.execute(
                    "INSERT INTO projects (company_name, name, status, assigned_to, budget, description, created_at, updated_at) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                    params![
                        &project.company_name,
                        &project.name,
                        project.status.as_str(),
                        &project.assigned_to,
                        project.budget,
                        &project.description,
                        project.created_at.as_deref().unwrap_or(&now),
                        project.updated_at.as_deref(),
                    ],
                )?;
                tx.last_insert_rowid()
            }
            Some(id) => {
                tx.execute(
                    "INSERT INTO projects (id, company_name, name, status, assigned_to, budget, description, created_at, updated_at) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
                     ON CONFLICT(id) DO UPDATE SET
                        company_name = excluded.company_name,
                        name = excluded.name,
                        status = excluded.status,
                        assigned_to = excluded.assigned_to,
                        budget = excluded.budget,
                        description = excluded.description,
                        created_at = COALESCE(projects.created_at, excluded.created_at),
                        updated_at = excluded.updated_at",
                    params![
                        id,
                        &project.company_name,
                        &project.name,
                        project.status.as_str(),
                        &project.assigned_to,
                        project.budget,
                        &project.description,
                        project.created_at.as_deref().unwrap_or(&now),
                        project.updated_at.as_deref(),
                    ],
                )?;
                id
            }
        };

        if origin == WriteOrigin::Local {
            sync_status::enqueue(&tx, RecordType::Project, &id.to_string())?;
        }
        let saved = load_project(&tx, id)?.ok_or_else(|| Error::not_found("project", id.to_string()))?;
        tx.commit()?;

        log::debug!("saved project {id} ({origin:?})");
        Ok(saved)
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.conn()?;
        load_project(&conn, id)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC"
        ))?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    pub fn delete_project(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        sync_status::drop_pending(&tx, RecordType::Project, &id.to_string())?;
        tx.commit()?;
        Ok(removed > 0)
    }

    // ----- weekly / monthly snapshots -----

    pub fn put_weekly(&self, snapshot: PeriodSnapshot, origin: WriteOrigin) -> Result<PeriodSnapshot> {
        self.put_snapshot(SnapshotKind::Weekly, snapshot, origin)
    }

    pub fn get_weekly(&self, period: &str) -> Result<Option<PeriodSnapshot>> {
        self.get_snapshot(SnapshotKind::Weekly, period)
    }

    pub fn list_weekly(&self) -> Result<Vec<PeriodSnapshot>> {
        self.list_snapshots(SnapshotKind::Weekly)
    }

    pub fn put_monthly(&self, snapshot: PeriodSnapshot, origin: WriteOrigin) -> Result<PeriodSnapshot> {
        self.put_snapshot(SnapshotKind::Monthly, snapshot, origin)
    }

    pub fn get_monthly(&self, period: &str) -> Result<Option<PeriodSnapshot>> {
        self.get_snapshot(SnapshotKind::Monthly, period)
    }

    pub fn list_monthly(&self) -> Result<Vec<PeriodSnapshot>> {
        self.list_snapshots(SnapshotKind::Monthly)
    }

    pub fn put_snapshot(
        &self,
        kind: SnapshotKind,
        snapshot: PeriodSnapshot,
        origin: WriteOrigin,
    ) -> Result<PeriodSnapshot> {
        validate_snapshot(&snapshot)?;
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        upsert_snapshot(&tx, kind, &snapshot)?;
        if origin == WriteOrigin::Local {
            sync_status::enqueue(&tx, kind.record_type(), &snapshot.period)?;
        }
        tx.commit()?;
        Ok(snapshot)
    }

    pub fn get_snapshot(&self, kind: SnapshotKind, period: &str) -> Result<Option<PeriodSnapshot>> {
        let conn = self.conn()?;
        let snapshot = conn
            .query_row(
                &format!("SELECT period, data_json FROM {} WHERE period = ?1", kind.table()),
                params![period],
                snapshot_from_row,
            )
            .optional()?;
        Ok(snapshot)
    }

    pub fn list_snapshots(&self, kind: SnapshotKind) -> Result<Vec<PeriodSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT period, data_json FROM {} ORDER BY period ASC",
            kind.table()
        ))?;
        let snapshots = stmt
            .query_map([], snapshot_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(snapshots)
    }

    #[cfg(test)]
    pub(crate) fn overwrite_snapshot_json(&self, kind: SnapshotKind, period: &str, raw: &str) -> Result<()> {
        self.conn()?.execute(
            &format!("UPDATE {} SET data_json = ?2 WHERE period = ?1", kind.table()),
            params![period, raw],
        )?;
        Ok(())
    }

    // ----- members -----

    pub fn put_members(&self, members: &[Member]) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        for member in members {
            upsert_member(&tx, member)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_member(&self, id: &str) -> Result<Option<Member>> {
        let conn = self.conn()?;
        let member = conn
            .query_row(
                "SELECT id, name FROM members WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Member {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(member)
    }

    pub fn list_members(&self) -> Result<Vec<Member>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM members ORDER BY name ASC")?;
        let members = stmt
            .query_map([], |row| {
                Ok(Member {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(members)
    }

    // ----- bulk -----

    /// Writes a fetched dataset in one transaction. Nothing is queued for push.
    pub fn save_remote_dataset(&self, dataset: &RemoteDataset) -> Result<()> {
        for snapshot in dataset.weekly.iter().chain(dataset.monthly.iter()) {
            validate_snapshot(snapshot)?;
        }

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        for snapshot in &dataset.weekly {
            upsert_snapshot(&tx, SnapshotKind::Weekly, snapshot)?;
        }
        for snapshot in &dataset.monthly {
            upsert_snapshot(&tx, SnapshotKind::Monthly, snapshot)?;
        }
        for member in &dataset.members {
            upsert_member(&tx, member)?;
        }
        tx.commit()?;

        log::info!(
            "stored remote dataset: {} weekly, {} monthly, {} members",
            dataset.weekly.len(),
            dataset.monthly.len(),
            dataset.members.len()
        );
        Ok(())
    }

    /// Snapshot of what the local store holds, shaped like a remote payload.
    pub fn local_dataset(&self) -> Result<RemoteDataset> {
        Ok(RemoteDataset {
            weekly: self.list_weekly()?,
            monthly: self.list_monthly()?,
            members: self.list_members()?,
        })
    }
}

fn upsert_daily(conn: &Connection, record: &DailyRecord) -> Result<()> {
    conn.execute(
        "
        INSERT INTO daily_records (
            id, date, member_id, approach, meeting, negotiation, proposal, contract, amount, notes, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(id) DO UPDATE SET
            date = excluded.date,
            member_id = excluded.member_id,
            approach = excluded.approach,
            meeting = excluded.meeting,
            negotiation = excluded.negotiation,
            proposal = excluded.proposal,
            contract = excluded.contract,
            amount = excluded.amount,
            notes = excluded.notes,
            updated_at = excluded.updated_at
        ",
        params![
            &record.id,
            record.date,
            &record.member_id,
            record.approach,
            record.meeting,
            record.negotiation,
            record.proposal,
            record.contract,
            record.amount,
            record.notes.as_deref(),
            record.updated_at.as_deref(),
        ],
    )?;
    Ok(())
}

fn upsert_snapshot(conn: &Connection, kind: SnapshotKind, snapshot: &PeriodSnapshot) -> Result<()> {
    let data_json = serde_json::to_string(snapshot)?;
    conn.execute(
        &format!(
            "INSERT INTO {} (period, data_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(period) DO UPDATE SET data_json = excluded.data_json, updated_at = excluded.updated_at",
            kind.table()
        ),
        params![&snapshot.period, data_json, now_millis()],
    )?;
    Ok(())
}

fn upsert_member(conn: &Connection, member: &Member) -> Result<()> {
    conn.execute(
        "INSERT INTO members (id, name) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![&member.id, &member.name],
    )?;
    Ok(())
}

fn load_project(conn: &Connection, id: i64) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            params![id],
            project_from_row,
        )
        .optional()?;
    Ok(project)
}

fn daily_from_row(row: &Row<'_>) -> rusqlite::Result<DailyRecord> {
    Ok(DailyRecord {
        id: row.get(0)?,
        date: row.get(1)?,
        member_id: row.get(2)?,
        approach: row.get(3)?,
        meeting: row.get(4)?,
        negotiation: row.get(5)?,
        proposal: row.get(6)?,
        contract: row.get(7)?,
        amount: row.get(8)?,
        notes: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let raw_status: String = row.get(3)?;
    let status = ProjectStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown project status: {raw_status}").into(),
        )
    })?;

    Ok(Project {
        id: Some(row.get(0)?),
        company_name: row.get(1)?,
        name: row.get(2)?,
        status,
        assigned_to: row.get(4)?,
        budget: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<PeriodSnapshot> {
    let period: String = row.get(0)?;
    let data_json: String = row.get(1)?;
    serde_json::from_str::<PeriodSnapshot>(&data_json).map_err(|e| {
        log::warn!("snapshot {period} has malformed data: {e}");
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snapshot::MetricValue;

    fn store() -> LocalRecordStore {
        LocalRecordStore::open_in_memory().expect("in-memory store")
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn malformed_snapshot_json_is_an_error() {
        let store = store();
        store.put_weekly(PeriodSnapshot::new("2025-W11"), WriteOrigin::Remote).unwrap();
        store
            .overwrite_snapshot_json(SnapshotKind::Weekly, "2025-W11", "{not json")
            .unwrap();

        let err = store.get_weekly("2025-W11").expect_err("corrupt row");
        assert!(matches!(
            err,
            Error::Storage(rusqlite::Error::FromSqlConversionFailure(1, _, _))
        ));
        assert!(err.is_permanent());
        assert!(store.list_weekly().is_err());

        store.put_weekly(PeriodSnapshot::new("2025-W11"), WriteOrigin::Remote).unwrap();
        assert!(store.get_weekly("2025-W11").unwrap().is_some());
    }

    fn daily(day: &str, member: &str) -> DailyRecord {
        DailyRecord {
            id: String::new(),
            date: date(day),
            member_id: member.to_string(),
            approach: 10,
            meeting: 5,
            negotiation: 3,
            proposal: 2,
            contract: 1,
            amount: 1_000_000.0,
            notes: Some("follow up".to_string()),
            updated_at: None,
        }
    }

    fn project(company: &str) -> Project {
        Project {
            id: None,
            company_name: company.to_string(),
            name: "Annual license".to_string(),
            status: ProjectStatus::Proposal,
            assigned_to: "m1".to_string(),
            budget: 2_500_000.0,
            description: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn put_daily_derives_id_and_queues_one_pending_entry() {
        let store = store();
        let saved = store
            .put_daily(daily("2025-03-20", "m1"), WriteOrigin::Local)
            .expect("put daily");
        assert_eq!(saved.id, "2025-03-20_m1");

        let pending = store.list_unsynced().expect("list unsynced");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].data_id, "2025-03-20_m1");
        assert_eq!(pending[0].record_type, RecordType::DailyData);
        assert!(!pending[0].synced);

        let loaded = store.get_daily(&saved.id).expect("get").expect("exists");
        assert_eq!(loaded.approach, 10);
        assert_eq!(loaded.notes.as_deref(), Some("follow up"));
    }

    #[test]
    fn invalid_funnel_is_rejected_before_any_write() {
        let store = store();
        let mut record = daily("2025-03-20", "m1");
        record.meeting = 11;

        let err = store.put_daily(record, WriteOrigin::Local).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.list_daily().expect("list").is_empty());
        assert!(store.list_unsynced().expect("unsynced").is_empty());
    }

    #[test]
    fn second_record_for_same_date_and_member_violates_uniqueness() {
        let store = store();
        store
            .put_daily(daily("2025-03-20", "m1"), WriteOrigin::Local)
            .expect("first put");

        let mut duplicate = daily("2025-03-20", "m1");
        duplicate.id = "manual-id".to_string();
        let err = store.put_daily(duplicate, WriteOrigin::Local).unwrap_err();
        assert!(err.is_constraint_violation(), "unexpected error: {err}");
        assert_eq!(store.list_unsynced().expect("unsynced").len(), 1);
    }

    #[test]
    fn date_range_is_inclusive() {
        let store = store();
        for day in ["2025-02-28", "2025-03-01", "2025-03-15", "2025-03-31", "2025-04-01"] {
            store.put_daily(daily(day, "m1"), WriteOrigin::Remote).expect("put");
        }

        let mut dates: Vec<String> = store
            .get_daily_by_date_range(date("2025-03-01"), date("2025-03-31"))
            .expect("range")
            .into_iter()
            .map(|r| r.date.to_string())
            .collect();
        dates.sort();
        assert_eq!(dates, vec!["2025-03-01", "2025-03-15", "2025-03-31"]);

        assert!(store
            .get_daily_by_date_range(date("2025-03-31"), date("2025-03-01"))
            .expect("reversed range")
            .is_empty());
    }

    #[test]
    fn member_lookup_filters_records() {
        let store = store();
        store.put_daily(daily("2025-03-01", "m1"), WriteOrigin::Remote).expect("put");
        store.put_daily(daily("2025-03-01", "m2"), WriteOrigin::Remote).expect("put");
        store.put_daily(daily("2025-03-02", "m1"), WriteOrigin::Remote).expect("put");

        let records = store.get_daily_by_member("m1").expect("by member");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.member_id == "m1"));
        assert!(store.list_unsynced().expect("unsynced").is_empty());
    }

    #[test]
    fn delete_drops_pending_entry_but_keeps_synced_history() {
        let store = store();
        let first = store
            .put_daily(daily("2025-03-01", "m1"), WriteOrigin::Local)
            .expect("put");
        let second = store
            .put_daily(daily("2025-03-02", "m1"), WriteOrigin::Local)
            .expect("put");
        store.mark_synced("daily_2025-03-02_m1").expect("mark synced");

        assert!(store.delete_daily(&first.id).expect("delete first"));
        assert!(store.delete_daily(&second.id).expect("delete second"));
        assert!(!store.delete_daily(&second.id).expect("delete again"));

        assert!(store.get_sync_status("daily_2025-03-01_m1").expect("status").is_none());
        let history = store
            .get_sync_status("daily_2025-03-02_m1")
            .expect("status")
            .expect("history kept");
        assert!(history.synced);
    }

    #[test]
    fn project_gets_generated_id_and_keeps_created_at_on_update() {
        let store = store();
        let saved = store.put_project(project("Acme"), WriteOrigin::Local).expect("put");
        let id = saved.id.expect("generated id");
        let created_at = saved.created_at.clone().expect("created_at");

        let mut edited = saved.clone();
        edited.status = ProjectStatus::Contract;
        edited.created_at = None;
        let updated = store.put_project(edited, WriteOrigin::Local).expect("update");

        assert_eq!(updated.id, Some(id));
        assert_eq!(updated.status, ProjectStatus::Contract);
        assert_eq!(updated.created_at.as_deref(), Some(created_at.as_str()));

        let pending = store.list_unsynced().expect("unsynced");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, format!("project_{id}"));
        assert_eq!(pending[0].revision, 2);
    }

    #[test]
    fn snapshots_round_trip_extra_sections() {
        let store = store();
        let mut snapshot = PeriodSnapshot::new("2025-W12");
        snapshot.metrics.approach = MetricValue {
            value: 42.0,
            target: 40.0,
            change: 5.0,
        };
        snapshot
            .extra
            .insert("trend".to_string(), serde_json::json!({"periods": ["W11", "W12"]}));

        store.put_weekly(snapshot.clone(), WriteOrigin::Local).expect("put weekly");
        let loaded = store.get_weekly("2025-W12").expect("get").expect("exists");
        assert_eq!(loaded, snapshot);
        assert!(store.get_monthly("2025-W12").expect("monthly").is_none());
        assert_eq!(store.list_unsynced().expect("unsynced")[0].id, "weekly_2025-W12");
    }

    #[test]
    fn remote_dataset_is_stored_without_queueing() {
        let store = store();
        let dataset = RemoteDataset {
            weekly: vec![PeriodSnapshot::new("2025-W11"), PeriodSnapshot::new("2025-W12")],
            monthly: vec![PeriodSnapshot::new("2025-03")],
            members: vec![
                Member { id: "m1".to_string(), name: "Sato".to_string() },
                Member { id: "m2".to_string(), name: "Suzuki".to_string() },
            ],
        };

        store.save_remote_dataset(&dataset).expect("save dataset");
        assert_eq!(store.list_weekly().expect("weekly").len(), 2);
        assert_eq!(store.list_monthly().expect("monthly").len(), 1);
        assert_eq!(
            store.get_member("m2").expect("member").map(|m| m.name),
            Some("Suzuki".to_string())
        );
        assert!(store.list_unsynced().expect("unsynced").is_empty());
    }

    #[test]
    fn remote_dataset_with_conflicting_member_names_writes_nothing() {
        let store = store();
        let dataset = RemoteDataset {
            weekly: vec![PeriodSnapshot::new("2025-W12")],
            monthly: Vec::new(),
            members: vec![
                Member { id: "m1".to_string(), name: "Sato".to_string() },
                Member { id: "m2".to_string(), name: "Sato".to_string() },
            ],
        };

        assert!(store.save_remote_dataset(&dataset).is_err());
        assert!(store.list_weekly().expect("weekly").is_empty());
        assert!(store.list_members().expect("members").is_empty());
    }
}
