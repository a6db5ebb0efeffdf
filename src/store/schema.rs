use rusqlite::{Connection, Result};

pub const DB_SCHEMA_VERSION: i64 = 3;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 3 {
        apply_migration_3(conn)?;
        version = 3;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        log::warn!("database schema version {version} is newer than {DB_SCHEMA_VERSION}; continuing");
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS daily_records (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            member_id TEXT NOT NULL,
            approach INTEGER NOT NULL DEFAULT 0,
            meeting INTEGER NOT NULL DEFAULT 0,
            negotiation INTEGER NOT NULL DEFAULT 0,
            proposal INTEGER NOT NULL DEFAULT 0,
            contract INTEGER NOT NULL DEFAULT 0,
            amount REAL NOT NULL DEFAULT 0,
            notes TEXT,
            updated_at TEXT
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_daily_records_date_member ON daily_records(date, member_id);

        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_name TEXT NOT NULL,
            name TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('initial', 'meeting', 'proposal', 'negotiation', 'contract', 'lost')) DEFAULT 'initial',
            assigned_to TEXT NOT NULL,
            budget REAL NOT NULL DEFAULT 0,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT,
            updated_at TEXT
        );

        CREATE TABLE IF NOT EXISTS weekly_snapshots (
            period TEXT PRIMARY KEY,
            data_json TEXT NOT NULL DEFAULT '{}',
            updated_at INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS monthly_snapshots (
            period TEXT PRIMARY KEY,
            data_json TEXT NOT NULL DEFAULT '{}',
            updated_at INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS members (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS sync_status (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            record_type TEXT NOT NULL CHECK(record_type IN ('dailyData', 'project', 'weeklyData', 'monthlyData')),
            data_id TEXT NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            synced_at INTEGER
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    add_column_if_missing(conn, "sync_status", "revision INTEGER NOT NULL DEFAULT 1")?;
    add_column_if_missing(conn, "sync_status", "attempt_count INTEGER NOT NULL DEFAULT 0")?;
    add_column_if_missing(conn, "sync_status", "last_error TEXT")?;
    add_column_if_missing(conn, "sync_status", "dead_lettered_at INTEGER")?;
    Ok(())
}

fn apply_migration_3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_daily_records_date ON daily_records(date);
        CREATE INDEX IF NOT EXISTS idx_daily_records_member ON daily_records(member_id);
        CREATE INDEX IF NOT EXISTS idx_projects_assigned_to ON projects(assigned_to);
        CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status);
        CREATE INDEX IF NOT EXISTS idx_sync_status_pending ON sync_status(synced, dead_lettered_at);
        ",
    )
}

fn add_column_if_missing(conn: &Connection, table: &str, column_def: &str) -> Result<()> {
    let column_name = column_def
        .split_whitespace()
        .next()
        .unwrap_or(column_def)
        .to_string();

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|res| res.ok())
        .any(|name| name == column_name);

    if !exists {
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column_def}"), [])?;
    }

    Ok(())
}
