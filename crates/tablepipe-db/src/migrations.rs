//! Database migrations and schema management.
//!
//! Only the run history lives under migrations. The data table is recreated
//! from each raw file and never migrated.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use tracing::info;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Name of the run history table. Data tables may not use it.
pub const RUNS_TABLE: &str = "pipeline_runs";

/// Create the run history schema, or check that an existing one is usable.
pub fn initialize_schema(conn: &Connection) -> DbResult<()> {
    match get_schema_version(conn)? {
        0 => {
            info!("Creating run history schema");
            create_initial_schema(conn)?;
            set_schema_version(conn, SCHEMA_VERSION)
        }
        SCHEMA_VERSION => Ok(()),
        newer => Err(DbError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            newer, SCHEMA_VERSION
        ))),
    }
}

fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> DbResult<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

fn create_initial_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- One row per workflow attempt
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            id TEXT PRIMARY KEY,
            workflow TEXT NOT NULL,
            attempt INTEGER NOT NULL DEFAULT 1,
            state TEXT NOT NULL DEFAULT 'pending',
            failed_stage TEXT,
            error TEXT,
            error_kind TEXT,
            ingested_rows INTEGER,
            extracted_rows INTEGER,
            cleaned_rows INTEGER,
            published_rows INTEGER,
            started_at TEXT NOT NULL,
            finished_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_runs_state ON pipeline_runs(state);
        CREATE INDEX IF NOT EXISTS idx_runs_started ON pipeline_runs(started_at);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [RUNS_TABLE],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        set_schema_version(&conn, SCHEMA_VERSION + 1).unwrap();

        assert!(matches!(
            initialize_schema(&conn),
            Err(DbError::Migration(_))
        ));
    }
}
