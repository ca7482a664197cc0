//! Pooled SQLite handle.

use crate::error::{DbError, DbResult};
use crate::migrations;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub type ConnectionPool = Pool<SqliteConnectionManager>;
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// How long a connection waits on a lock held by another run.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Shared handle to the pipeline database. Cloning shares the pool.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open (or create) the database file at `path` and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DbError::Other(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
            _ => {}
        }

        info!("Opening database at: {}", path.display());

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = {};",
                BUSY_TIMEOUT_MS
            ))
        });

        let pool = Pool::builder()
            .max_size(4)
            .connection_timeout(Duration::from_secs(10))
            .build(manager)?;

        Self::from_pool(pool)
    }

    /// Private in-memory database. The pool holds a single connection so
    /// every caller sees the same data.
    pub fn open_in_memory() -> DbResult<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())?;

        Self::from_pool(pool)
    }

    fn from_pool(pool: ConnectionPool) -> DbResult<Self> {
        migrations::initialize_schema(&*pool.get()?)?;
        debug!("Database ready ({} pooled connections)", pool.max_size());
        Ok(Self { pool })
    }

    pub fn conn(&self) -> DbResult<PooledConn> {
        Ok(self.pool.get()?)
    }

    /// `PRAGMA integrity_check` reports "ok".
    pub fn integrity_check(&self) -> DbResult<bool> {
        let result: String = self
            .conn()?
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_has_schema() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.integrity_check().unwrap());
        assert_eq!(db.list_runs(5).unwrap().len(), 0);
    }

    #[test]
    fn test_open_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pipe.db");

        let db = Database::open(&path).unwrap();
        assert!(db.integrity_check().unwrap());
        assert!(path.exists());
    }

    #[test]
    fn test_reopen_keeps_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.db");

        let run = tablepipe_core::PipelineRun::new("daily", 1);
        Database::open(&path).unwrap().insert_run(&run).unwrap();

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.get_run(&run.id).unwrap().workflow, "daily");
    }
}
