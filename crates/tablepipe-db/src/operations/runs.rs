//! Run history operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use rusqlite::params;
use tablepipe_core::{ErrorKind, PipelineRun, RunState, Stage, StageCounts};

const RUN_COLUMNS: &str = "id, workflow, attempt, state, failed_stage, error, error_kind,
     ingested_rows, extracted_rows, cleaned_rows, published_rows, started_at, finished_at";

impl Database {
    /// Record a new run.
    pub fn insert_run(&self, run: &PipelineRun) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO pipeline_runs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                RUN_COLUMNS
            ),
            params![
                run.id,
                run.workflow,
                run.attempt,
                run.state.as_str(),
                run.failed_stage.map(|s| s.as_str()),
                run.error,
                run.error_kind.map(|k| k.as_str()),
                run.counts.ingested,
                run.counts.extracted,
                run.counts.cleaned,
                run.counts.published,
                run.started_at.to_rfc3339(),
                run.finished_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Persist the current state of a run.
    pub fn update_run(&self, run: &PipelineRun) -> DbResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"
            UPDATE pipeline_runs
            SET state = ?2, failed_stage = ?3, error = ?4, error_kind = ?5,
                ingested_rows = ?6, extracted_rows = ?7, cleaned_rows = ?8, published_rows = ?9,
                finished_at = ?10
            WHERE id = ?1
            "#,
            params![
                run.id,
                run.state.as_str(),
                run.failed_stage.map(|s| s.as_str()),
                run.error,
                run.error_kind.map(|k| k.as_str()),
                run.counts.ingested,
                run.counts.extracted,
                run.counts.cleaned,
                run.counts.published,
                run.finished_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Run not found: {}", run.id)));
        }

        Ok(())
    }

    /// Get a run by ID.
    pub fn get_run(&self, id: &str) -> DbResult<PipelineRun> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM pipeline_runs WHERE id = ?1", RUN_COLUMNS),
            params![id],
            row_to_run,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::NotFound(format!("Run not found: {}", id))
            }
            _ => DbError::from(e),
        })
    }

    /// List the most recent runs, newest first.
    pub fn list_runs(&self, limit: i64) -> DbResult<Vec<PipelineRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pipeline_runs ORDER BY started_at DESC, rowid DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit], row_to_run)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The most recent run, if any.
    pub fn last_run(&self) -> DbResult<Option<PipelineRun>> {
        Ok(self.list_runs(1)?.into_iter().next())
    }

    /// Count runs as (succeeded, failed, unfinished).
    pub fn run_counts(&self) -> DbResult<(i64, i64, i64)> {
        let conn = self.conn()?;
        let (succeeded, failed, total): (i64, i64, i64) = conn.query_row(
            "SELECT
                COALESCE(SUM(state = 'succeeded'), 0),
                COALESCE(SUM(state = 'failed'), 0),
                COUNT(*)
             FROM pipeline_runs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok((succeeded, failed, total - succeeded - failed))
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<PipelineRun> {
    let state_str: String = row.get(3)?;
    let failed_stage: Option<String> = row.get(4)?;
    let error_kind: Option<String> = row.get(6)?;
    let started_at_str: String = row.get(11)?;
    let finished_at_str: Option<String> = row.get(12)?;

    Ok(PipelineRun {
        id: row.get(0)?,
        workflow: row.get(1)?,
        attempt: row.get(2)?,
        state: RunState::from_str(&state_str).unwrap_or(RunState::Pending),
        failed_stage: failed_stage.as_deref().and_then(Stage::from_str),
        error: row.get(5)?,
        error_kind: error_kind.as_deref().and_then(ErrorKind::from_str),
        counts: StageCounts {
            ingested: row.get(7)?,
            extracted: row.get(8)?,
            cleaned: row.get(9)?,
            published: row.get(10)?,
        },
        started_at: parse_time(&started_at_str).unwrap_or_else(Utc::now),
        finished_at: finished_at_str.as_deref().and_then(parse_time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_lifecycle() {
        let db = Database::open_in_memory().unwrap();

        let mut run = PipelineRun::new("tablepipe_daily", 1);
        db.insert_run(&run).unwrap();

        run.advance();
        run.counts.record(Stage::Ingest, 10);
        run.advance();
        run.fail(Stage::Extract, ErrorKind::DataFormat, "Table not found: table_m3");
        db.update_run(&run).unwrap();

        let stored = db.get_run(&run.id).unwrap();
        assert_eq!(stored.state, RunState::Failed);
        assert_eq!(stored.failed_stage, Some(Stage::Extract));
        assert_eq!(stored.error_kind, Some(ErrorKind::DataFormat));
        assert_eq!(stored.counts.ingested, Some(10));
        assert_eq!(stored.counts.extracted, None);
        assert!(stored.finished_at.is_some());
    }

    #[test]
    fn test_update_unknown_run() {
        let db = Database::open_in_memory().unwrap();
        let run = PipelineRun::new("tablepipe_daily", 1);
        assert!(matches!(db.update_run(&run), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_list_and_count_runs() {
        let db = Database::open_in_memory().unwrap();

        let mut ok = PipelineRun::new("w", 1);
        db.insert_run(&ok).unwrap();
        while ok.advance().is_some() {}
        db.update_run(&ok).unwrap();

        let mut bad = PipelineRun::new("w", 1);
        db.insert_run(&bad).unwrap();
        bad.fail(Stage::Ingest, ErrorKind::Io, "missing");
        db.update_run(&bad).unwrap();

        let open = PipelineRun::new("w", 2);
        db.insert_run(&open).unwrap();

        assert_eq!(db.run_counts().unwrap(), (1, 1, 1));
        assert_eq!(db.list_runs(10).unwrap().len(), 3);
        assert_eq!(db.list_runs(2).unwrap().len(), 2);
        assert!(db.last_run().unwrap().is_some());
    }
}
