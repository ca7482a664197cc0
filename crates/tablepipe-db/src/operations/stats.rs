//! Database statistics operations.

use crate::database::Database;
use crate::error::DbResult;

/// Size and contents summary for the status command.
#[derive(Debug, Clone, Default)]
pub struct TableStats {
    /// Rows in the data table, `None` when it does not exist yet.
    pub table_rows: Option<i64>,
    pub table_columns: Option<i64>,
    pub total_runs: i64,
    pub database_size_bytes: i64,
}

impl Database {
    /// Get statistics about the data table and run history.
    pub fn get_stats(&self, table: &str) -> DbResult<TableStats> {
        let (table_rows, table_columns) = if self.table_exists(table)? {
            let rows = self.table_row_count(table)?;
            let conn = self.conn()?;
            let columns: i64 = conn.query_row(
                "SELECT COUNT(*) FROM pragma_table_info(?1)",
                [table],
                |row| row.get(0),
            )?;
            (Some(rows), Some(columns))
        } else {
            (None, None)
        };

        let conn = self.conn()?;
        let total_runs: i64 =
            conn.query_row("SELECT COUNT(*) FROM pipeline_runs", [], |row| row.get(0))?;

        // Database size (page_count * page_size)
        let page_count: i64 = conn.pragma_query_value(None, "page_count", |row| row.get(0))?;
        let page_size: i64 = conn.pragma_query_value(None, "page_size", |row| row.get(0))?;

        Ok(TableStats {
            table_rows,
            table_columns,
            total_runs,
            database_size_bytes: page_count * page_size,
        })
    }
}
