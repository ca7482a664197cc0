//! Whole-table load and unload.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::migrations::RUNS_TABLE;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashSet;
use tablepipe_core::{Table, Value};
use tracing::{debug, info};

/// Quote an identifier for use in SQL text.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn check_table_name(name: &str) -> DbResult<()> {
    if name.trim().is_empty()
        || name.eq_ignore_ascii_case(RUNS_TABLE)
        || name.to_ascii_lowercase().starts_with("sqlite_")
    {
        return Err(DbError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// SQLite compares column names ignoring ASCII case.
fn check_column_names(headers: &[String]) -> DbResult<()> {
    let mut seen = HashSet::with_capacity(headers.len());
    for header in headers {
        if !seen.insert(header.to_ascii_lowercase()) {
            return Err(DbError::DuplicateColumn(header.clone()));
        }
    }
    Ok(())
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn exists(conn: &Connection, name: &str) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

impl Database {
    /// Replace `name` with the contents of `table`.
    ///
    /// Drop, create and insert run in one transaction, so the previous
    /// contents survive if any part of the write fails.
    pub fn replace_table(&self, name: &str, table: &Table) -> DbResult<usize> {
        check_table_name(name)?;
        if table.width() == 0 {
            return Err(DbError::Other(format!("cannot create table {} with no columns", name)));
        }
        check_column_names(table.headers())?;

        let quoted = quote_ident(name);
        let columns: Vec<String> = table
            .headers()
            .iter()
            .zip(table.column_kinds())
            .map(|(header, kind)| format!("{} {}", quote_ident(header), kind.sql_type()))
            .collect();
        let placeholders: Vec<String> = (1..=table.width()).map(|i| format!("?{}", i)).collect();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quoted))?;
        let create = format!("CREATE TABLE {} ({})", quoted, columns.join(", "));
        debug!("{}", create);
        tx.execute(&create, [])?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                quoted,
                placeholders.join(", ")
            ))?;
            for row in table.rows() {
                stmt.execute(params_from_iter(row.iter().map(to_sql)))?;
            }
        }

        tx.commit()?;
        info!("Wrote {} rows to table {}", table.len(), name);
        Ok(table.len())
    }

    /// Read every row of `name`, in insertion order.
    pub fn read_table(&self, name: &str) -> DbResult<Table> {
        let conn = self.conn()?;
        if !exists(&conn, name)? {
            return Err(DbError::TableNotFound(name.to_string()));
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY rowid",
            quote_ident(name)
        ))?;
        let headers: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = headers.len();

        let rows = stmt.query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(from_sql))
                .collect::<rusqlite::Result<Vec<Value>>>()
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;

        info!("Read {} rows from table {}", rows.len(), name);
        Table::from_rows(headers, rows).map_err(|e| DbError::Other(e.to_string()))
    }

    /// Check whether a table exists.
    pub fn table_exists(&self, name: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        exists(&conn, name)
    }

    /// Number of rows in `name`.
    pub fn table_row_count(&self, name: &str) -> DbResult<i64> {
        let conn = self.conn()?;
        if !exists(&conn, name)? {
            return Err(DbError::TableNotFound(name.to_string()));
        }
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
