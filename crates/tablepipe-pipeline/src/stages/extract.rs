//! Read the relational table back out to CSV.

use crate::error::PipelineResult;
use std::path::Path;
use tablepipe_db::Database;
use tracing::info;

/// Write every row of `table` to `out`. Returns the number of rows written.
pub fn extract(db: &Database, table: &str, out: &Path) -> PipelineResult<usize> {
    info!("Extracting table {} to {}", table, out.display());

    let data = db.read_table(table)?;
    data.write_csv(out)?;

    info!("Extract complete: {} rows", data.len());
    Ok(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::ingest::ingest;
    use tablepipe_core::{ErrorKind, Table};
    use tempfile::TempDir;

    #[test]
    fn test_ingest_then_extract_preserves_rows_and_columns() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("data_raw.csv");
        let out = dir.path().join("data_new.csv");
        let db = Database::open_in_memory().unwrap();

        std::fs::write(&raw, "Name,Score,City\nann,1.5,Oslo\nbob,,Rome\ncy,3,\n").unwrap();
        ingest(&raw, &db, "t").unwrap();
        assert_eq!(extract(&db, "t", &out).unwrap(), 3);

        let before = Table::read_csv(&raw).unwrap();
        let after = Table::read_csv(&out).unwrap();
        assert_eq!(before.headers(), after.headers());
        assert_eq!(before.rows(), after.rows());
    }

    #[test]
    fn test_missing_table_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("data_new.csv");
        let db = Database::open_in_memory().unwrap();

        let err = extract(&db, "absent", &out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
        assert!(!out.exists());
    }
}
