//! Load the raw CSV into the relational table.

use super::read_artifact;
use crate::error::PipelineResult;
use std::path::Path;
use tablepipe_db::Database;
use tracing::info;

/// Replace `table` with the full contents of the CSV at `raw`.
///
/// Returns the number of rows written.
pub fn ingest(raw: &Path, db: &Database, table: &str) -> PipelineResult<usize> {
    info!("Ingesting {} into table {}", raw.display(), table);

    let data = read_artifact(raw)?;
    info!("Read {} rows, {} columns", data.len(), data.width());

    let written = db.replace_table(table, &data)?;
    info!("Ingest complete: {} rows in {}", written, table);
    Ok(written)
}
