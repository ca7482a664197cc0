//! The four units of work, each usable on its own.

pub mod clean;
pub mod extract;
pub mod ingest;
pub mod publish;

use crate::error::{PipelineError, PipelineResult};
use std::path::Path;
use tablepipe_core::Table;

/// Read a CSV artifact, reporting a missing file as such.
pub(crate) fn read_artifact(path: &Path) -> PipelineResult<Table> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }
    Ok(Table::read_csv(path)?)
}
