//! Index every cleaned row as a search document.

use super::read_artifact;
use crate::error::PipelineResult;
use std::path::Path;
use tablepipe_config::Config;
use tablepipe_core::Table;
use tablepipe_search::DocumentIndex;
use tracing::{debug, info, warn};

/// Where and how documents are published.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub index: String,
    /// Field compared when pruning stale documents.
    pub id_field: String,
    pub prune_stale: bool,
}

impl PublishSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            index: config.search.index.clone(),
            id_field: config.clean.id_column.clone(),
            prune_stale: config.search.prune_stale,
        }
    }
}

/// Outcome of a publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Rows read from the cleaned file.
    pub documents: usize,
    pub indexed: usize,
    pub created: usize,
    pub updated: usize,
    /// Document ids that failed, with the error text.
    pub failed: Vec<(u64, String)>,
    pub pruned: u64,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.indexed == self.documents
    }
}

/// Whether `id_field` holds 1..N in row order, so pruning by that field
/// only reaches documents beyond the current run.
fn ids_match_positions(table: &Table, id_field: &str) -> bool {
    let Some(column) = table.column_index(id_field) else {
        return false;
    };
    table
        .column(column)
        .enumerate()
        .all(|(position, value)| value.as_i64() == Some(position as i64 + 1))
}

/// Publish every row of the CSV at `input` to `index`.
///
/// The endpoint is probed before anything is read; an unreachable endpoint
/// fails the stage. A document that fails to index is logged and counted,
/// and the remaining rows are still sent.
pub async fn publish(
    input: &Path,
    index: &dyn DocumentIndex,
    settings: &PublishSettings,
) -> PipelineResult<PublishReport> {
    info!("Publishing {} to index {}", input.display(), settings.index);
    index.ping().await?;

    let table = read_artifact(input)?;
    let mut report = PublishReport {
        documents: table.len(),
        ..PublishReport::default()
    };

    for position in 0..table.len() {
        let Some(document) = table.row_to_document(position) else {
            continue;
        };
        let id = position as u64 + 1;

        match index.index_document(&settings.index, id, &document).await {
            Ok(response) => {
                debug!("Indexed document {}: {}", id, response.result);
                report.indexed += 1;
                if response.was_created() {
                    report.created += 1;
                } else {
                    report.updated += 1;
                }
            }
            Err(e) => {
                warn!("Failed to index document {}: {}", id, e);
                report.failed.push((id, e.to_string()));
            }
        }
    }

    if settings.prune_stale && !ids_match_positions(&table, &settings.id_field) {
        warn!(
            "Not pruning {}: column '{}' does not number rows 1..{}",
            settings.index,
            settings.id_field,
            table.len()
        );
    } else if settings.prune_stale {
        match index
            .delete_above(&settings.index, &settings.id_field, table.len() as i64)
            .await
        {
            Ok(deleted) => report.pruned = deleted,
            Err(e) => warn!("Could not prune stale documents: {}", e),
        }
    }

    info!(
        "Publish complete: {} indexed ({} created, {} updated), {} failed",
        report.indexed,
        report.created,
        report.updated,
        report.failed.len()
    );
    Ok(report)
}
