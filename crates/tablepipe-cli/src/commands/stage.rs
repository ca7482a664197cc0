//! Run a single stage.

use super::{parse_stage, Workspace};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tablepipe_core::Stage;
use tablepipe_pipeline::StageOutcome;
use tablepipe_search::{DocumentIndex, MemoryIndex};
use tokio::runtime::Runtime;

pub fn run(config_override: Option<&Path>, name: &str, dry_run: bool) -> Result<()> {
    let workspace = Workspace::load(config_override)?;
    let stage = parse_stage(name)?;

    if dry_run && stage != Stage::Publish {
        anyhow::bail!("--dry-run only applies to the publish stage");
    }

    let index: Arc<dyn DocumentIndex> = if dry_run {
        Arc::new(MemoryIndex::new())
    } else {
        Arc::new(workspace.search_client()?)
    };
    let pipeline = workspace.pipeline(index)?;

    let rt = Runtime::new().context("Failed to create async runtime")?;
    let outcome = rt
        .block_on(pipeline.run_stage(stage))
        .with_context(|| format!("Stage {} ({}) failed", stage, stage.task_id()))?;

    match outcome {
        StageOutcome::Ingested(rows) => println!(
            "{} {} rows into table {}",
            "Ingested:".green().bold(),
            rows,
            pipeline.settings().table
        ),
        StageOutcome::Extracted(rows) => println!(
            "{} {} rows to {}",
            "Extracted:".green().bold(),
            rows,
            pipeline.paths().extracted_file.display()
        ),
        StageOutcome::Cleaned(report) => {
            println!(
                "{} {} -> {} rows to {}",
                "Cleaned:".green().bold(),
                report.input_rows,
                report.output_rows,
                pipeline.paths().clean_file.display()
            );
            println!("  Dropped (missing): {}", report.missing_dropped);
            println!("  Dropped (duplicate): {}", report.duplicates_dropped);
            println!("  Columns: {}", report.columns.join(", ").dimmed());
        }
        StageOutcome::Published(report) => {
            let label = if dry_run { "Would publish:" } else { "Published:" };
            println!(
                "{} {} documents to {} ({} created, {} updated)",
                label.green().bold(),
                report.indexed,
                pipeline.settings().publish.index,
                report.created,
                report.updated
            );
            if report.pruned > 0 {
                println!("  Pruned stale documents: {}", report.pruned);
            }
            for (id, error) in report.failed.iter().take(5) {
                println!("  {} document {}: {}", "✗".red(), id, error.dimmed());
            }
            if report.failed.len() > 5 {
                println!("  ...and {} more failures", report.failed.len() - 5);
            }
        }
    }

    Ok(())
}
