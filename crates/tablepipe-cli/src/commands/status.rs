//! Status command - show table, artifact, index and run status.

use super::{format_size, short_id, Workspace};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tablepipe_search::{DocumentIndex, SearchError};
use tokio::runtime::Runtime;

fn artifact_line(label: &str, path: &Path) {
    match std::fs::metadata(path) {
        Ok(meta) => println!(
            "  {} {}: {} ({})",
            "●".green(),
            label,
            path.display(),
            format_size(meta.len() as i64)
        ),
        Err(_) => println!(
            "  {} {}: {} {}",
            "○".yellow(),
            label,
            path.display(),
            "(missing)".dimmed()
        ),
    }
}

pub fn run(config_override: Option<&Path>) -> Result<()> {
    let workspace = Workspace::load(config_override)?;
    let db = workspace.database()?;
    let config = &workspace.config;
    let artifacts = &workspace.artifacts;

    println!("{}", "Tablepipe Status".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("  Config: {}", workspace.config_file.display());

    // Relational table
    let stats = db.get_stats(&config.database.table)?;
    println!();
    println!("{}", "Database".white().bold());
    println!("  File: {}", artifacts.database_file.display());
    println!("  Size: {}", format_size(stats.database_size_bytes));
    if !db.integrity_check()? {
        println!("  {} {}", "✗".red(), "integrity check failed".red());
    }
    match (stats.table_rows, stats.table_columns) {
        (Some(rows), Some(columns)) => println!(
            "  Table {}: {} rows, {} columns",
            config.database.table.green(),
            rows,
            columns
        ),
        _ => println!(
            "  Table {}: {}",
            config.database.table,
            "not loaded yet".yellow()
        ),
    }

    // Files
    println!();
    println!("{}", "Files".white().bold());
    artifact_line("raw", &artifacts.raw_file);
    artifact_line("extracted", &artifacts.extracted_file);
    artifact_line("clean", &artifacts.clean_file);

    // Search index
    println!();
    println!("{}", "Search Index".white().bold());
    println!("  Endpoint: {}", config.search.endpoint);
    let client = workspace.search_client()?;
    let rt = Runtime::new().context("Failed to create async runtime")?;
    match rt.block_on(client.count(&config.search.index)) {
        Ok(count) => println!(
            "  Index {}: {} documents",
            config.search.index.green(),
            count
        ),
        Err(SearchError::IndexNotFound { .. }) => println!(
            "  Index {}: {}",
            config.search.index,
            "does not exist yet".yellow()
        ),
        Err(e) if e.is_connection() => {
            println!("  {} {}", "✗".red(), "not reachable".red())
        }
        Err(e) => println!("  {} {}", "✗".red(), e),
    }

    // Run history
    let (succeeded, failed, unfinished) = db.run_counts()?;
    println!();
    println!("{}", "Runs".white().bold());
    println!("  {} Succeeded: {}", "●".green(), succeeded);
    if failed > 0 {
        println!("  {} Failed: {}", "✗".red(), failed);
    }
    if unfinished > 0 {
        println!("  {} Unfinished: {}", "◐".blue(), unfinished);
    }

    if let Some(last) = db.last_run()? {
        println!(
            "  Last: {} {} at {}",
            short_id(&last.id),
            last.state,
            last.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(error) = &last.error {
            println!("    {}", error.dimmed());
        }
    } else {
        println!();
        println!("No runs yet. Start one with {}", "tablepipe run".cyan());
    }

    Ok(())
}
