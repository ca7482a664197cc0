//! List recent runs.

use super::{short_id, Workspace};
use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tablepipe_core::{PipelineRun, RunState, Stage};

fn count(value: Option<i64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
}

fn format_run(run: &PipelineRun) -> String {
    let state = match run.state {
        RunState::Succeeded => format!("{:<10}", run.state.as_str()).green(),
        RunState::Failed => format!("{:<10}", run.state.as_str()).red(),
        _ => format!("{:<10}", run.state.as_str()).yellow(),
    };

    let counts: Vec<String> = Stage::ALL
        .iter()
        .map(|stage| format!("{:>5}", count(run.counts.get(*stage))))
        .collect();

    format!(
        "{} {} #{} {} {}",
        short_id(&run.id),
        run.started_at.format("%Y-%m-%d %H:%M"),
        run.attempt,
        state,
        counts.join(" ")
    )
}

pub fn run(config_override: Option<&Path>, limit: i64) -> Result<()> {
    let workspace = Workspace::load(config_override)?;
    let db = workspace.database()?;

    let runs = db.list_runs(limit)?;
    if runs.is_empty() {
        println!("No runs yet. Start one with {}", "tablepipe run".cyan());
        return Ok(());
    }

    println!("{}", "Recent Runs".cyan().bold());
    println!("{}", "─".repeat(72));
    println!(
        "{}",
        format!(
            "{:<8} {:<16} {:<2} {:<10} {:>5} {:>5} {:>5} {:>5}",
            "run", "started", "#", "state", "ingst", "extr", "clean", "publ"
        )
        .dimmed()
    );

    for run in &runs {
        println!("{}", format_run(run));
        if let (Some(stage), Some(error)) = (run.failed_stage, &run.error) {
            println!(
                "         {} {}: {}",
                "✗".red(),
                stage,
                error.dimmed()
            );
        }
    }

    Ok(())
}
