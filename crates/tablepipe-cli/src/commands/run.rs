//! Run the whole workflow.

use super::{parse_stage, short_id, Workspace};
use crate::progress::SpinnerObserver;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tablepipe_core::{PipelineRun, RunState};
use tablepipe_pipeline::{RetryPolicy, WorkflowSchedule};
use tokio::runtime::Runtime;

pub fn run(config_override: Option<&Path>, no_retry: bool, from: &str) -> Result<()> {
    let workspace = Workspace::load(config_override)?;
    let from = parse_stage(from)?;

    let schedule =
        WorkflowSchedule::from_config(&workspace.config.schedule).context("Invalid schedule")?;
    let policy = if no_retry {
        RetryPolicy::none()
    } else {
        schedule.retry_policy()
    };

    let client = workspace.search_client()?;
    let pipeline = workspace.pipeline(Arc::new(client))?;

    println!(
        "{} {} from {}",
        "Running".cyan().bold(),
        schedule.name,
        from
    );

    let rt = Runtime::new().context("Failed to create async runtime")?;
    let observer = SpinnerObserver::new();
    let runs = rt.block_on(pipeline.run_with_retry(from, &policy, &observer));

    println!();
    for run in &runs {
        print_summary(run);
    }

    match runs.last() {
        Some(run) if run.state == RunState::Succeeded => Ok(()),
        Some(run) => anyhow::bail!(
            "Run failed at {} ({}): {}",
            run.failed_stage.map(|s| s.to_string()).unwrap_or_default(),
            run.error_kind.map(|k| k.to_string()).unwrap_or_default(),
            run.error.as_deref().unwrap_or("unknown error")
        ),
        None => anyhow::bail!("No run was started"),
    }
}

fn print_summary(run: &PipelineRun) {
    let state = match run.state {
        RunState::Succeeded => run.state.to_string().green(),
        RunState::Failed => run.state.to_string().red(),
        _ => run.state.to_string().yellow(),
    };
    let published = run
        .counts
        .published
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "  Attempt {} {} [{}] published: {}",
        run.attempt,
        state,
        short_id(&run.id),
        published
    );
}
