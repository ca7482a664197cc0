//! Show the workflow schedule.

use super::Workspace;
use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use std::path::Path;
use tablepipe_pipeline::WorkflowSchedule;

pub fn run(config_override: Option<&Path>) -> Result<()> {
    let workspace = Workspace::load(config_override)?;
    let schedule =
        WorkflowSchedule::from_config(&workspace.config.schedule).context("Invalid schedule")?;

    println!("{}", "Workflow Schedule".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("  Name: {}", schedule.name.green());
    println!("  Owner: {}", schedule.owner);
    println!("  Start date: {}", schedule.start);
    println!(
        "  Runs daily at: {} ({})",
        schedule.run_at.format("%H:%M"),
        schedule.cron_expression().dimmed()
    );
    println!(
        "  Next run: {}",
        schedule.next_run_after(Local::now().naive_local())
    );
    println!(
        "  Retries: {} after {} minutes, resuming {}",
        schedule.retries,
        schedule.retry_delay.as_secs() / 60,
        if schedule.retry_from_start {
            "from the first task"
        } else {
            "at the failed task"
        }
    );

    println!();
    println!("{}", "Tasks".white().bold());
    for (i, stage) in schedule.tasks.iter().enumerate() {
        let arrow = if i == 0 { " " } else { "→" };
        println!("  {} {} ({})", arrow.dimmed(), stage.task_id(), stage);
    }

    Ok(())
}
