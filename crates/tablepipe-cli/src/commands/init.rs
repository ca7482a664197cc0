//! Initialize tablepipe.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tablepipe_config::Config;
use tablepipe_db::Database;

pub fn run(config_override: Option<&Path>) -> Result<()> {
    let paths = get_paths()?.with_config_file(config_override);
    let config_path = paths.config_file.clone();

    if config_path.exists() {
        println!(
            "{} Tablepipe is already initialized.",
            "Note:".yellow().bold()
        );
        println!("  Config: {}", config_path.display());
        return Ok(());
    }

    println!("{}", "Initializing tablepipe...".cyan().bold());

    paths
        .ensure_dirs()
        .context("Failed to create directories")?;

    Config::create_default_file(&config_path).context("Failed to create config file")?;
    println!(
        "  {} Created config: {}",
        "✓".green(),
        config_path.display()
    );

    let config = Config::load_from(&config_path).context("Failed to load config")?;
    let artifacts = config.artifact_paths(&paths);
    std::fs::create_dir_all(&artifacts.data_dir).context("Failed to create data directory")?;
    println!(
        "  {} Data directory: {}",
        "✓".green(),
        artifacts.data_dir.display()
    );

    let _db = Database::open(&artifacts.database_file).context("Failed to initialize database")?;
    println!(
        "  {} Created database: {}",
        "✓".green(),
        artifacts.database_file.display()
    );

    println!();
    println!("{}", "Tablepipe initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Place your data at: {}",
        artifacts.raw_file.display().to_string().cyan()
    );
    println!(
        "  2. Point at your search endpoint: {}",
        "tablepipe config set search.endpoint http://localhost:9200".cyan()
    );
    println!("  3. Run the workflow: {}", "tablepipe run".cyan());

    Ok(())
}
