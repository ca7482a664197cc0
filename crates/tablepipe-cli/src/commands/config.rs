//! Configuration commands.

use super::config_file;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tablepipe_config::Config;

pub fn show(config_override: Option<&Path>) -> Result<()> {
    let path = config_file(config_override)?;

    if !path.exists() {
        anyhow::bail!("Config file not found. Run 'tablepipe init' first.");
    }

    let contents = std::fs::read_to_string(&path).context("Failed to read config file")?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("{}", contents);

    Ok(())
}

pub fn path(config_override: Option<&Path>) -> Result<()> {
    println!("{}", config_file(config_override)?.display());
    Ok(())
}

/// Apply `key = value` to `config`. Keys are `section.field`.
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["paths", "data_dir"] => config.paths.data_dir = Some(value.to_string()),
        ["paths", "raw_file"] => config.paths.raw_file = value.to_string(),
        ["paths", "extracted_file"] => config.paths.extracted_file = value.to_string(),
        ["paths", "clean_file"] => config.paths.clean_file = value.to_string(),
        ["database", "path"] => config.database.path = Some(value.to_string()),
        ["database", "table"] => config.database.table = value.to_string(),
        ["search", "endpoint"] => config.search.endpoint = value.to_string(),
        ["search", "index"] => config.search.index = value.to_string(),
        ["search", "timeout_seconds"] => {
            config.search.timeout_seconds = value.parse().context("Invalid timeout value")?;
        }
        ["search", "prune_stale"] => {
            config.search.prune_stale = value.parse().context("Invalid boolean value")?;
        }
        ["clean", "id_column"] => config.clean.id_column = value.to_string(),
        ["clean", "junk_column"] => config.clean.junk_column = value.to_string(),
        ["clean", "strip_non_word"] => {
            config.clean.strip_non_word = value.parse().context("Invalid boolean value")?;
        }
        ["clean", "renumber_ids"] => {
            config.clean.renumber_ids = value.parse().context("Invalid boolean value")?;
        }
        ["schedule", "name"] => config.schedule.name = value.to_string(),
        ["schedule", "owner"] => config.schedule.owner = value.to_string(),
        ["schedule", "start_date"] => config.schedule.start_date = value.to_string(),
        ["schedule", "run_at"] => config.schedule.run_at = value.to_string(),
        ["schedule", "retries"] => {
            config.schedule.retries = value.parse().context("Invalid retries value")?;
        }
        ["schedule", "retry_delay_minutes"] => {
            config.schedule.retry_delay_minutes =
                value.parse().context("Invalid retry_delay_minutes value")?;
        }
        ["schedule", "retry_from_start"] => {
            config.schedule.retry_from_start = value.parse().context("Invalid boolean value")?;
        }
        ["ui", "color"] => {
            config.ui.color = value.parse().context("Invalid boolean value")?;
        }
        _ => {
            anyhow::bail!("Unknown config key: {}", key);
        }
    }

    config.validate().context("Invalid value")?;
    Ok(())
}

pub fn set(config_override: Option<&Path>, key: &str, value: &str) -> Result<()> {
    let path = config_file(config_override)?;

    let mut config = Config::load_from(&path).context("Failed to load config")?;
    apply(&mut config, key, value)?;
    config.save_to(&path).context("Failed to save config")?;

    println!("{} Set {} = {}", "✓".green(), key.cyan(), value);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "search.index", "rows").unwrap();
        apply(&mut config, "schedule.retries", "3").unwrap();
        apply(&mut config, "clean.strip_non_word", "false").unwrap();

        assert_eq!(config.search.index, "rows");
        assert_eq!(config.schedule.retries, 3);
        assert!(!config.clean.strip_non_word);
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let mut config = Config::default();

        assert!(apply(&mut config, "search.colour", "x").is_err());
        assert!(apply(&mut config, "schedule.retries", "many").is_err());
        assert!(apply(&mut config, "schedule.run_at", "25:99").is_err());
    }

    #[test]
    fn test_set_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::create_default_file(&path).unwrap();

        set(Some(&path), "database.table", "rows").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.database.table, "rows");
    }
}
