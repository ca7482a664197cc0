//! CLI command implementations.

pub mod config;
pub mod init;
pub mod run;
pub mod runs;
pub mod schedule;
pub mod stage;
pub mod status;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tablepipe_config::{AppPaths, ArtifactPaths, Config};
use tablepipe_core::Stage;
use tablepipe_db::Database;
use tablepipe_pipeline::{Pipeline, PipelineSettings};
use tablepipe_search::{DocumentIndex, SearchClient};
use tracing::debug;

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// The config file in use: the override if given, else the default location.
pub fn config_file(config_override: Option<&Path>) -> Result<PathBuf> {
    Ok(get_paths()?.with_config_file(config_override).config_file)
}

/// Loaded configuration together with the paths it resolves to.
pub struct Workspace {
    pub config_file: PathBuf,
    pub config: Config,
    pub artifacts: ArtifactPaths,
}

impl Workspace {
    /// Load the configuration, requiring `tablepipe init` to have been run.
    pub fn load(config_override: Option<&Path>) -> Result<Self> {
        let app = get_paths()?.with_config_file(config_override);
        let config_file = app.config_file.clone();

        if !config_file.exists() {
            anyhow::bail!("Tablepipe is not initialized. Run 'tablepipe init' first.");
        }

        debug!("Loading config from {}", config_file.display());
        let config = Config::load_from(&config_file).context("Failed to load config")?;
        if !config.ui.color {
            colored::control::set_override(false);
        }
        let artifacts = config.artifact_paths(&app);

        Ok(Self {
            config_file,
            config,
            artifacts,
        })
    }

    pub fn database(&self) -> Result<Database> {
        Database::open(&self.artifacts.database_file).context("Failed to open database")
    }

    pub fn search_client(&self) -> Result<SearchClient> {
        SearchClient::from_config(&self.config.search).context("Failed to create search client")
    }

    pub fn pipeline(&self, index: Arc<dyn DocumentIndex>) -> Result<Pipeline> {
        Ok(Pipeline::new(
            self.database()?,
            self.artifacts.clone(),
            PipelineSettings::from_config(&self.config),
            index,
        ))
    }
}

/// Parse a stage name given on the command line.
pub fn parse_stage(name: &str) -> Result<Stage> {
    Stage::from_str(name).with_context(|| {
        format!(
            "Unknown stage '{}' (expected ingest, extract, clean or publish)",
            name
        )
    })
}

/// First eight characters of a run id, for display.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
