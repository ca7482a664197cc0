//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub clean: CleanConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_config_string())?;
        Ok(())
    }

    /// Check values that serde cannot check on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        self.schedule.run_at_time()?;
        self.schedule.start_date_time()?;
        if self.database.table.trim().is_empty() {
            return Err(ConfigError::invalid("database.table", "must not be empty"));
        }
        if self.search.index.trim().is_empty() {
            return Err(ConfigError::invalid("search.index", "must not be empty"));
        }
        if self.search.timeout_seconds == 0 {
            return Err(ConfigError::invalid("search.timeout_seconds", "must be at least 1"));
        }
        if self.search.prune_stale && !self.clean.renumber_ids {
            return Err(ConfigError::invalid(
                "search.prune_stale",
                "requires clean.renumber_ids so ids match document positions",
            ));
        }
        if self.clean.id_column.trim().is_empty() {
            return Err(ConfigError::invalid("clean.id_column", "must not be empty"));
        }
        Ok(())
    }

    /// Resolve every file the pipeline reads or writes.
    pub fn artifact_paths(&self, app: &AppPaths) -> ArtifactPaths {
        let data_dir = self
            .paths
            .data_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| app.data_dir.clone());
        let database_file = self
            .database
            .path
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| app.database_file.clone());

        ArtifactPaths::new(data_dir, database_file, &self.paths)
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# tablepipe configuration

[paths]
# Directory holding the raw, extracted and cleaned CSV files
# data_dir = "~/.local/share/tablepipe"
raw_file = "data_raw.csv"
extracted_file = "data_new.csv"
clean_file = "data_clean.csv"

[database]
# SQLite database file (defaults to the data directory)
# path = "~/.local/share/tablepipe/tablepipe.db"
table = "table_m3"

[search]
# Search endpoint (Elasticsearch-compatible HTTP API, no authentication)
endpoint = "http://localhost:9200"
index = "table_milestone"
timeout_seconds = 30

# Delete documents left over from a previous, longer run
prune_stale = false

[clean]
id_column = "id"
junk_column = "unnamed_12"

# Remove characters other than word characters and whitespace from column names
strip_non_word = true

# Renumber ids 1..N after rows are dropped
renumber_ids = true

[schedule]
name = "tablepipe_daily"
owner = "tablepipe"
start_date = "2024-03-20T06:30:00"
run_at = "06:30"
retries = 1
retry_delay_minutes = 10

# Retry from the first stage instead of the stage that failed
retry_from_start = false

[ui]
color = true
"#
        .to_string()
    }
}

/// Expand a leading `~` to the current user's home directory.
fn expand_home(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Fully resolved locations of the pipeline's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub data_dir: PathBuf,
    pub raw_file: PathBuf,
    pub extracted_file: PathBuf,
    pub clean_file: PathBuf,
    pub database_file: PathBuf,
}

impl ArtifactPaths {
    pub fn new(data_dir: PathBuf, database_file: PathBuf, names: &PathsConfig) -> Self {
        Self {
            raw_file: data_dir.join(&names.raw_file),
            extracted_file: data_dir.join(&names.extracted_file),
            clean_file: data_dir.join(&names.clean_file),
            data_dir,
            database_file,
        }
    }

    /// Default file names inside `data_dir`, with the database alongside them.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let database_file = data_dir.join("tablepipe.db");
        Self::new(data_dir, database_file, &PathsConfig::default())
    }
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: Option<String>,
    pub raw_file: String,
    pub extracted_file: String,
    pub clean_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            raw_file: "data_raw.csv".to_string(),
            extracted_file: "data_new.csv".to_string(),
            clean_file: "data_clean.csv".to_string(),
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<String>,
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            table: "table_m3".to_string(),
        }
    }
}

/// Search index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub index: String,
    pub timeout_seconds: u64,
    pub prune_stale: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".to_string(),
            index: "table_milestone".to_string(),
            timeout_seconds: 30,
            prune_stale: false,
        }
    }
}

/// Rules applied by the clean stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    pub id_column: String,
    pub junk_column: String,
    pub strip_non_word: bool,
    pub renumber_ids: bool,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            id_column: "id".to_string(),
            junk_column: "unnamed_12".to_string(),
            strip_non_word: true,
            renumber_ids: true,
        }
    }
}

/// Description of how an external scheduler triggers the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub name: String,
    pub owner: String,
    pub start_date: String,
    pub run_at: String,
    pub retries: u32,
    pub retry_delay_minutes: u64,
    pub retry_from_start: bool,
}

impl ScheduleConfig {
    /// Daily trigger time, parsed from `HH:MM`.
    pub fn run_at_time(&self) -> ConfigResult<NaiveTime> {
        NaiveTime::parse_from_str(&self.run_at, "%H:%M")
            .map_err(|e| ConfigError::invalid("schedule.run_at", format!("'{}': {}", self.run_at, e)))
    }

    /// First date the workflow is eligible to run.
    pub fn start_date_time(&self) -> ConfigResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.start_date, "%Y-%m-%dT%H:%M:%S").map_err(|e| {
            ConfigError::invalid("schedule.start_date", format!("'{}': {}", self.start_date, e))
        })
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            name: "tablepipe_daily".to_string(),
            owner: "tablepipe".to_string(),
            start_date: "2024-03-20T06:30:00".to_string(),
            run_at: "06:30".to_string(),
            retries: 1,
            retry_delay_minutes: 10,
            retry_from_start: false,
        }
    }
}

/// UI/Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { color: true }
    }
}
