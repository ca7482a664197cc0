//! Platform locations for the config file and default data directory.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Default locations, following platform conventions.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    /// Holds the CSV artifacts unless `paths.data_dir` says otherwise.
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
}

impl AppPaths {
    pub fn new() -> ConfigResult<Self> {
        let dirs = ProjectDirs::from("com", "tablepipe", "tablepipe").ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::rooted(dirs.config_dir(), dirs.data_dir()))
    }

    fn rooted(config_dir: &Path, data_dir: &Path) -> Self {
        Self {
            config_file: config_dir.join("config.toml"),
            database_file: data_dir.join("tablepipe.db"),
            config_dir: config_dir.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Use `file` as the config file, e.g. from `--config`.
    pub fn with_config_file(mut self, file: Option<&Path>) -> Self {
        if let Some(file) = file {
            self.config_file = file.to_path_buf();
        }
        self
    }

    /// Create the config and data directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        if let Some(parent) = self.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
