//! Configuration for the player registry

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the player registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// JSON file holding the roster
    pub data_file: PathBuf,

    /// Whether to create missing parent directories of the data file on open
    pub create_parent_dirs: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { data_file: PathBuf::from("./data/players.json"), create_parent_dirs: true }
    }
}

impl RegistryConfig {
    /// Create a new configuration with a custom data file
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self { data_file: data_file.into(), ..Default::default() }
    }

    /// Create config from environment variables, falling back to defaults
    ///
    /// Reads `TOURNAMENT_DATA_FILE` and `TOURNAMENT_CREATE_DIRS`, after
    /// loading a `.env` file if one is present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        if let Ok(data_file) = std::env::var("TOURNAMENT_DATA_FILE") {
            config.data_file = PathBuf::from(data_file);
        }

        if let Ok(create_dirs) = std::env::var("TOURNAMENT_CREATE_DIRS") {
            config.create_parent_dirs = create_dirs.parse().map_err(|_| {
                RegistryError::config(format!(
                    "TOURNAMENT_CREATE_DIRS must be true or false, got {create_dirs:?}"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.data_file.as_os_str().is_empty() {
            return Err(RegistryError::config("data_file must not be empty"));
        }

        if self.data_file.is_dir() {
            return Err(RegistryError::config(format!(
                "data_file {:?} is a directory",
                self.data_file
            )));
        }

        Ok(())
    }

    /// Temporary sibling file used for whole-file rewrites
    pub fn temp_file(&self) -> PathBuf {
        let mut name = self.data_file.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.data_file.with_file_name(name)
    }
}
