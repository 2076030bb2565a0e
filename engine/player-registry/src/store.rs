//! JSON file store backing the registry
//!
//! The roster is persisted as a single pretty-printed JSON array. Every save
//! rewrites the whole file through a temporary sibling that is renamed into
//! place, so readers never observe a half-written roster.

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Whole-file JSON store for a collection of records
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    temp_path: PathBuf,
    create_parent_dirs: bool,
}

impl JsonFileStore {
    /// Create a store for the data file named in the configuration
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            path: config.data_file.clone(),
            temp_path: config.temp_file(),
            create_parent_dirs: config.create_parent_dirs,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure the backing file exists, creating an empty collection if not
    pub async fn initialize(&self) -> Result<()> {
        if self.create_parent_dirs {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        if !tokio::fs::try_exists(&self.path).await? {
            info!("Creating empty roster file at {:?}", self.path);
            self.save::<serde_json::Value>(&[]).await?;
        }

        Ok(())
    }

    /// Load every record from the backing file
    ///
    /// A missing or blank file is an empty collection. Anything that does not
    /// parse as a JSON array of `T` is reported as corruption and the file is
    /// left untouched.
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Roster file {:?} not found, treating as empty", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| RegistryError::corrupted(&self.path, e.to_string()))
    }

    /// Rewrite the backing file with the given records
    pub async fn save<T: Serialize>(&self, records: &[T]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;

        tokio::fs::write(&self.temp_path, json).await?;
        if let Err(e) = tokio::fs::rename(&self.temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&self.temp_path).await;
            return Err(e.into());
        }

        debug!("Wrote {} records to {:?}", records.len(), self.path);
        Ok(())
    }
}
