//! Workspace configuration.
//!
//! One JSON file in the sync directory holds the remote repository binding
//! and the timestamp of the last full pull (drives incremental pulls).

use crate::error::{MirrorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub repository: RepoConfig,
    #[serde(default)]
    pub sync: SyncState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoConfig {
    pub owner: String,
    pub repo: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_full_pull: Option<DateTime<Utc>>,
}

impl Config {
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            repository: RepoConfig {
                owner: owner.into(),
                repo: repo.into(),
            },
            sync: SyncState::default(),
        }
    }

    /// `owner/repo` slug passed to the remote client.
    #[must_use]
    pub fn repo_slug(&self) -> String {
        format!(
            "{}/{}",
            self.repository.owner.trim(),
            self.repository.repo.trim()
        )
    }

    /// Load from the config path; a missing file means the workspace was
    /// never initialized.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(MirrorError::NotInitialized);
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&data).map_err(|err| MirrorError::Config(err.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut data = serde_json::to_string_pretty(self)?;
        data.push('\n');
        fs::write(path, data)?;
        Ok(())
    }
}
