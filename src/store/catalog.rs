//! Catalog caches: labels, milestones, issue types and projects known to
//! exist on the remote side.
//!
//! Each catalog is one JSON file in the sync directory holding the full
//! known set plus a last-refreshed timestamp. Caches are consumed by push
//! for dependency resolution and by display commands; they are never
//! authoritative over the remote service, and growth is monotonic within a
//! run.

use crate::error::Result;
use crate::store::Paths;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const LABELS_FILE: &str = "labels.json";
const MILESTONES_FILE: &str = "milestones.json";
const ISSUE_TYPES_FILE: &str = "issue_types.json";
const PROJECTS_FILE: &str = "projects.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelEntry {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelCache {
    pub labels: Vec<LabelEntry>,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MilestoneEntry {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_on: Option<String>,
    pub state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MilestoneCache {
    pub milestones: Vec<MilestoneEntry>,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueTypeEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueTypeCache {
    pub issue_types: Vec<IssueTypeEntry>,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectEntry {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectCache {
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

impl LabelCache {
    /// Lowercase name to color, for case-insensitive lookups.
    #[must_use]
    pub fn color_map(&self) -> HashMap<String, String> {
        self.labels
            .iter()
            .map(|l| (l.name.to_lowercase(), l.color.clone()))
            .collect()
    }
}

impl MilestoneCache {
    #[must_use]
    pub fn titles(&self) -> HashMap<String, ()> {
        self.milestones
            .iter()
            .map(|m| (m.title.to_lowercase(), ()))
            .collect()
    }
}

impl IssueTypeCache {
    #[must_use]
    pub fn by_name(&self) -> HashMap<String, IssueTypeEntry> {
        self.issue_types
            .iter()
            .map(|t| (t.name.to_lowercase(), t.clone()))
            .collect()
    }
}

impl ProjectCache {
    #[must_use]
    pub fn by_title(&self) -> HashMap<String, ProjectEntry> {
        self.projects
            .iter()
            .map(|p| (p.title.to_lowercase(), p.clone()))
            .collect()
    }
}

fn cache_path(paths: &Paths, file: &str) -> PathBuf {
    paths.sync_dir.join(file)
}

fn load_cache<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(err) => return Err(err.into()),
    };
    Ok(serde_json::from_str(&data)?)
}

fn save_cache<T: Serialize>(path: &Path, cache: &T) -> Result<()> {
    let mut data = serde_json::to_string_pretty(cache)?;
    data.push('\n');
    fs::write(path, data)?;
    Ok(())
}

pub fn load_labels(paths: &Paths) -> Result<LabelCache> {
    load_cache(&cache_path(paths, LABELS_FILE))
}

pub fn save_labels(paths: &Paths, cache: &LabelCache) -> Result<()> {
    save_cache(&cache_path(paths, LABELS_FILE), cache)
}

pub fn load_milestones(paths: &Paths) -> Result<MilestoneCache> {
    load_cache(&cache_path(paths, MILESTONES_FILE))
}

pub fn save_milestones(paths: &Paths, cache: &MilestoneCache) -> Result<()> {
    save_cache(&cache_path(paths, MILESTONES_FILE), cache)
}

pub fn load_issue_types(paths: &Paths) -> Result<IssueTypeCache> {
    load_cache(&cache_path(paths, ISSUE_TYPES_FILE))
}

pub fn save_issue_types(paths: &Paths, cache: &IssueTypeCache) -> Result<()> {
    save_cache(&cache_path(paths, ISSUE_TYPES_FILE), cache)
}

pub fn load_projects(paths: &Paths) -> Result<ProjectCache> {
    load_cache(&cache_path(paths, PROJECTS_FILE))
}

pub fn save_projects(paths: &Paths, cache: &ProjectCache) -> Result<()> {
    save_cache(&cache_path(paths, PROJECTS_FILE), cache)
}

/// Build a label cache from a name-to-color map, sorted for stable output.
#[must_use]
pub fn labels_from_color_map(
    colors: &HashMap<String, String>,
    synced_at: DateTime<Utc>,
) -> LabelCache {
    let mut labels: Vec<LabelEntry> = colors
        .iter()
        .map(|(name, color)| LabelEntry {
            name: name.clone(),
            color: color.clone(),
        })
        .collect();
    labels.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    LabelCache {
        labels,
        synced_at: Some(synced_at),
    }
}
