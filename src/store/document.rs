//! On-disk record format: a YAML metadata block between `---` delimiters,
//! followed by the free-text body.
//!
//! The issue id is not part of the metadata block; it derives from the
//! filename (`<id>-<slug>.md` in the mirror, `<id>.md` for snapshots).
//! Unknown metadata keys survive a parse/render cycle via the explicit
//! extras map on [`Issue`].

use crate::error::{MirrorError, Result};
use crate::model::{normalize_body, sorted_strings, Issue, IssueId, IssueRef, State};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DELIMITER: &str = "---";

/// Read-only provenance, nested under `info:` in the metadata block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct InfoSection {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    assignees: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    milestone: String,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    issue_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    projects: Vec<String>,
    #[serde(default)]
    state: State,
    #[serde(default)]
    state_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<IssueRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    blocked_by: Vec<IssueRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    blocks: Vec<IssueRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    synced_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    info: Option<InfoSection>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

/// Parse a record document. The id is left empty; callers derive it from
/// the filename via [`id_from_filename`].
pub fn parse(data: &str) -> Result<Issue> {
    let (front, body) = split_front_matter(data)?;
    let fm: FrontMatter = serde_yaml::from_str(front)?;

    let mut issue = Issue {
        title: fm.title,
        labels: fm.labels,
        assignees: fm.assignees,
        milestone: fm.milestone,
        issue_type: fm.issue_type,
        projects: fm.projects,
        state: fm.state,
        state_reason: fm.state_reason,
        parent: fm.parent,
        blocked_by: fm.blocked_by,
        blocks: fm.blocks,
        synced_at: fm.synced_at,
        body: normalize_body(body),
        extra: fm.extra,
        ..Issue::default()
    };
    if let Some(info) = fm.info {
        issue.author = info.author;
        issue.created_at = info.created_at;
        issue.updated_at = info.updated_at;
    }
    Ok(issue)
}

/// Render a record document. List fields serialize sorted; `state_reason`
/// is always present (as `null` when unset) so operator edits to it diff
/// cleanly.
pub fn render(issue: &Issue) -> Result<String> {
    let norm = issue.normalized();
    let fm = FrontMatter {
        title: norm.title,
        labels: norm.labels,
        assignees: norm.assignees,
        milestone: norm.milestone,
        issue_type: norm.issue_type,
        projects: norm.projects,
        state: norm.state,
        state_reason: norm.state_reason,
        parent: norm.parent,
        blocked_by: norm.blocked_by,
        blocks: norm.blocks,
        synced_at: norm.synced_at,
        info: if norm.author.is_empty() && norm.created_at.is_none() && norm.updated_at.is_none() {
            None
        } else {
            Some(InfoSection {
                author: norm.author,
                created_at: norm.created_at,
                updated_at: norm.updated_at,
            })
        },
        extra: norm.extra,
    };
    let payload = serde_yaml::to_string(&fm)?;
    Ok(format!(
        "{DELIMITER}\n{payload}{DELIMITER}\n\n{}",
        norm.body
    ))
}

/// Parse a record file, deriving the id from the filename.
pub fn parse_file(path: &Path) -> Result<Issue> {
    let data = fs::read_to_string(path)?;
    let mut issue = parse(&data).map_err(|err| MirrorError::MalformedDocument {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    issue.id = id_from_filename(path);
    validate(&issue, path)?;
    Ok(issue)
}

/// Write a record file.
pub fn write_file(path: &Path, issue: &Issue) -> Result<()> {
    let content = render(issue)?;
    fs::write(path, content)?;
    Ok(())
}

/// Extract the id from a filename like `42-title.md`, `T5x-title.md`, or a
/// snapshot name like `42.md`.
#[must_use]
pub fn id_from_filename(path: &Path) -> IssueId {
    let stem = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("")
        .trim_end_matches(".md");
    match stem.find('-') {
        Some(idx) => IssueId::new(&stem[..idx]),
        None => IssueId::new(stem),
    }
}

/// Mirror filename for an id: `<id>-<slug>.md`. The slug is cosmetic only.
#[must_use]
pub fn file_name(id: &IssueId, title: &str) -> String {
    let mut slug = slugify(title);
    if slug.is_empty() {
        slug = "issue".to_string();
    }
    format!("{id}-{slug}.md")
}

/// Full mirror path for an id within a container directory.
#[must_use]
pub fn path_for(dir: &Path, id: &IssueId, title: &str) -> PathBuf {
    dir.join(file_name(id, title))
}

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Lowercase, hyphen-separated slug of a title.
#[must_use]
pub fn slugify(title: &str) -> String {
    let lower = title.trim().to_lowercase();
    if lower.is_empty() {
        return String::new();
    }
    let slug = SLUG_PATTERN.replace_all(&lower, "-");
    slug.trim_matches(|c| c == '-' || c == '.').to_string()
}

fn split_front_matter(data: &str) -> Result<(&str, &str)> {
    let data = data.strip_prefix('\u{feff}').unwrap_or(data);
    let rest = data
        .strip_prefix("---\n")
        .ok_or_else(|| MirrorError::validation("front_matter", "missing front matter"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches('\n') == DELIMITER {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let body = body.strip_prefix('\n').unwrap_or(body);
            return Ok((front, body));
        }
        offset += line.len();
    }
    Err(MirrorError::validation(
        "front_matter",
        "unterminated front matter",
    ))
}

/// Validate a parsed record beyond what the codec enforces.
pub fn validate(issue: &Issue, path: &Path) -> Result<()> {
    if issue.title.trim().is_empty() {
        return Err(MirrorError::MalformedDocument {
            path: path.to_path_buf(),
            reason: "missing required field: title".to_string(),
        });
    }
    // Labels containing separators would corrupt remote lookups downstream.
    for label in sorted_strings(&issue.labels) {
        if label.contains(',') {
            return Err(MirrorError::MalformedDocument {
                path: path.to_path_buf(),
                reason: format!("label '{label}' must not contain ','"),
            });
        }
    }
    Ok(())
}
