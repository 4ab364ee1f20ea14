//! File-backed persistence of the mirror, the last-synchronized snapshots
//! ("originals"), catalog caches, pending comments and the advisory lock.
//!
//! Layout under the workspace root:
//!
//! ```text
//! .issues/
//!   open/              one file per open issue: <id>-<slug>.md
//!   closed/            one file per closed issue
//!   .sync/
//!     config.json      repository + last pull timestamp
//!     originals/       snapshots keyed by id: <id>.md
//!     comments/        pending comments: <id>.md
//!     labels.json      catalog caches
//!     milestones.json
//!     issue_types.json
//!     projects.json
//! ```

pub mod catalog;
pub mod document;
pub mod lock;

use crate::error::{MirrorError, Result};
use crate::model::{Issue, IssueId, State};
use std::fs;
use std::path::{Path, PathBuf};

const ISSUES_DIR_NAME: &str = ".issues";
const SYNC_DIR_NAME: &str = ".sync";
const ORIGINALS_DIR_NAME: &str = "originals";
const COMMENTS_DIR_NAME: &str = "comments";
const OPEN_DIR_NAME: &str = "open";
const CLOSED_DIR_NAME: &str = "closed";
const CONFIG_FILE_NAME: &str = "config.json";

/// Resolved filesystem layout for one workspace.
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
    pub issues_dir: PathBuf,
    pub sync_dir: PathBuf,
    pub originals_dir: PathBuf,
    pub comments_dir: PathBuf,
    pub open_dir: PathBuf,
    pub closed_dir: PathBuf,
    pub config_path: PathBuf,
}

impl Paths {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        let issues_dir = root.join(ISSUES_DIR_NAME);
        let sync_dir = issues_dir.join(SYNC_DIR_NAME);
        Self {
            root: root.to_path_buf(),
            originals_dir: sync_dir.join(ORIGINALS_DIR_NAME),
            comments_dir: sync_dir.join(COMMENTS_DIR_NAME),
            open_dir: issues_dir.join(OPEN_DIR_NAME),
            closed_dir: issues_dir.join(CLOSED_DIR_NAME),
            config_path: sync_dir.join(CONFIG_FILE_NAME),
            issues_dir,
            sync_dir,
        }
    }

    /// Create every directory of the layout.
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [
            &self.issues_dir,
            &self.sync_dir,
            &self.originals_dir,
            &self.open_dir,
            &self.closed_dir,
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// True once `init` has run here.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.config_path.is_file()
    }

    /// Path of a record relative to the workspace root, for display.
    #[must_use]
    pub fn rel(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// The mirror container a record lives in. Set deliberately by the
/// orchestrator on every write, never inferred from a path at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Open,
    Closed,
}

impl Location {
    #[must_use]
    pub const fn for_state(state: State) -> Self {
        match state {
            State::Open => Self::Open,
            State::Closed => Self::Closed,
        }
    }

    #[must_use]
    pub const fn state(self) -> State {
        match self {
            Self::Open => State::Open,
            Self::Closed => State::Closed,
        }
    }

    #[must_use]
    pub fn dir(self, paths: &Paths) -> &Path {
        match self {
            Self::Open => &paths.open_dir,
            Self::Closed => &paths.closed_dir,
        }
    }
}

/// A record loaded from the mirror, with its container and path.
#[derive(Debug, Clone)]
pub struct IssueFile {
    pub issue: Issue,
    pub path: PathBuf,
    pub location: Location,
}

/// Load every record in the mirror.
///
/// A malformed file is fatal for that record only: it is logged and
/// skipped so the rest of the batch proceeds.
pub fn load_local_issues(paths: &Paths) -> Result<Vec<IssueFile>> {
    let mut issues = Vec::new();
    for location in [Location::Open, Location::Closed] {
        let dir = location.dir(paths);
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "md") {
                continue;
            }
            match document::parse_file(&path) {
                Ok(mut issue) => {
                    issue.state = location.state();
                    issues.push(IssueFile {
                        issue,
                        path,
                        location,
                    });
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping malformed issue file");
                }
            }
        }
    }
    Ok(issues)
}

/// Find a single record by exact id.
pub fn find_issue(paths: &Paths, id: &str) -> Result<IssueFile> {
    load_local_issues(paths)?
        .into_iter()
        .find(|item| item.issue.id.as_str() == id)
        .ok_or_else(|| MirrorError::IssueNotFound { id: id.to_string() })
}

/// Read the snapshot for an id, if one exists.
#[must_use]
pub fn read_original(paths: &Paths, id: &str) -> Option<Issue> {
    let path = paths.originals_dir.join(format!("{id}.md"));
    document::parse_file(&path).ok()
}

/// Overwrite the snapshot for a record.
pub fn write_original(paths: &Paths, issue: &Issue) -> Result<()> {
    let path = paths.originals_dir.join(format!("{}.md", issue.id));
    document::write_file(&path, issue)
}

/// Every id that has a snapshot.
pub fn list_original_ids(paths: &Paths) -> Result<Vec<IssueId>> {
    let mut ids = Vec::new();
    let entries = match fs::read_dir(&paths.originals_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            ids.push(document::id_from_filename(&path));
        }
    }
    ids.sort();
    Ok(ids)
}

/// A comment authored offline, waiting to be posted on the next push.
#[derive(Debug, Clone)]
pub struct PendingComment {
    pub id: IssueId,
    pub body: String,
    pub path: PathBuf,
}

/// Load every pending comment, sorted by issue id.
pub fn load_pending_comments(paths: &Paths) -> Result<Vec<PendingComment>> {
    let mut comments = Vec::new();
    let entries = match fs::read_dir(&paths.comments_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(comments),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "md") {
            continue;
        }
        let body = fs::read_to_string(&path)?;
        comments.push(PendingComment {
            id: document::id_from_filename(&path),
            body,
            path,
        });
    }
    comments.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(comments)
}

/// The pending comment for one issue, if any.
#[must_use]
pub fn find_pending_comment(paths: &Paths, id: &IssueId) -> Option<PendingComment> {
    let path = paths.comments_dir.join(format!("{id}.md"));
    let body = fs::read_to_string(&path).ok()?;
    Some(PendingComment {
        id: id.clone(),
        body,
        path,
    })
}

/// Queue a comment for the next push, appending to any existing one.
pub fn save_pending_comment(paths: &Paths, id: &IssueId, body: &str) -> Result<PathBuf> {
    fs::create_dir_all(&paths.comments_dir)?;
    let path = paths.comments_dir.join(format!("{id}.md"));
    let combined = match fs::read_to_string(&path) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}\n\n{}\n", existing.trim_end(), body.trim_end())
        }
        _ => format!("{}\n", body.trim_end()),
    };
    fs::write(&path, combined)?;
    Ok(path)
}

/// Remove a posted comment file.
pub fn delete_pending_comment(comment: &PendingComment) -> Result<()> {
    fs::remove_file(&comment.path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Paths) {
        let dir = TempDir::new().unwrap();
        let paths = Paths::new(dir.path());
        paths.ensure_layout().unwrap();
        (dir, paths)
    }

    fn write_issue(paths: &Paths, location: Location, id: &str, title: &str) {
        let issue = Issue {
            id: IssueId::new(id),
            title: title.to_string(),
            state: location.state(),
            ..Issue::default()
        };
        let path = document::path_for(location.dir(paths), &issue.id, title);
        document::write_file(&path, &issue).unwrap();
    }

    #[test]
    fn location_maps_state_both_ways() {
        assert_eq!(Location::for_state(State::Closed), Location::Closed);
        assert_eq!(Location::Open.state(), State::Open);
    }

    #[test]
    fn load_reads_both_containers() {
        let (_dir, paths) = workspace();
        write_issue(&paths, Location::Open, "1", "First");
        write_issue(&paths, Location::Closed, "2", "Second");

        let issues = load_local_issues(&paths).unwrap();
        assert_eq!(issues.len(), 2);
        let closed = issues
            .iter()
            .find(|item| item.issue.id.as_str() == "2")
            .unwrap();
        assert_eq!(closed.location, Location::Closed);
        assert_eq!(closed.issue.state, State::Closed);
    }

    #[test]
    fn load_skips_malformed_files() {
        let (_dir, paths) = workspace();
        write_issue(&paths, Location::Open, "1", "Good");
        fs::write(paths.open_dir.join("2-bad.md"), "not a record").unwrap();

        let issues = load_local_issues(&paths).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue.id.as_str(), "1");
    }

    #[test]
    fn find_issue_by_id() {
        let (_dir, paths) = workspace();
        write_issue(&paths, Location::Open, "T3ab", "Local one");
        assert!(find_issue(&paths, "T3ab").is_ok());
        assert!(matches!(
            find_issue(&paths, "99"),
            Err(MirrorError::IssueNotFound { .. })
        ));
    }

    #[test]
    fn originals_round_trip() {
        let (_dir, paths) = workspace();
        let issue = Issue {
            id: IssueId::new("42"),
            title: "Snap".to_string(),
            ..Issue::default()
        };
        assert!(read_original(&paths, "42").is_none());
        write_original(&paths, &issue).unwrap();
        let back = read_original(&paths, "42").unwrap();
        assert_eq!(back.id, issue.id);
        assert_eq!(list_original_ids(&paths).unwrap(), vec![IssueId::new("42")]);
    }

    #[test]
    fn pending_comment_lifecycle() {
        let (_dir, paths) = workspace();
        let id = IssueId::new("7");
        save_pending_comment(&paths, &id, "first note").unwrap();
        save_pending_comment(&paths, &id, "second note").unwrap();

        let all = load_pending_comments(&paths).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].body.contains("first note"));
        assert!(all[0].body.contains("second note"));

        delete_pending_comment(&all[0]).unwrap();
        assert!(find_pending_comment(&paths, &id).is_none());
    }
}
