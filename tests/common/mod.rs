#![allow(dead_code)]

//! Shared test fixtures: an in-memory remote service and workspace helpers.

use chrono::{TimeZone, Utc};
use issuemirror::config::Config;
use issuemirror::error::{MirrorError, Result};
use issuemirror::model::{Issue, IssueId, IssueRef, State};
use issuemirror::remote::{
    BatchIssueUpdate, BatchUpdateResult, CancelToken, IssueTypeInfo, Label, ListOptions,
    ListState, Milestone, ProjectInfo, RemoteService,
};
use issuemirror::store::{document, Location, Paths};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// Deterministic base time for fixtures.
pub fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

/// An initialized workspace rooted in a temp directory.
pub fn workspace() -> (TempDir, Paths, Config) {
    let dir = TempDir::new().unwrap();
    let paths = Paths::new(dir.path());
    paths.ensure_layout().unwrap();
    let config = Config::new("acme", "widgets");
    config.save(&paths.config_path).unwrap();
    (dir, paths, config)
}

/// Minimal issue fixture.
pub fn issue(id: &str, title: &str) -> Issue {
    Issue {
        id: IssueId::new(id),
        title: title.to_string(),
        state: State::Open,
        updated_at: Some(base_time()),
        ..Issue::default()
    }
}

/// Write a record into the mirror and return its path.
pub fn write_local(paths: &Paths, location: Location, issue: &Issue) -> PathBuf {
    let path = document::path_for(location.dir(paths), &issue.id, &issue.title);
    document::write_file(&path, issue).unwrap();
    path
}

/// Write a snapshot for a record.
pub fn write_original(paths: &Paths, issue: &Issue) {
    issuemirror::store::write_original(paths, issue).unwrap();
}

/// In-memory remote service. Records every mutating call per id so tests
/// can assert conflict precedence.
#[derive(Default)]
pub struct MockRemote {
    pub issues: Mutex<HashMap<String, Issue>>,
    pub labels: Mutex<Vec<Label>>,
    pub milestones: Mutex<Vec<Milestone>>,
    pub issue_types: Mutex<Vec<IssueTypeInfo>>,
    pub projects: Mutex<Vec<ProjectInfo>>,
    pub next_number: AtomicU64,
    pub calls: Mutex<Vec<String>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            next_number: AtomicU64::new(100),
            ..Self::default()
        }
    }

    /// Next permanent id handed out by `create_issue`.
    pub fn with_next_number(next: u64) -> Self {
        Self {
            next_number: AtomicU64::new(next),
            ..Self::default()
        }
    }

    pub fn insert_issue(&self, issue: Issue) {
        self.issues
            .lock()
            .unwrap()
            .insert(issue.id.to_string(), issue);
    }

    pub fn insert_label(&self, name: &str, color: &str) {
        self.labels.lock().unwrap().push(Label {
            name: name.to_string(),
            color: color.to_string(),
        });
    }

    pub fn remote_issue(&self, id: &str) -> Issue {
        self.issues.lock().unwrap().get(id).cloned().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Every mutating call recorded for one id.
    pub fn calls_for(&self, id: &str) -> Vec<String> {
        let suffix = format!(":{id}");
        self.calls()
            .into_iter()
            .filter(|call| call.ends_with(&suffix))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RemoteService for MockRemote {
    fn list_issues(&self, cancel: &CancelToken, opts: &ListOptions) -> Result<Vec<Issue>> {
        cancel.check()?;
        let state = opts.state.unwrap_or(ListState::Open);
        let issues = self.issues.lock().unwrap();
        let mut result: Vec<Issue> = issues
            .values()
            .filter(|issue| match state {
                ListState::Open => issue.state == State::Open,
                ListState::Closed => issue.state == State::Closed,
                ListState::All => true,
            })
            .filter(|issue| {
                opts.labels.iter().all(|wanted| {
                    issue
                        .labels
                        .iter()
                        .any(|have| have.eq_ignore_ascii_case(wanted))
                })
            })
            .filter(|issue| match opts.since {
                Some(since) => issue.updated_at.is_some_and(|at| at >= since),
                None => true,
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(result)
    }

    fn get_issue(&self, cancel: &CancelToken, id: &str) -> Result<Issue> {
        cancel.check()?;
        self.issues
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| MirrorError::Remote(format!("HTTP 404: Not Found (#{id})")))
    }

    fn get_issues_batch(
        &self,
        cancel: &CancelToken,
        ids: &[String],
    ) -> Result<HashMap<String, Issue>> {
        cancel.check()?;
        let issues = self.issues.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| issues.get(id).map(|issue| (id.clone(), issue.clone())))
            .collect())
    }

    fn create_issue(&self, cancel: &CancelToken, issue: &Issue) -> Result<String> {
        cancel.check()?;
        let number = self.next_number.fetch_add(1, Ordering::SeqCst).to_string();
        self.record(format!("create:{number}"));
        let mut created = issue.clone();
        created.id = IssueId::new(&number);
        created.synced_at = None;
        self.insert_issue(created);
        Ok(number)
    }

    fn edit_issues_batch(
        &self,
        cancel: &CancelToken,
        updates: &[BatchIssueUpdate],
    ) -> Result<BatchUpdateResult> {
        cancel.check()?;
        let mut issues = self.issues.lock().unwrap();
        let mut result = BatchUpdateResult::default();
        for update in updates {
            self.record(format!("edit:{}", update.id));
            let Some(issue) = issues.get_mut(&update.id) else {
                result
                    .errors
                    .insert(update.id.clone(), "not found".to_string());
                continue;
            };
            if let Some(title) = &update.title {
                issue.title = title.clone();
            }
            if let Some(body) = &update.body {
                issue.body = body.clone();
            }
            if let Some(milestone) = &update.milestone {
                issue.milestone = milestone.clone();
            }
            if let Some(labels) = &update.labels {
                issue.labels = labels.clone();
            }
            if let Some(assignees) = &update.assignees {
                issue.assignees = assignees.clone();
            }
        }
        Ok(result)
    }

    fn close_issue(&self, cancel: &CancelToken, id: &str, reason: Option<&str>) -> Result<()> {
        cancel.check()?;
        self.record(format!("close:{id}"));
        let mut issues = self.issues.lock().unwrap();
        if let Some(issue) = issues.get_mut(id) {
            issue.state = State::Closed;
            // The remote auto-populates a reason when none is given.
            issue.state_reason = Some(reason.unwrap_or("completed").to_string());
        }
        Ok(())
    }

    fn reopen_issue(&self, cancel: &CancelToken, id: &str) -> Result<()> {
        cancel.check()?;
        self.record(format!("reopen:{id}"));
        let mut issues = self.issues.lock().unwrap();
        if let Some(issue) = issues.get_mut(id) {
            issue.state = State::Open;
            issue.state_reason = None;
        }
        Ok(())
    }

    fn list_labels(&self, cancel: &CancelToken) -> Result<Vec<Label>> {
        cancel.check()?;
        Ok(self.labels.lock().unwrap().clone())
    }

    fn create_label(&self, cancel: &CancelToken, name: &str, color: &str) -> Result<()> {
        cancel.check()?;
        self.record(format!("create_label:{name}"));
        self.insert_label(name, color);
        Ok(())
    }

    fn list_milestones(&self, cancel: &CancelToken) -> Result<Vec<Milestone>> {
        cancel.check()?;
        Ok(self.milestones.lock().unwrap().clone())
    }

    fn create_milestone(&self, cancel: &CancelToken, title: &str) -> Result<()> {
        cancel.check()?;
        self.record(format!("create_milestone:{title}"));
        self.milestones.lock().unwrap().push(Milestone {
            title: title.to_string(),
            description: String::new(),
            due_on: None,
            state: "open".to_string(),
        });
        Ok(())
    }

    fn list_issue_types(&self, cancel: &CancelToken) -> Result<Vec<IssueTypeInfo>> {
        cancel.check()?;
        Ok(self.issue_types.lock().unwrap().clone())
    }

    fn set_issue_type(&self, cancel: &CancelToken, id: &str, type_id: &str) -> Result<()> {
        cancel.check()?;
        self.record(format!("set_type:{id}"));
        let mut issues = self.issues.lock().unwrap();
        if let Some(issue) = issues.get_mut(id) {
            let types = self.issue_types.lock().unwrap();
            issue.issue_type = types
                .iter()
                .find(|t| t.id == type_id)
                .map(|t| t.name.clone())
                .unwrap_or_default();
        }
        Ok(())
    }

    fn list_projects(&self, cancel: &CancelToken) -> Result<Vec<ProjectInfo>> {
        cancel.check()?;
        Ok(self.projects.lock().unwrap().clone())
    }

    fn sync_projects(
        &self,
        cancel: &CancelToken,
        id: &str,
        desired: &[String],
        _known: &HashMap<String, String>,
    ) -> Result<()> {
        cancel.check()?;
        self.record(format!("sync_projects:{id}"));
        let mut issues = self.issues.lock().unwrap();
        if let Some(issue) = issues.get_mut(id) {
            issue.projects = desired.to_vec();
        }
        Ok(())
    }

    fn sync_relationships(&self, cancel: &CancelToken, id: &str, local: &Issue) -> Result<()> {
        cancel.check()?;
        self.record(format!("sync_relationships:{id}"));
        let mut issues = self.issues.lock().unwrap();
        if let Some(issue) = issues.get_mut(id) {
            issue.parent = local.parent.clone();
            issue.blocked_by = local
                .blocked_by
                .iter()
                .map(|r| IssueRef::new(r.as_str()))
                .collect();
        }
        Ok(())
    }

    fn create_comment(&self, cancel: &CancelToken, id: &str, _body: &str) -> Result<()> {
        cancel.check()?;
        self.record(format!("comment:{id}"));
        Ok(())
    }
}
