//! Boundary to the remote issue service.
//!
//! The orchestrator consumes the [`RemoteService`] trait and is indifferent
//! to the transport behind it, as long as batched variants exist for the
//! performance-sensitive paths (listing, multi-id fetch, multi-id edit).
//! [`gh::GhClient`] is the production implementation; tests swap in mocks.

pub mod gh;

use crate::error::{MirrorError, Result};
use crate::model::{Issue, State};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation token threaded through every remote call.
///
/// Cancellation aborts the next remote request; it never rolls back writes
/// already committed to the local store.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Error out if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MirrorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Scope of a remote listing.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// `None` lists open records only; `Some(state)` restricts or widens.
    pub state: Option<ListState>,
    pub labels: Vec<String>,
    /// Only records updated at or after this instant (incremental pull).
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    Open,
    Closed,
    All,
}

impl ListState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub title: String,
    pub description: String,
    pub due_on: Option<String>,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueTypeInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub id: String,
    pub title: String,
}

/// Direction of a state transition, issued before any field edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
    Close,
    Reopen,
}

/// Field-level edit for one record, derived from baseline vs local.
#[derive(Debug, Clone, Default)]
pub struct IssueChange {
    pub title: Option<String>,
    pub body: Option<String>,
    pub milestone: Option<String>,
    pub add_labels: Vec<String>,
    pub remove_labels: Vec<String>,
    pub add_assignees: Vec<String>,
    pub remove_assignees: Vec<String>,
    pub add_projects: Vec<String>,
    pub remove_projects: Vec<String>,
    /// `Some("")` clears the type; `None` leaves it untouched.
    pub issue_type: Option<String>,
    pub state_transition: Option<StateTransition>,
    pub state_reason: Option<String>,
}

impl IssueChange {
    /// Compute the edit that turns `baseline` into `local`.
    ///
    /// The baseline is the snapshot when one exists, else the freshly
    /// fetched remote record (the first push-style edit of a record that
    /// was never snapshotted).
    #[must_use]
    pub fn between(baseline: &Issue, local: &Issue) -> Self {
        use crate::model::diff::diff_string_set;
        let baseline = baseline.normalized();
        let local = local.normalized();

        let mut change = Self::default();
        if baseline.title != local.title {
            change.title = Some(local.title.clone());
        }
        if baseline.body != local.body {
            change.body = Some(local.body.clone());
        }
        (change.add_labels, change.remove_labels) =
            diff_string_set(&baseline.labels, &local.labels);
        (change.add_assignees, change.remove_assignees) =
            diff_string_set(&baseline.assignees, &local.assignees);
        (change.add_projects, change.remove_projects) =
            diff_string_set(&baseline.projects, &local.projects);
        if baseline.milestone != local.milestone {
            change.milestone = Some(local.milestone.clone());
        }
        if baseline.issue_type != local.issue_type {
            change.issue_type = Some(local.issue_type.clone());
        }
        if baseline.state != local.state {
            change.state_transition = Some(match local.state {
                State::Closed => StateTransition::Close,
                State::Open => StateTransition::Reopen,
            });
        }
        if crate::model::opt_str(&baseline.state_reason)
            != crate::model::opt_str(&local.state_reason)
        {
            change.state_reason = Some(crate::model::opt_str(&local.state_reason).to_string());
        }
        change
    }

    /// True if the change carries a batchable field edit (title, body,
    /// milestone, labels, assignees). State transitions and
    /// relationship/type/project updates are issued separately.
    #[must_use]
    pub fn has_edits(&self) -> bool {
        self.title.is_some()
            || self.body.is_some()
            || self.milestone.is_some()
            || !self.add_labels.is_empty()
            || !self.remove_labels.is_empty()
            || !self.add_assignees.is_empty()
            || !self.remove_assignees.is_empty()
    }
}

/// One record's slice of a batched field edit. Labels and assignees carry
/// the final set, not add/remove pairs; `Some(vec![])` clears the set.
#[derive(Debug, Clone, Default)]
pub struct BatchIssueUpdate {
    pub id: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub milestone: Option<String>,
    pub labels: Option<Vec<String>>,
    pub assignees: Option<Vec<String>>,
}

/// Result of a batched edit: per-id failures that did not fail the batch.
#[derive(Debug, Clone, Default)]
pub struct BatchUpdateResult {
    pub errors: HashMap<String, String>,
}

/// Operations required of the remote issue service.
pub trait RemoteService: Send + Sync {
    /// List issues by state/label/since, relationships included.
    fn list_issues(&self, cancel: &CancelToken, opts: &ListOptions) -> Result<Vec<Issue>>;

    /// Fetch one issue, relationships included.
    fn get_issue(&self, cancel: &CancelToken, id: &str) -> Result<Issue>;

    /// Fetch many issues keyed by id. Missing ids are absent from the map.
    fn get_issues_batch(
        &self,
        cancel: &CancelToken,
        ids: &[String],
    ) -> Result<HashMap<String, Issue>>;

    /// Create an issue (title, body, labels, assignees, milestone) and
    /// return its permanent id.
    fn create_issue(&self, cancel: &CancelToken, issue: &Issue) -> Result<String>;

    /// Apply batched field edits in one remote call.
    fn edit_issues_batch(
        &self,
        cancel: &CancelToken,
        updates: &[BatchIssueUpdate],
    ) -> Result<BatchUpdateResult>;

    fn close_issue(&self, cancel: &CancelToken, id: &str, reason: Option<&str>) -> Result<()>;

    fn reopen_issue(&self, cancel: &CancelToken, id: &str) -> Result<()>;

    fn list_labels(&self, cancel: &CancelToken) -> Result<Vec<Label>>;

    fn create_label(&self, cancel: &CancelToken, name: &str, color: &str) -> Result<()>;

    fn list_milestones(&self, cancel: &CancelToken) -> Result<Vec<Milestone>>;

    fn create_milestone(&self, cancel: &CancelToken, title: &str) -> Result<()>;

    fn list_issue_types(&self, cancel: &CancelToken) -> Result<Vec<IssueTypeInfo>>;

    /// Set or clear (empty `type_id`) an issue's type.
    fn set_issue_type(&self, cancel: &CancelToken, id: &str, type_id: &str) -> Result<()>;

    fn list_projects(&self, cancel: &CancelToken) -> Result<Vec<ProjectInfo>>;

    /// Reconcile project membership to `desired`, resolving titles through
    /// `known` (lowercase title to project id).
    fn sync_projects(
        &self,
        cancel: &CancelToken,
        id: &str,
        desired: &[String],
        known: &HashMap<String, String>,
    ) -> Result<()>;

    /// Reconcile parent and blocked-by relationships to the local record.
    fn sync_relationships(&self, cancel: &CancelToken, id: &str, local: &Issue) -> Result<()>;

    fn create_comment(&self, cancel: &CancelToken, id: &str, body: &str) -> Result<()>;
}
