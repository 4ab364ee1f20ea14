//! Field-level change tracking and three-way merge.
//!
//! These primitives underpin the sync orchestrator: `compute_changes`
//! produces a [`FieldSet`] mask of differing fields, and `three_way_merge`
//! combines independent local and remote edits against a common base,
//! refusing to guess when the same field changed on both sides.

use crate::model::{opt_ref, Issue};

/// Boolean mask with one flag per comparable field.
///
/// `synced_at` and the read-only provenance fields are deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSet {
    pub title: bool,
    pub labels: bool,
    pub assignees: bool,
    pub milestone: bool,
    pub issue_type: bool,
    pub projects: bool,
    pub state: bool,
    pub parent: bool,
    pub blocked_by: bool,
    pub blocks: bool,
    pub body: bool,
}

impl FieldSet {
    /// Names of the set fields, in canonical order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        for (flag, name) in [
            (self.title, "title"),
            (self.labels, "labels"),
            (self.assignees, "assignees"),
            (self.milestone, "milestone"),
            (self.issue_type, "issue_type"),
            (self.projects, "projects"),
            (self.state, "state"),
            (self.parent, "parent"),
            (self.blocked_by, "blocked_by"),
            (self.blocks, "blocks"),
            (self.body, "body"),
        ] {
            if flag {
                fields.push(name);
            }
        }
        fields
    }

    /// True if no flag is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.title
            || self.labels
            || self.assignees
            || self.milestone
            || self.issue_type
            || self.projects
            || self.state
            || self.parent
            || self.blocked_by
            || self.blocks
            || self.body)
    }

    /// Fields set in both masks.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> Self {
        Self {
            title: self.title && other.title,
            labels: self.labels && other.labels,
            assignees: self.assignees && other.assignees,
            milestone: self.milestone && other.milestone,
            issue_type: self.issue_type && other.issue_type,
            projects: self.projects && other.projects,
            state: self.state && other.state,
            parent: self.parent && other.parent,
            blocked_by: self.blocked_by && other.blocked_by,
            blocks: self.blocks && other.blocks,
            body: self.body && other.body,
        }
    }
}

/// Which fields of `changed` differ from `base`, after normalizing both.
#[must_use]
pub fn compute_changes(base: &Issue, changed: &Issue) -> FieldSet {
    let base = base.normalized();
    let changed = changed.normalized();

    FieldSet {
        title: base.title != changed.title,
        labels: base.labels != changed.labels,
        assignees: base.assignees != changed.assignees,
        milestone: base.milestone != changed.milestone,
        issue_type: base.issue_type != changed.issue_type,
        projects: base.projects != changed.projects,
        state: base.state != changed.state,
        parent: opt_ref(&base.parent) != opt_ref(&changed.parent),
        blocked_by: base.blocked_by != changed.blocked_by,
        blocks: base.blocks != changed.blocks,
        body: base.body != changed.body,
    }
}

/// Outcome of a three-way merge attempt.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merged issue. Only meaningful when `ok` is true.
    pub merged: Issue,
    /// True if the merge succeeded without conflicts.
    pub ok: bool,
    /// Fields changed on both sides (the reason for failure when `ok` is false).
    pub conflicting_fields: FieldSet,
    /// Fields changed locally relative to the base.
    pub local_changes: FieldSet,
    /// Fields changed remotely relative to the base.
    pub remote_changes: FieldSet,
}

/// Merge independent local and remote edits against a common base.
///
/// If the local and remote change sets share no field, the result starts
/// from the remote record and overlays every locally changed field, so
/// untouched fields track the remote baseline. If any field changed on both
/// sides, the merge fails and reports exactly that intersection.
#[must_use]
pub fn three_way_merge(base: &Issue, local: &Issue, remote: &Issue) -> MergeOutcome {
    let local_changes = compute_changes(base, local);
    let remote_changes = compute_changes(base, remote);
    let conflicts = local_changes.overlaps(&remote_changes);

    if !conflicts.is_empty() {
        return MergeOutcome {
            merged: Issue::default(),
            ok: false,
            conflicting_fields: conflicts,
            local_changes,
            remote_changes,
        };
    }

    let mut merged = remote.normalized();
    let local = local.normalized();

    if local_changes.title {
        merged.title = local.title.clone();
    }
    if local_changes.labels {
        merged.labels = local.labels.clone();
    }
    if local_changes.assignees {
        merged.assignees = local.assignees.clone();
    }
    if local_changes.milestone {
        merged.milestone = local.milestone.clone();
    }
    if local_changes.issue_type {
        merged.issue_type = local.issue_type.clone();
    }
    if local_changes.projects {
        merged.projects = local.projects.clone();
    }
    if local_changes.state {
        merged.state = local.state;
    }
    if local_changes.parent {
        merged.parent = local.parent.clone();
    }
    if local_changes.blocked_by {
        merged.blocked_by = local.blocked_by.clone();
    }
    if local_changes.blocks {
        merged.blocks = local.blocks.clone();
    }
    if local_changes.body {
        merged.body = local.body.clone();
    }

    MergeOutcome {
        merged,
        ok: true,
        conflicting_fields: FieldSet::default(),
        local_changes,
        remote_changes,
    }
}

/// Elements added to and removed from a set-valued field, both sorted.
#[must_use]
pub fn diff_string_set(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let mut added: Vec<String> = new
        .iter()
        .filter(|item| !old.contains(item))
        .cloned()
        .collect();
    let mut removed: Vec<String> = old
        .iter()
        .filter(|item| !new.contains(item))
        .cloned()
        .collect();
    added.sort();
    removed.sort();
    (added, removed)
}
