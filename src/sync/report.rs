//! Per-record reconciliation outcomes and the human-readable change
//! summaries attached to them.
//!
//! Reconciliation commands print one line per affected record and continue
//! past per-record failures; conflicts are collected and summarized, never
//! fatal.

use crate::model::{diff::compute_changes, opt_str, Issue, IssueId};

/// What happened to one record during a pull or push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// No prior local copy existed (pull) or the record was just created
    /// remotely (push).
    Added,
    /// An existing record was written with new content.
    Updated,
    /// A snapshot without a local file was re-materialized from the remote.
    Restored,
    /// Only cross-references to a promoted id changed.
    ReferenceUpdated,
}

impl OutcomeKind {
    /// One-letter marker used in the per-record output line.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Added => "A",
            Self::Updated => "U",
            Self::Restored => "R",
            Self::ReferenceUpdated => "*",
        }
    }
}

/// One reported record.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub kind: OutcomeKind,
    pub id: IssueId,
    pub title: String,
    /// Per-field change lines, already formatted for display.
    pub changes: Vec<String>,
}

impl RecordOutcome {
    #[must_use]
    pub fn new(kind: OutcomeKind, id: IssueId, title: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            title: title.into(),
            changes: Vec::new(),
        }
    }

    /// Header line: marker, id (permanent ids carry `#`), title.
    #[must_use]
    pub fn header(&self) -> String {
        let id = if self.id.is_local() {
            self.id.to_string()
        } else {
            format!("#{}", self.id)
        };
        format!("{} {id} {}", self.kind.marker(), self.title)
    }
}

/// Accumulated result of one reconciliation command.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub records: Vec<RecordOutcome>,
    /// Ids skipped because local and remote both diverged from the snapshot.
    pub conflicts: Vec<IssueId>,
    /// Records classified unchanged (no write performed).
    pub unchanged: usize,
    /// Informational notes (created catalog entries, posted comments).
    pub notes: Vec<String>,
    /// Best-effort failures that did not abort the command.
    pub warnings: Vec<String>,
}

impl SyncReport {
    pub fn record(&mut self, outcome: RecordOutcome) {
        self.records.push(outcome);
    }

    pub fn conflict(&mut self, id: IssueId) {
        self.conflicts.push(id);
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// True if the command had nothing to do at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.conflicts.is_empty() && self.notes.is_empty()
    }

    /// Sorted conflict summary line, if any conflicts occurred.
    #[must_use]
    pub fn conflict_summary(&self, direction: &str) -> Option<String> {
        if self.conflicts.is_empty() {
            return None;
        }
        let mut ids: Vec<String> = self.conflicts.iter().map(ToString::to_string).collect();
        ids.sort();
        Some(format!(
            "Conflicts ({direction}, skipped): {}",
            ids.join(", ")
        ))
    }
}

/// Per-field change lines between two versions of a record.
///
/// Both operands are normalized first; `synced_at` and provenance never
/// appear.
#[must_use]
pub fn change_lines(old: &Issue, new: &Issue) -> Vec<String> {
    let old = old.normalized();
    let new = new.normalized();
    let changed = compute_changes(&old, &new);

    let mut lines = Vec::new();
    if changed.title {
        lines.push(format!("    title: {:?} -> {:?}", old.title, new.title));
    }
    if changed.body {
        lines.push(format!(
            "    body: {} -> {}",
            body_summary(&old.body),
            body_summary(&new.body)
        ));
    }
    if changed.labels {
        lines.push(set_change_line("labels", &old.labels, &new.labels));
    }
    if changed.assignees {
        lines.push(format!(
            "    assignees: {} -> {}",
            string_list(&old.assignees),
            string_list(&new.assignees)
        ));
    }
    if changed.milestone {
        lines.push(format!(
            "    milestone: {} -> {}",
            optional(&old.milestone),
            optional(&new.milestone)
        ));
    }
    if changed.issue_type {
        lines.push(format!(
            "    type: {} -> {}",
            optional(&old.issue_type),
            optional(&new.issue_type)
        ));
    }
    if changed.projects {
        lines.push(set_change_line("projects", &old.projects, &new.projects));
    }
    if changed.state {
        lines.push(format!("    state: {} -> {}", old.state, new.state));
    }
    if opt_str(&old.state_reason) != opt_str(&new.state_reason) {
        lines.push(format!(
            "    state_reason: {} -> {}",
            optional(opt_str(&old.state_reason)),
            optional(opt_str(&new.state_reason))
        ));
    }
    if changed.parent {
        lines.push(format!(
            "    parent: {} -> {}",
            optional(crate::model::opt_ref(&old.parent)),
            optional(crate::model::opt_ref(&new.parent))
        ));
    }
    if changed.blocked_by {
        lines.push(ref_change_line("blocked_by", &old.blocked_by, &new.blocked_by));
    }
    if changed.blocks {
        lines.push(ref_change_line("blocks", &old.blocks, &new.blocks));
    }
    lines
}

fn set_change_line(field: &str, old: &[String], new: &[String]) -> String {
    let (added, removed) = crate::model::diff::diff_string_set(old, new);
    let mut parts = Vec::new();
    for item in added {
        parts.push(format!("+{item}"));
    }
    for item in removed {
        parts.push(format!("-{item}"));
    }
    format!("    {field}: {}", parts.join(" "))
}

fn ref_change_line(
    field: &str,
    old: &[crate::model::IssueRef],
    new: &[crate::model::IssueRef],
) -> String {
    let old: Vec<String> = old.iter().map(ToString::to_string).collect();
    let new: Vec<String> = new.iter().map(ToString::to_string).collect();
    set_change_line(field, &old, &new)
}

fn body_summary(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        "<empty>".to_string()
    } else {
        format!("{} chars", body.len())
    }
}

fn optional(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        "<none>".to_string()
    } else {
        format!("{value:?}")
    }
}

fn string_list(items: &[String]) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    let quoted: Vec<String> = items.iter().map(|item| format!("{item:?}")).collect();
    format!("[{}]", quoted.join(", "))
}
