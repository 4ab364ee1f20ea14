//! Core data types for `issuemirror`.
//!
//! This module defines the record model shared by every component:
//! - `Issue` - the mirrored work item
//! - `IssueId` / `IssueRef` - permanent and temporary identifiers
//! - `State` - open/closed lifecycle state
//! - normalization and the two canonical equality modes

pub mod diff;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Prefix that marks a locally generated, not-yet-created identifier.
pub const LOCAL_ID_PREFIX: &str = "T";

/// Identifier of an issue.
///
/// Permanent ids are opaque tokens assigned by the remote service (decimal
/// numbers in practice). Temporary ids start with [`LOCAL_ID_PREFIX`] and are
/// replaced exactly once during promotion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct IssueId(String);

impl IssueId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this is a temporary, locally generated id.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IssueId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for IssueId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Reference to another issue, held in `parent` / `blocked_by` / `blocks`.
///
/// Resolves exactly like [`IssueId`]: permanent references are opaque remote
/// tokens, temporary references carry the local prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IssueRef(String);

impl IssueRef {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this reference points at a temporary id.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IssueRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for IssueRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&IssueId> for IssueRef {
    fn from(value: &IssueId) -> Self {
        Self(value.0.clone())
    }
}

// Numeric references render as plain YAML integers so the metadata block
// reads `parent: 42` rather than `parent: "42"`; local references stay
// strings. Parsing accepts both scalar forms.
impl Serialize for IssueRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if let Ok(n) = self.0.parse::<u64>() {
            serializer.serialize_u64(n)
        } else {
            serializer.serialize_str(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for IssueRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RefVisitor;

        impl Visitor<'_> for RefVisitor {
            type Value = IssueRef;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an issue reference (number or string)")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<IssueRef, E> {
                Ok(IssueRef::new(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<IssueRef, E> {
                Ok(IssueRef::new(value.to_string()))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<IssueRef, E> {
                Ok(IssueRef::new(value.to_string()))
            }
        }

        deserializer.deserialize_any(RefVisitor)
    }
}

/// Issue lifecycle state. Each state maps to one mirror container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Open,
    Closed,
}

impl State {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = crate::error::MirrorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(crate::error::MirrorError::validation(
                "state",
                format!("expected 'open' or 'closed', got '{other}'"),
            )),
        }
    }
}

/// The mirrored issue record.
///
/// The id is never stored inside the metadata block; it derives from the
/// filename. Provenance fields (`author`, `created_at`, `updated_at`) come
/// from the remote side only and are never written back.
#[derive(Debug, Clone, Default)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub milestone: String,
    pub issue_type: String,
    pub projects: Vec<String>,
    pub state: State,
    pub state_reason: Option<String>,
    pub parent: Option<IssueRef>,
    pub blocked_by: Vec<IssueRef>,
    pub blocks: Vec<IssueRef>,
    /// Timestamp of the last successful reconciliation. Excluded from all
    /// equality and diff comparisons.
    pub synced_at: Option<DateTime<Utc>>,
    pub body: String,

    pub author: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,

    /// Unrecognized metadata keys, preserved verbatim across rewrites.
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Issue {
    /// Return a normalized copy: set fields sorted and deduplicated, body
    /// whitespace canonicalized. Applied before every comparison.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut issue = self.clone();
        issue.labels = sorted_strings(&issue.labels);
        issue.assignees = sorted_strings(&issue.assignees);
        issue.projects = sorted_strings(&issue.projects);
        issue.blocked_by = sorted_refs(&issue.blocked_by);
        issue.blocks = sorted_refs(&issue.blocks);
        issue.body = normalize_body(&issue.body);
        issue
    }
}

/// Strict equality: every field except `synced_at`.
///
/// Used to decide whether a mirror file matches its snapshot or a freshly
/// fetched remote record. Both operands are normalized first.
#[must_use]
pub fn eq_ignoring_synced_at(a: &Issue, b: &Issue) -> bool {
    eq_issues(a, b, false)
}

/// Conflict-check equality: ignores `synced_at` and `state_reason`.
///
/// The remote service may auto-populate the state reason as a side effect of
/// a state transition; that must not read as a human edit when comparing the
/// current remote state against the last snapshot before a push.
#[must_use]
pub fn eq_for_conflict_check(a: &Issue, b: &Issue) -> bool {
    eq_issues(a, b, true)
}

fn eq_issues(a: &Issue, b: &Issue, ignore_state_reason: bool) -> bool {
    let a = a.normalized();
    let b = b.normalized();

    a.id == b.id
        && a.title == b.title
        && a.labels == b.labels
        && a.assignees == b.assignees
        && a.milestone == b.milestone
        && a.issue_type == b.issue_type
        && a.projects == b.projects
        && a.state == b.state
        && (ignore_state_reason || opt_str(&a.state_reason) == opt_str(&b.state_reason))
        && opt_ref(&a.parent) == opt_ref(&b.parent)
        && a.blocked_by == b.blocked_by
        && a.blocks == b.blocks
        && a.body == b.body
}

pub(crate) fn opt_str(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

pub(crate) fn opt_ref(value: &Option<IssueRef>) -> &str {
    value.as_ref().map_or("", IssueRef::as_str)
}

/// Canonicalize body text: CRLF to LF, leading blank lines trimmed, exactly
/// one trailing newline. Empty bodies stay empty.
#[must_use]
pub fn normalize_body(body: &str) -> String {
    let body = body.replace("\r\n", "\n");
    let body = body.trim_start_matches('\n');
    if body.is_empty() {
        return String::new();
    }
    if body.ends_with('\n') {
        body.to_string()
    } else {
        format!("{body}\n")
    }
}

/// Trim, drop empties, deduplicate and sort a set-valued string field.
#[must_use]
pub fn sorted_strings(items: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if item.is_empty() || cleaned.iter().any(|seen| seen == item) {
            continue;
        }
        cleaned.push(item.to_string());
    }
    cleaned.sort();
    cleaned
}

fn sorted_refs(items: &[IssueRef]) -> Vec<IssueRef> {
    let mut cleaned: Vec<IssueRef> = Vec::with_capacity(items.len());
    for item in items {
        let key = item.as_str().trim();
        if key.is_empty() || cleaned.iter().any(|seen| seen.as_str() == key) {
            continue;
        }
        cleaned.push(IssueRef::new(key));
    }
    cleaned.sort();
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Issue {
        Issue {
            id: IssueId::new("42"),
            title: "Fix the widget".to_string(),
            labels: vec!["bug".to_string(), "urgent".to_string()],
            state: State::Open,
            body: "Details.\n".to_string(),
            ..Issue::default()
        }
    }

    #[test]
    fn local_id_detection() {
        assert!(IssueId::new("Tab12cd").is_local());
        assert!(!IssueId::new("42").is_local());
        assert!(IssueRef::new("T9").is_local());
        assert!(!IssueRef::new("7").is_local());
    }

    #[test]
    fn state_round_trip() {
        assert_eq!("open".parse::<State>().unwrap(), State::Open);
        assert_eq!("CLOSED".parse::<State>().unwrap(), State::Closed);
        assert!("pending".parse::<State>().is_err());
        assert_eq!(State::Closed.to_string(), "closed");
    }

    #[test]
    fn issue_ref_yaml_forms() {
        let numeric: IssueRef = serde_yaml::from_str("42").unwrap();
        assert_eq!(numeric.as_str(), "42");
        let local: IssueRef = serde_yaml::from_str("T1x").unwrap();
        assert_eq!(local.as_str(), "T1x");

        assert_eq!(serde_yaml::to_string(&numeric).unwrap().trim(), "42");
        assert_eq!(serde_yaml::to_string(&local).unwrap().trim(), "T1x");
    }

    #[test]
    fn normalize_body_rules() {
        assert_eq!(normalize_body("a\r\nb"), "a\nb\n");
        assert_eq!(normalize_body("\n\ntext"), "text\n");
        assert_eq!(normalize_body("text\n"), "text\n");
        assert_eq!(normalize_body(""), "");
        assert_eq!(normalize_body("\n\n"), "");
    }

    #[test]
    fn sorted_strings_dedups_and_sorts() {
        let input = vec![
            " b ".to_string(),
            "a".to_string(),
            "b".to_string(),
            String::new(),
        ];
        assert_eq!(sorted_strings(&input), vec!["a", "b"]);
    }

    #[test]
    fn normalized_sorts_sets() {
        let mut issue = sample();
        issue.labels = vec!["urgent".to_string(), "bug".to_string(), "bug".to_string()];
        issue.blocked_by = vec![IssueRef::new("9"), IssueRef::new("3")];
        let norm = issue.normalized();
        assert_eq!(norm.labels, vec!["bug", "urgent"]);
        assert_eq!(norm.blocked_by, vec![IssueRef::new("3"), IssueRef::new("9")]);
    }

    #[test]
    fn strict_equality_ignores_synced_at_only() {
        let a = sample();
        let mut b = sample();
        b.synced_at = Some(Utc::now());
        assert!(eq_ignoring_synced_at(&a, &b));

        b.state_reason = Some("completed".to_string());
        assert!(!eq_ignoring_synced_at(&a, &b));
    }

    #[test]
    fn conflict_check_ignores_state_reason() {
        let a = sample();
        let mut b = sample();
        b.state_reason = Some("completed".to_string());
        assert!(eq_for_conflict_check(&a, &b));

        b.title = "Other".to_string();
        assert!(!eq_for_conflict_check(&a, &b));
    }

    #[test]
    fn equality_normalizes_first() {
        let a = sample();
        let mut b = sample();
        b.labels = vec!["urgent".to_string(), "bug".to_string()];
        b.body = "Details.".to_string();
        assert!(eq_ignoring_synced_at(&a, &b));
    }
}
