//! Temporary-to-permanent id promotion and corpus-wide reference rewriting.
//!
//! After a batch of remote creations, every temporary id maps to the
//! permanent id it was assigned. One pass over the whole corpus rewrites
//! every reference site: delimited `#T…` tokens in titles and bodies, and
//! the structured `parent` / `blocked_by` / `blocks` fields. The pass uses
//! the complete mapping, so temporary ids created in one invocation resolve
//! correctly even when they reference each other.

use crate::model::{Issue, IssueId, IssueRef};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Delimited reference to a temporary id inside free text, e.g. `#T1x9ab`.
static LOCAL_REF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#(T[a-zA-Z0-9]+)").expect("local ref pattern is valid"));

/// Mapping from temporary to permanent ids for one push invocation.
#[derive(Debug, Clone, Default)]
pub struct PromotionMap {
    map: HashMap<String, String>,
}

impl PromotionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, temporary: &IssueId, permanent: impl Into<String>) {
        self.map.insert(temporary.to_string(), permanent.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[must_use]
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(String::as_str)
    }

    /// Resolve an argument that may name a temporary id.
    #[must_use]
    pub fn resolve_arg(&self, arg: &str) -> String {
        self.resolve(arg).map_or_else(|| arg.to_string(), ToString::to_string)
    }

    /// Rewrite every reference to a promoted id inside one record.
    ///
    /// Returns true if anything changed. The record's own id is not
    /// touched; renaming the created record is the caller's job.
    pub fn apply(&self, issue: &mut Issue) -> bool {
        let mut changed = false;

        let title = self.rewrite_text(&issue.title, &mut changed);
        issue.title = title;
        let body = self.rewrite_text(&issue.body, &mut changed);
        issue.body = body;

        if let Some(parent) = &issue.parent {
            if let Some(permanent) = self.resolve(parent.as_str()) {
                issue.parent = Some(IssueRef::new(permanent));
                changed = true;
            }
        }
        changed |= self.rewrite_refs(&mut issue.blocked_by);
        changed |= self.rewrite_refs(&mut issue.blocks);

        changed
    }

    fn rewrite_text(&self, text: &str, changed: &mut bool) -> String {
        let replaced = LOCAL_REF_PATTERN.replace_all(text, |caps: &regex::Captures<'_>| {
            self.resolve(&caps[1]).map_or_else(
                || caps[0].to_string(),
                |permanent| format!("#{permanent}"),
            )
        });
        if replaced != text {
            *changed = true;
        }
        replaced.into_owned()
    }

    fn rewrite_refs(&self, refs: &mut [IssueRef]) -> bool {
        let mut changed = false;
        for item in refs.iter_mut() {
            if let Some(permanent) = self.resolve(item.as_str()) {
                *item = IssueRef::new(permanent);
                changed = true;
            }
        }
        changed
    }
}
