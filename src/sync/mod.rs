//! Synchronization orchestrator: the pull and push state machines, id
//! promotion and outcome reporting.

pub mod promote;
pub mod pull;
pub mod push;
pub mod report;

pub use pull::{pull, PullOptions};
pub use push::{push, PushOptions};
pub use report::{OutcomeKind, RecordOutcome, SyncReport};

use crate::error::{MirrorError, Result};
use crate::store::{IssueFile, Paths};
use std::path::Path;

/// Restrict a loaded corpus to the records named by command arguments.
///
/// Arguments may be ids (`42`, `T3ab`) or paths (anything ending in `.md`
/// or containing a separator). With no arguments the whole corpus is in
/// scope. Naming arguments that match nothing is an error.
pub fn filter_issues_by_args(
    paths: &Paths,
    issues: Vec<IssueFile>,
    args: &[String],
) -> Result<Vec<IssueFile>> {
    if args.is_empty() {
        return Ok(issues);
    }

    let mut ids_wanted: Vec<&str> = Vec::new();
    let mut paths_wanted: Vec<String> = Vec::new();
    for arg in args {
        let arg = arg.trim();
        if arg.is_empty() {
            continue;
        }
        if arg.ends_with(".md") || arg.contains('/') {
            let cleaned = Path::new(arg);
            paths_wanted.push(cleaned.to_string_lossy().into_owned());
            if cleaned.is_relative() {
                paths_wanted.push(paths.root.join(cleaned).to_string_lossy().into_owned());
            }
        } else {
            ids_wanted.push(arg);
        }
    }

    let filtered: Vec<IssueFile> = issues
        .into_iter()
        .filter(|item| {
            if ids_wanted.contains(&item.issue.id.as_str()) {
                return true;
            }
            let full = item.path.to_string_lossy();
            let rel = paths.rel(&item.path);
            paths_wanted.iter().any(|p| p == &*full || p == &rel)
        })
        .collect();

    if filtered.is_empty() {
        return Err(MirrorError::NoMatches {
            args: args.join(", "),
        });
    }
    Ok(filtered)
}
