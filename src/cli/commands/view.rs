//! View command. Read-only; takes no lock.

use crate::cli::ViewArgs;
use crate::error::Result;
use crate::store::{self, document, IssueFile, Location};
use std::fs;
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, args: &ViewArgs) -> Result<()> {
    let (paths, _config) = super::workspace(root)?;
    let file = find_by_reference(&paths, &args.reference)?;

    if args.raw {
        print!("{}", fs::read_to_string(&file.path)?);
        return Ok(());
    }

    let issue = &file.issue;
    println!("title:\t{}", issue.title);
    let mut state = issue.state.to_string().to_uppercase();
    if let Some(reason) = issue.state_reason.as_deref().filter(|r| !r.is_empty()) {
        state = format!("{state} ({reason})");
    }
    println!("state:\t{state}");
    println!("id:\t{}", issue.id);
    if !issue.labels.is_empty() {
        println!("labels:\t{}", issue.labels.join(", "));
    }
    if !issue.assignees.is_empty() {
        println!("assignees:\t{}", issue.assignees.join(", "));
    }
    if !issue.milestone.is_empty() {
        println!("milestone:\t{}", issue.milestone);
    }
    if !issue.issue_type.is_empty() {
        println!("type:\t{}", issue.issue_type);
    }
    if let Some(parent) = &issue.parent {
        println!("parent:\t#{parent}");
    }
    if !issue.blocked_by.is_empty() {
        let refs: Vec<String> = issue.blocked_by.iter().map(|r| format!("#{r}")).collect();
        println!("blocked_by:\t{}", refs.join(", "));
    }
    if !issue.blocks.is_empty() {
        let refs: Vec<String> = issue.blocks.iter().map(|r| format!("#{r}")).collect();
        println!("blocks:\t{}", refs.join(", "));
    }
    if let Some(synced) = issue.synced_at {
        println!("synced:\t{}", synced.to_rfc3339());
    }
    println!("--");
    if !issue.body.trim().is_empty() {
        print!("{}", issue.body);
    }

    if let Some(comment) = store::find_pending_comment(&paths, &issue.id) {
        println!();
        println!("--- Pending comment ---");
        print!("{}", comment.body);
    }
    Ok(())
}

/// Find an issue by id or by file path.
fn find_by_reference(paths: &store::Paths, reference: &str) -> Result<IssueFile> {
    let reference = reference.trim();
    if reference.ends_with(".md") || reference.contains('/') {
        let mut path = PathBuf::from(reference);
        if path.is_relative() {
            path = paths.root.join(path);
        }
        let mut issue = document::parse_file(&path)?;
        let location = if path.starts_with(&paths.closed_dir) {
            Location::Closed
        } else {
            Location::Open
        };
        issue.state = location.state();
        return Ok(IssueFile {
            issue,
            path,
            location,
        });
    }
    store::find_issue(paths, reference)
}
