//! Status command: local changes relative to the snapshots, plus the last
//! full pull time. Read-only; takes no lock.

use crate::error::Result;
use crate::model::eq_ignoring_synced_at;
use crate::store;
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>) -> Result<()> {
    let (paths, config) = super::workspace(root)?;

    println!("Repository: {}", config.repo_slug());
    match config.sync.last_full_pull {
        Some(when) => println!("Last full pull: {}", when.to_rfc3339()),
        None => println!("Last full pull: never"),
    }
    println!();

    let local_issues = store::load_local_issues(&paths)?;
    let mut modified = Vec::new();
    let mut new_local = Vec::new();
    let mut state_changes = Vec::new();

    for item in &local_issues {
        if item.issue.id.is_local() {
            new_local.push(paths.rel(&item.path));
            continue;
        }
        match store::read_original(&paths, item.issue.id.as_str()) {
            None => modified.push(paths.rel(&item.path)),
            Some(original) => {
                if !eq_ignoring_synced_at(&item.issue, &original) {
                    modified.push(paths.rel(&item.path));
                }
                if item.issue.state != original.state {
                    state_changes.push(paths.rel(&item.path));
                }
            }
        }
    }

    if !modified.is_empty() {
        modified.sort();
        println!("Modified locally:");
        for path in &modified {
            println!("  M {path}");
        }
        println!();
    }
    if !new_local.is_empty() {
        new_local.sort();
        println!("New local issues:");
        for path in &new_local {
            println!("  A {path}");
        }
        println!();
    }
    if !state_changes.is_empty() {
        state_changes.sort();
        println!("State changes:");
        for path in &state_changes {
            println!("  -> {path}");
        }
        println!();
    }

    let pending = store::load_pending_comments(&paths)?;
    if !pending.is_empty() {
        println!("Pending comments:");
        for comment in &pending {
            println!("  C {}", comment.id);
        }
        println!();
    }

    if modified.is_empty() && new_local.is_empty() && state_changes.is_empty() && pending.is_empty()
    {
        println!("Nothing to push");
    }
    Ok(())
}
