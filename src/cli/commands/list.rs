//! List command. Read-only; takes no lock.

use crate::cli::ListArgs;
use crate::error::Result;
use crate::model::eq_ignoring_synced_at;
use crate::store::{self, IssueFile};
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, args: &ListArgs) -> Result<()> {
    let (paths, _config) = super::workspace(root)?;
    let local_issues = store::load_local_issues(&paths)?;

    let mut filtered: Vec<IssueFile> = local_issues
        .into_iter()
        .filter(|item| keep(&paths, item, args))
        .collect();

    // Remote issues first, then local, each sorted by id.
    filtered.sort_by(|a, b| {
        let a_local = a.issue.id.is_local();
        let b_local = b.issue.id.is_local();
        a_local.cmp(&b_local).then_with(|| a.issue.id.cmp(&b.issue.id))
    });

    if filtered.is_empty() {
        println!("No issues found");
        return Ok(());
    }

    for item in &filtered {
        print_line(&item.issue);
    }
    Ok(())
}

fn keep(paths: &store::Paths, item: &IssueFile, args: &ListArgs) -> bool {
    let state = item.location.state().to_string();
    if let Some(wanted) = &args.state {
        if !state.eq_ignore_ascii_case(wanted) {
            return false;
        }
    } else if !args.all && state != "open" {
        return false;
    }

    if args.local && !item.issue.id.is_local() {
        return false;
    }

    if args.modified && !item.issue.id.is_local() {
        if let Some(original) = store::read_original(paths, item.issue.id.as_str()) {
            if eq_ignoring_synced_at(&item.issue, &original) {
                return false;
            }
        }
    }

    if !args.label.is_empty() {
        let has_label = args.label.iter().any(|wanted| {
            item.issue
                .labels
                .iter()
                .any(|have| have.eq_ignore_ascii_case(wanted))
        });
        if !has_label {
            return false;
        }
    }

    if let Some(assignee) = &args.assignee {
        let has_assignee = item
            .issue
            .assignees
            .iter()
            .any(|have| have.eq_ignore_ascii_case(assignee));
        if !has_assignee {
            return false;
        }
    }

    true
}

fn print_line(issue: &crate::model::Issue) {
    let id = if issue.id.is_local() {
        issue.id.to_string()
    } else {
        format!("#{}", issue.id)
    };

    let mut title = issue.title.clone();
    const MAX_TITLE: usize = 50;
    if title.chars().count() > MAX_TITLE {
        title = title.chars().take(MAX_TITLE - 3).collect::<String>() + "...";
    }

    let mut line = format!("{id:<6}  {title:<50}");
    if !issue.labels.is_empty() {
        line.push_str(&format!("  [{}]", issue.labels.join(", ")));
    }
    if !issue.assignees.is_empty() {
        let assignees: Vec<String> = issue.assignees.iter().map(|a| format!("@{a}")).collect();
        line.push_str(&format!("  {}", assignees.join(", ")));
    }
    println!("{}", line.trim_end());
}
