//! Diff command: what changed in a local issue compared to the snapshot,
//! or to the current remote state with `--remote`. Read-only; takes no
//! lock.

use crate::cli::DiffArgs;
use crate::error::{MirrorError, Result};
use crate::model::{eq_ignoring_synced_at, Issue};
use crate::remote::{CancelToken, RemoteService};
use crate::store;
use crate::sync::report::change_lines;
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, args: &DiffArgs) -> Result<()> {
    let (paths, config) = super::workspace(root)?;

    match &args.id {
        Some(id) => {
            let file = store::find_issue(&paths, id)?;
            diff_one(&paths, &config, &file.issue, args.remote)
        }
        None => {
            // No id: diff every record that drifted from its snapshot.
            let mut any = false;
            for item in store::load_local_issues(&paths)? {
                if item.issue.id.is_local() {
                    continue;
                }
                let Some(original) = store::read_original(&paths, item.issue.id.as_str()) else {
                    continue;
                };
                if eq_ignoring_synced_at(&item.issue, &original) {
                    continue;
                }
                any = true;
                diff_one(&paths, &config, &item.issue, false)?;
                println!();
            }
            if !any {
                println!("No local changes");
            }
            Ok(())
        }
    }
}

fn diff_one(
    paths: &store::Paths,
    config: &crate::config::Config,
    local: &Issue,
    against_remote: bool,
) -> Result<()> {
    let (base, base_label) = if against_remote {
        if local.id.is_local() {
            return Err(MirrorError::validation(
                "id",
                format!("cannot diff local issue {} against remote (not yet pushed)", local.id),
            ));
        }
        let client = super::client(config);
        let cancel = CancelToken::new();
        (client.get_issue(&cancel, local.id.as_str())?, "remote")
    } else {
        let original = store::read_original(paths, local.id.as_str()).ok_or_else(|| {
            MirrorError::validation(
                "id",
                format!("no snapshot found for issue {} (try pulling first)", local.id),
            )
        })?;
        (original, "snapshot")
    };

    if eq_ignoring_synced_at(&base, local) {
        println!("No differences between local and {base_label}");
        return Ok(());
    }

    println!("Diff for #{} (local vs {base_label})", local.id);
    println!();
    for line in change_lines(&base, local) {
        println!("{line}");
    }

    let base_norm = base.normalized();
    let local_norm = local.normalized();
    if base_norm.body != local_norm.body {
        println!();
        println!("Body:");
        print_unified_diff(&base_norm.body, &local_norm.body, base_label, "local");
    }
    Ok(())
}

fn print_unified_diff(old_text: &str, new_text: &str, old_label: &str, new_label: &str) {
    let old_lines = split_lines(old_text);
    let new_lines = split_lines(new_text);
    println!("--- {old_label}");
    println!("+++ {new_label}");
    for op in compute_diff(&old_lines, &new_lines) {
        match op {
            DiffOp::Equal(line) => println!(" {line}"),
            DiffOp::Delete(line) => println!("-{line}"),
            DiffOp::Insert(line) => println!("+{line}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum DiffOp<'a> {
    Equal(&'a str),
    Delete(&'a str),
    Insert(&'a str),
}

fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.trim_end_matches('\n').split('\n').collect()
}

/// Line-based diff via the longest common subsequence.
fn compute_diff<'a>(old_lines: &[&'a str], new_lines: &[&'a str]) -> Vec<DiffOp<'a>> {
    let m = old_lines.len();
    let n = new_lines.len();
    let mut lcs = vec![vec![0usize; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            lcs[i][j] = if old_lines[i - 1] == new_lines[j - 1] {
                lcs[i - 1][j - 1] + 1
            } else {
                lcs[i - 1][j].max(lcs[i][j - 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (m, n);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old_lines[i - 1] == new_lines[j - 1] {
            ops.push(DiffOp::Equal(old_lines[i - 1]));
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || lcs[i][j - 1] >= lcs[i - 1][j]) {
            ops.push(DiffOp::Insert(new_lines[j - 1]));
            j -= 1;
        } else {
            ops.push(DiffOp::Delete(old_lines[i - 1]));
            i -= 1;
        }
    }
    ops.reverse();
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_detects_changed_line() {
        let old = split_lines("a\nb\nc\n");
        let new = split_lines("a\nx\nc\n");
        let ops = compute_diff(&old, &new);
        assert!(ops.contains(&DiffOp::Delete("b")));
        assert!(ops.contains(&DiffOp::Insert("x")));
        assert_eq!(
            ops.iter()
                .filter(|op| matches!(op, DiffOp::Equal(_)))
                .count(),
            2
        );
    }

    #[test]
    fn diff_of_identical_texts_is_all_equal() {
        let lines = split_lines("one\ntwo\n");
        let ops = compute_diff(&lines, &lines);
        assert!(ops.iter().all(|op| matches!(op, DiffOp::Equal(_))));
    }

    #[test]
    fn diff_handles_empty_sides() {
        let ops = compute_diff(&[], &split_lines("new\n"));
        assert_eq!(ops, vec![DiffOp::Insert("new")]);
        let ops = compute_diff(&split_lines("gone\n"), &[]);
        assert_eq!(ops, vec![DiffOp::Delete("gone")]);
    }
}
