//! Pull: reconcile remote records into the local mirror.
//!
//! Per fetched remote record `R` with local copy `L` and snapshot `O`:
//! a locally changed record (L differs from O, or O is absent) conflicts
//! unless `--force` is given; otherwise the record is moved to the
//! container matching `R`'s state, its content and snapshot are overwritten
//! and the write is reported. A full pull additionally refreshes the
//! catalog caches and restores orphaned snapshots.

use crate::config::Config;
use crate::error::Result;
use crate::model::{eq_ignoring_synced_at, Issue, IssueId};
use crate::remote::{CancelToken, ListOptions, ListState, RemoteService};
use crate::store::{self, catalog, document, IssueFile, Location, Paths};
use crate::sync::report::{change_lines, OutcomeKind, RecordOutcome, SyncReport};
use chrono::Utc;
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;

/// Options for a pull invocation.
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Include closed records in the listing.
    pub all: bool,
    /// Overwrite locally changed records instead of reporting conflicts.
    pub force: bool,
    /// Force a full (non-incremental) listing.
    pub full: bool,
    /// Restrict the listing to these labels.
    pub labels: Vec<String>,
}

/// Run a pull. `args` scopes the operation to specific ids or paths; an
/// unscoped pull refreshes catalogs and restores orphaned snapshots.
pub fn pull(
    paths: &Paths,
    config: &mut Config,
    remote: &dyn RemoteService,
    cancel: &CancelToken,
    opts: &PullOptions,
    args: &[String],
) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let scoped = !args.is_empty();
    let local_issues = store::load_local_issues(paths)?;

    let remote_issues: Vec<Issue>;

    if scoped {
        let ids = resolve_scope_args(&local_issues, args);
        let mut fetched = Vec::with_capacity(ids.len());
        for id in ids {
            fetched.push(remote.get_issue(cancel, &id)?);
        }
        remote_issues = fetched;
    } else {
        let list_state = if opts.all { ListState::All } else { ListState::Open };
        let incremental = config.sync.last_full_pull.is_some()
            && !opts.all
            && !opts.full
            && opts.labels.is_empty();

        // Ids known locally that the open listing will not cover; a batched
        // lookup catches records closed on the remote side.
        let to_fetch: Vec<String> = if opts.all || incremental {
            Vec::new()
        } else {
            local_issues
                .iter()
                .filter(|item| !item.issue.id.is_local())
                .map(|item| item.issue.id.to_string())
                .collect()
        };

        let list_opts = ListOptions {
            // Incremental pulls list all states to catch externally closed
            // records since the last sync.
            state: Some(if incremental { ListState::All } else { list_state }),
            labels: opts.labels.clone(),
            since: if incremental {
                config.sync.last_full_pull
            } else {
                None
            },
        };

        let spinner = ProgressBar::new_spinner().with_message("fetching issues");
        spinner.enable_steady_tick(Duration::from_millis(120));

        let (list_result, batch_result) = std::thread::scope(|scope| {
            let list_handle = scope.spawn(|| remote.list_issues(cancel, &list_opts));
            let batch_handle = scope.spawn(|| {
                if to_fetch.is_empty() {
                    Ok(HashMap::new())
                } else {
                    remote.get_issues_batch(cancel, &to_fetch)
                }
            });
            (
                list_handle.join().expect("listing thread panicked"),
                batch_handle.join().expect("batch fetch thread panicked"),
            )
        });
        spinner.finish_and_clear();

        let mut listed = list_result?;

        if incremental && listed.is_empty() {
            config.sync.last_full_pull = Some(Utc::now());
            config.save(&paths.config_path)?;
            report.note("Nothing to pull: no issues updated since last sync");
            return Ok(report);
        }

        match batch_result {
            Ok(batch) => {
                let seen: Vec<String> = listed.iter().map(|i| i.id.to_string()).collect();
                for (id, issue) in batch {
                    if !seen.contains(&id) {
                        listed.push(issue);
                    }
                }
            }
            Err(err) => report.warn(format!("fetching known issues: {err}")),
        }

        remote_issues = listed;
    }

    // The mirror may have changed while fetching; reconcile against a
    // fresh load.
    let local_issues = store::load_local_issues(paths)?;
    let local_by_id: HashMap<String, IssueFile> = local_issues
        .iter()
        .map(|item| (item.issue.id.to_string(), item.clone()))
        .collect();

    let now = Utc::now();
    for mut remote_issue in remote_issues {
        remote_issue.synced_at = Some(now);

        let local = local_by_id.get(remote_issue.id.as_str());
        let original = store::read_original(paths, remote_issue.id.as_str());
        let local_changed = local.is_some_and(|item| {
            original
                .as_ref()
                .is_none_or(|orig| !eq_ignoring_synced_at(&item.issue, orig))
        });

        if local.is_some() && local_changed && !opts.force {
            report.conflict(remote_issue.id.clone());
            continue;
        }

        let target = Location::for_state(remote_issue.state);
        let new_path = document::path_for(target.dir(paths), &remote_issue.id, &remote_issue.title);
        let content_changed =
            local.is_none_or(|item| !eq_ignoring_synced_at(&item.issue, &remote_issue));
        let path_changed = local.is_some_and(|item| item.path != new_path);
        if original.is_some() && !content_changed && !path_changed {
            report.unchanged += 1;
            continue;
        }

        if let Some(item) = local {
            if path_changed {
                fs::rename(&item.path, &new_path)?;
            }
        }
        document::write_file(&new_path, &remote_issue)?;
        store::write_original(paths, &remote_issue)?;

        match local {
            None => report.record(RecordOutcome::new(
                OutcomeKind::Added,
                remote_issue.id.clone(),
                &remote_issue.title,
            )),
            Some(item) => {
                let mut outcome = RecordOutcome::new(
                    OutcomeKind::Updated,
                    remote_issue.id.clone(),
                    &remote_issue.title,
                );
                outcome.changes = change_lines(&item.issue, &remote_issue);
                if outcome.changes.is_empty() && path_changed {
                    outcome.changes.push(format!(
                        "    file: {:?} -> {:?}",
                        paths.rel(&item.path),
                        paths.rel(&new_path)
                    ));
                }
                report.record(outcome);
            }
        }
    }

    if !scoped {
        config.sync.last_full_pull = Some(now);
        config.save(&paths.config_path)?;

        let label_colors = fetch_label_colors(remote, cancel);
        if !label_colors.is_empty() {
            let cache = catalog::labels_from_color_map(&label_colors, now);
            if let Err(err) = catalog::save_labels(paths, &cache) {
                report.warn(format!("saving label cache: {err}"));
            }
        }

        refresh_catalogs(paths, remote, cancel, &mut report);
        restore_orphans(paths, remote, cancel, &mut report)?;
    }

    Ok(report)
}

/// Resolve scope arguments to remote ids: matched local records contribute
/// their (permanent) ids, and any argument that is not a path and matched
/// nothing locally is treated as a raw remote id.
fn resolve_scope_args(local_issues: &[IssueFile], args: &[String]) -> Vec<String> {
    let mut ids = Vec::new();
    for arg in args {
        let arg = arg.trim();
        if arg.is_empty() {
            continue;
        }
        if let Some(item) = local_issues.iter().find(|item| {
            item.issue.id.as_str() == arg || item.path.to_string_lossy().ends_with(arg)
        }) {
            if !item.issue.id.is_local() {
                ids.push(item.issue.id.to_string());
            }
            continue;
        }
        if arg.ends_with(".md") || arg.contains('/') {
            continue;
        }
        ids.push(arg.to_string());
    }
    ids
}

/// Refresh the milestone, issue-type and project caches concurrently.
/// Each refresh fails independently as a warning.
fn refresh_catalogs(
    paths: &Paths,
    remote: &dyn RemoteService,
    cancel: &CancelToken,
    report: &mut SyncReport,
) {
    let now = Utc::now();
    let (milestones, issue_types, projects) = std::thread::scope(|scope| {
        let milestones = scope.spawn(|| remote.list_milestones(cancel));
        let issue_types = scope.spawn(|| remote.list_issue_types(cancel));
        let projects = scope.spawn(|| remote.list_projects(cancel));
        (
            milestones.join().expect("milestone refresh panicked"),
            issue_types.join().expect("issue type refresh panicked"),
            projects.join().expect("project refresh panicked"),
        )
    });

    match milestones {
        Ok(items) => {
            let mut entries: Vec<catalog::MilestoneEntry> = items
                .into_iter()
                .map(|m| catalog::MilestoneEntry {
                    title: m.title,
                    description: m.description,
                    due_on: m.due_on,
                    state: m.state,
                })
                .collect();
            entries.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
            let cache = catalog::MilestoneCache {
                milestones: entries,
                synced_at: Some(now),
            };
            if let Err(err) = catalog::save_milestones(paths, &cache) {
                report.warn(format!("saving milestone cache: {err}"));
            }
        }
        Err(err) => report.warn(format!("fetching milestones: {err}")),
    }

    match issue_types {
        Ok(items) if !items.is_empty() => {
            let mut entries: Vec<catalog::IssueTypeEntry> = items
                .into_iter()
                .map(|t| catalog::IssueTypeEntry {
                    id: t.id,
                    name: t.name,
                    description: t.description,
                })
                .collect();
            entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            let cache = catalog::IssueTypeCache {
                issue_types: entries,
                synced_at: Some(now),
            };
            if let Err(err) = catalog::save_issue_types(paths, &cache) {
                report.warn(format!("saving issue type cache: {err}"));
            }
        }
        Ok(_) => {}
        Err(err) => report.warn(format!("fetching issue types: {err}")),
    }

    match projects {
        Ok(items) if !items.is_empty() => {
            let mut entries: Vec<catalog::ProjectEntry> = items
                .into_iter()
                .map(|p| catalog::ProjectEntry {
                    id: p.id,
                    title: p.title,
                })
                .collect();
            entries.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
            let cache = catalog::ProjectCache {
                projects: entries,
                synced_at: Some(now),
            };
            if let Err(err) = catalog::save_projects(paths, &cache) {
                report.warn(format!("saving project cache: {err}"));
            }
        }
        Ok(_) => {}
        Err(err) => report.warn(format!("fetching projects: {err}")),
    }
}

/// Re-materialize snapshots whose local file disappeared. Temporary ids are
/// excluded: a deleted never-pushed record is simply gone.
fn restore_orphans(
    paths: &Paths,
    remote: &dyn RemoteService,
    cancel: &CancelToken,
    report: &mut SyncReport,
) -> Result<()> {
    let local_ids: Vec<IssueId> = store::load_local_issues(paths)?
        .into_iter()
        .map(|item| item.issue.id)
        .collect();

    let orphaned: Vec<IssueId> = store::list_original_ids(paths)?
        .into_iter()
        .filter(|id| !id.is_local() && !local_ids.contains(id))
        .collect();

    for id in orphaned {
        let mut remote_issue = match remote.get_issue(cancel, id.as_str()) {
            Ok(issue) => issue,
            Err(err) => {
                report.warn(format!("restoring #{id}: {err}"));
                continue;
            }
        };
        remote_issue.synced_at = Some(Utc::now());

        let target = Location::for_state(remote_issue.state);
        let path = document::path_for(target.dir(paths), &remote_issue.id, &remote_issue.title);
        document::write_file(&path, &remote_issue)?;
        store::write_original(paths, &remote_issue)?;
        report.record(RecordOutcome::new(
            OutcomeKind::Restored,
            remote_issue.id.clone(),
            &remote_issue.title,
        ));
    }
    Ok(())
}

/// Label name (lowercased) to color. Errors degrade to an empty map.
pub(crate) fn fetch_label_colors(
    remote: &dyn RemoteService,
    cancel: &CancelToken,
) -> HashMap<String, String> {
    match remote.list_labels(cancel) {
        Ok(labels) => labels
            .into_iter()
            .map(|l| (l.name.to_lowercase(), l.color))
            .collect(),
        Err(err) => {
            tracing::debug!(error = %err, "listing labels failed");
            HashMap::new()
        }
    }
}
