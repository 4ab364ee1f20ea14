//! Push: reconcile local edits back to the remote service.
//!
//! Order of operations: dependency resolution (create missing labels and
//! milestones), promotion of temporary-id records with reference
//! rewriting, then the per-record loop: conflict gate against a freshly
//! fetched remote, state transition first, batched field edit, best-effort
//! relationship/type/project sync, snapshot overwrite.

use crate::error::{MirrorError, Result};
use crate::model::{eq_ignoring_synced_at, eq_for_conflict_check, Issue, IssueId};
use crate::remote::{
    BatchIssueUpdate, CancelToken, IssueChange, RemoteService, StateTransition,
};
use crate::store::{self, catalog, document, IssueFile, Paths};
use crate::sync::promote::PromotionMap;
use crate::sync::report::{change_lines, OutcomeKind, RecordOutcome, SyncReport};
use crate::sync::{filter_issues_by_args, pull::fetch_label_colors};
use chrono::Utc;
use rand::seq::IndexedRandom;
use std::collections::{HashMap, HashSet};
use std::fs;

/// Options for a push invocation.
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Report what would happen without touching the remote or the mirror.
    pub dry_run: bool,
    /// Skip posting pending comments.
    pub no_comments: bool,
}

/// Run a push. `args` scopes the operation to specific ids or paths.
#[allow(clippy::too_many_lines)]
pub fn push(
    paths: &Paths,
    remote: &dyn RemoteService,
    cancel: &CancelToken,
    opts: &PushOptions,
    args: &[String],
) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    // Catalog caches, falling back to a remote fetch when empty. Never
    // authoritative; push only needs existence and ids.
    let mut label_colors = load_or_fetch_label_colors(paths, remote, cancel, &mut report);
    let mut milestone_cache = load_milestone_cache(paths, remote, cancel, &mut report);
    let mut known_milestones: HashSet<String> =
        milestone_cache.titles().into_keys().collect();
    let known_issue_types = load_issue_type_cache(paths, remote, cancel, &mut report).by_name();
    let known_projects: HashMap<String, String> =
        load_project_cache(paths, remote, cancel, &mut report)
            .by_title()
            .into_iter()
            .map(|(title, entry)| (title, entry.id))
            .collect();

    let local_issues = store::load_local_issues(paths)?;
    let mut filtered = filter_issues_by_args(paths, local_issues, args)?;

    resolve_dependencies(
        paths,
        remote,
        cancel,
        opts,
        &filtered,
        &mut label_colors,
        &mut milestone_cache,
        &mut known_milestones,
        &mut report,
    );

    // Promotion: create every temporary-id record remotely, then rewrite
    // references across the whole corpus in one pass.
    let now = Utc::now();
    let mut mapping = PromotionMap::new();
    let mut created: HashSet<String> = HashSet::new();
    for item in &mut filtered {
        if !item.issue.id.is_local() {
            continue;
        }
        if opts.dry_run {
            report.note(format!("Would create issue {:?}", item.issue.title));
            continue;
        }
        let new_id = remote.create_issue(cancel, &item.issue)?;
        mapping.insert(&item.issue.id, new_id.clone());
        created.insert(new_id.clone());

        item.issue.id = IssueId::new(new_id.clone());
        item.issue.synced_at = Some(now);
        let new_path =
            document::path_for(item.location.dir(paths), &item.issue.id, &item.issue.title);
        if item.path != new_path {
            fs::rename(&item.path, &new_path)?;
            item.path = new_path;
        }
        document::write_file(&item.path, &item.issue)?;
        store::write_original(paths, &item.issue)?;
        report.record(RecordOutcome::new(
            OutcomeKind::Added,
            item.issue.id.clone(),
            &item.issue.title,
        ));
    }

    if !mapping.is_empty() {
        let mut all_issues = store::load_local_issues(paths)?;
        for item in &mut all_issues {
            if !mapping.apply(&mut item.issue) {
                continue;
            }
            document::write_file(&item.path, &item.issue)?;
            let mut outcome = RecordOutcome::new(
                OutcomeKind::ReferenceUpdated,
                item.issue.id.clone(),
                &item.issue.title,
            );
            outcome
                .changes
                .push(format!("    references updated in {}", paths.rel(&item.path)));
            report.record(outcome);
        }

        let remapped_args: Vec<String> = args.iter().map(|arg| mapping.resolve_arg(arg)).collect();
        filtered = filter_issues_by_args(paths, all_issues, &remapped_args)?;

        // Relationship, type and project sync for the records just created,
        // now that temporary references are resolved.
        for item in &filtered {
            let id = item.issue.id.to_string();
            if !created.contains(&id) {
                continue;
            }
            if let Err(err) = remote.sync_relationships(cancel, &id, &item.issue) {
                report.warn(format!("syncing relationships for #{id}: {err}"));
            }
            if !item.issue.issue_type.is_empty() {
                match known_issue_types.get(&item.issue.issue_type.to_lowercase()) {
                    Some(entry) => {
                        if let Err(err) = remote.set_issue_type(cancel, &id, &entry.id) {
                            report.warn(format!("setting issue type for #{id}: {err}"));
                        }
                    }
                    None => report.warn(format!(
                        "unknown issue type {:?} for #{id}",
                        item.issue.issue_type
                    )),
                }
            }
            if !item.issue.projects.is_empty() {
                if let Err(err) =
                    remote.sync_projects(cancel, &id, &item.issue.projects, &known_projects)
                {
                    report.warn(format!("syncing projects for #{id}: {err}"));
                }
            }
        }
    }

    // Phase 1: find records needing an update, against snapshots only.
    struct Pending {
        item: IssueFile,
        original: Option<Issue>,
    }
    let mut pending: Vec<Pending> = Vec::new();
    let mut ids_to_fetch: Vec<String> = Vec::new();
    for item in &filtered {
        if item.issue.id.is_local() {
            continue;
        }
        let id = item.issue.id.to_string();
        let original = store::read_original(paths, &id);
        let local_changed = original
            .as_ref()
            .is_none_or(|orig| !eq_ignoring_synced_at(&item.issue, orig));
        if !local_changed {
            if !created.contains(&id) {
                report.unchanged += 1;
            }
            continue;
        }
        if opts.dry_run {
            report.note(format!("Would push issue #{id}"));
            continue;
        }
        ids_to_fetch.push(id);
        pending.push(Pending {
            item: item.clone(),
            original,
        });
    }

    // Phase 2: one batched fetch of the current remote state for the
    // conflict gate.
    let remote_issues: HashMap<String, Issue> = if ids_to_fetch.is_empty() {
        HashMap::new()
    } else {
        remote
            .get_issues_batch(cancel, &ids_to_fetch)
            .map_err(|err| MirrorError::Remote(format!("fetching remote issues: {err}")))?
    };

    // Phase 3: conflict detection, state transitions, batch assembly.
    struct PostBatch {
        item: IssueFile,
        baseline: Issue,
        change: IssueChange,
    }
    let mut batch_updates: Vec<BatchIssueUpdate> = Vec::new();
    let mut post_batch: Vec<PostBatch> = Vec::new();
    for entry in pending {
        let id = entry.item.issue.id.to_string();
        let Some(remote_issue) = remote_issues.get(&id) else {
            report.warn(format!("issue #{id} not found on remote"));
            continue;
        };

        if let Some(original) = &entry.original {
            if !eq_for_conflict_check(remote_issue, original) {
                report.conflict(entry.item.issue.id.clone());
                continue;
            }
        }

        // Baseline is the snapshot when present, else the fresh remote:
        // the first push-style edit of a record that was never snapshotted.
        let baseline = entry.original.clone().unwrap_or_else(|| remote_issue.clone());
        let change = IssueChange::between(&baseline, &entry.item.issue);

        // State transitions cannot be batched with field edits and go first.
        match change.state_transition {
            Some(StateTransition::Close) => {
                remote.close_issue(cancel, &id, change.state_reason.as_deref())?;
            }
            Some(StateTransition::Reopen) => {
                remote.reopen_issue(cancel, &id)?;
            }
            None => {}
        }

        if change.has_edits() {
            let normalized = entry.item.issue.normalized();
            let mut update = BatchIssueUpdate {
                id: id.clone(),
                title: change.title.clone(),
                body: change.body.clone(),
                milestone: change.milestone.clone(),
                ..BatchIssueUpdate::default()
            };
            // Labels and assignees travel as the final set, never add/remove.
            if !change.add_labels.is_empty() || !change.remove_labels.is_empty() {
                update.labels = Some(normalized.labels.clone());
            }
            if !change.add_assignees.is_empty() || !change.remove_assignees.is_empty() {
                update.assignees = Some(normalized.assignees.clone());
            }
            batch_updates.push(update);
        }

        post_batch.push(PostBatch {
            item: entry.item,
            baseline,
            change,
        });
    }

    // Phase 4: one remote call for all batched field edits.
    if !batch_updates.is_empty() {
        let result = remote
            .edit_issues_batch(cancel, &batch_updates)
            .map_err(|err| MirrorError::Remote(format!("batch update failed: {err}")))?;
        for (id, message) in result.errors {
            report.warn(format!("updating #{id}: {message}"));
        }
    }

    // Phase 5: per-id best-effort follow-ups, then snapshot overwrite.
    for mut work in post_batch {
        let id = work.item.issue.id.to_string();

        if let Some(type_name) = &work.change.issue_type {
            let type_id = if type_name.is_empty() {
                Some(String::new())
            } else {
                match known_issue_types.get(&type_name.to_lowercase()) {
                    Some(entry) => Some(entry.id.clone()),
                    None => {
                        report.warn(format!("unknown issue type {type_name:?} for #{id}"));
                        None
                    }
                }
            };
            if let Some(type_id) = type_id {
                if let Err(err) = remote.set_issue_type(cancel, &id, &type_id) {
                    report.warn(format!("setting issue type for #{id}: {err}"));
                }
            }
        }

        if let Err(err) = remote.sync_relationships(cancel, &id, &work.item.issue) {
            report.warn(format!("syncing relationships for #{id}: {err}"));
        }

        if !work.change.add_projects.is_empty() || !work.change.remove_projects.is_empty() {
            if let Err(err) =
                remote.sync_projects(cancel, &id, &work.item.issue.projects, &known_projects)
            {
                report.warn(format!("syncing projects for #{id}: {err}"));
            }
        }

        // The snapshot is overwritten from the local record, not re-fetched.
        work.item.issue.synced_at = Some(Utc::now());
        document::write_file(&work.item.path, &work.item.issue)?;
        store::write_original(paths, &work.item.issue)?;

        let mut outcome = RecordOutcome::new(
            OutcomeKind::Updated,
            work.item.issue.id.clone(),
            &work.item.issue.title,
        );
        outcome.changes = change_lines(&work.baseline, &work.item.issue);
        report.record(outcome);
    }

    if !opts.no_comments {
        post_pending_comments(paths, remote, cancel, opts, args, &filtered, &mapping, &mut report)?;
    }

    Ok(report)
}

/// Create missing labels and milestones ahead of the per-record loop.
/// Each creation is independent and best-effort; cache growth is monotonic.
#[allow(clippy::too_many_arguments)]
fn resolve_dependencies(
    paths: &Paths,
    remote: &dyn RemoteService,
    cancel: &CancelToken,
    opts: &PushOptions,
    filtered: &[IssueFile],
    label_colors: &mut HashMap<String, String>,
    milestone_cache: &mut catalog::MilestoneCache,
    known_milestones: &mut HashSet<String>,
    report: &mut SyncReport,
) {
    let mut needed_labels: Vec<&String> = Vec::new();
    let mut needed_milestones: Vec<&String> = Vec::new();
    for item in filtered {
        for label in &item.issue.labels {
            if !needed_labels.contains(&label) {
                needed_labels.push(label);
            }
        }
        if !item.issue.milestone.is_empty() && !needed_milestones.contains(&&item.issue.milestone) {
            needed_milestones.push(&item.issue.milestone);
        }
    }

    let mut labels_updated = false;
    for label in needed_labels {
        if label_colors.contains_key(&label.to_lowercase()) {
            continue;
        }
        if opts.dry_run {
            report.note(format!("Would create label {label}"));
            continue;
        }
        let color = random_label_color();
        if let Err(err) = remote.create_label(cancel, label, color) {
            report.warn(format!("creating label {label:?}: {err}"));
            continue;
        }
        report.note(format!("Created label {label}"));
        label_colors.insert(label.to_lowercase(), color.to_string());
        labels_updated = true;
    }

    let mut milestones_updated = false;
    for milestone in needed_milestones {
        if known_milestones.contains(&milestone.to_lowercase()) {
            continue;
        }
        if opts.dry_run {
            report.note(format!("Would create milestone {milestone}"));
            continue;
        }
        if let Err(err) = remote.create_milestone(cancel, milestone) {
            report.warn(format!("creating milestone {milestone:?}: {err}"));
            continue;
        }
        report.note(format!("Created milestone {milestone}"));
        known_milestones.insert(milestone.to_lowercase());
        milestone_cache.milestones.push(catalog::MilestoneEntry {
            title: milestone.clone(),
            description: String::new(),
            due_on: None,
            state: "open".to_string(),
        });
        milestones_updated = true;
    }

    if labels_updated {
        let cache = catalog::labels_from_color_map(label_colors, Utc::now());
        if let Err(err) = catalog::save_labels(paths, &cache) {
            report.warn(format!("saving label cache: {err}"));
        }
    }
    if milestones_updated {
        milestone_cache.synced_at = Some(Utc::now());
        if let Err(err) = catalog::save_milestones(paths, milestone_cache) {
            report.warn(format!("saving milestone cache: {err}"));
        }
    }
}

/// Post comments queued offline. Conflicted ids are skipped; failures are
/// warnings and leave the comment file in place for the next push.
#[allow(clippy::too_many_arguments)]
fn post_pending_comments(
    paths: &Paths,
    remote: &dyn RemoteService,
    cancel: &CancelToken,
    opts: &PushOptions,
    args: &[String],
    filtered: &[IssueFile],
    mapping: &PromotionMap,
    report: &mut SyncReport,
) -> Result<()> {
    let pending = store::load_pending_comments(paths)?;
    if pending.is_empty() {
        return Ok(());
    }

    let in_scope: Option<HashSet<String>> = if args.is_empty() {
        None
    } else {
        Some(
            filtered
                .iter()
                .map(|item| item.issue.id.to_string())
                .collect(),
        )
    };
    let conflicted: HashSet<String> = report.conflicts.iter().map(ToString::to_string).collect();

    for mut comment in pending {
        if comment.id.is_local() {
            match mapping.resolve(comment.id.as_str()) {
                Some(permanent) => comment.id = IssueId::new(permanent),
                None => continue,
            }
        }
        let id = comment.id.to_string();
        if in_scope.as_ref().is_some_and(|scope| !scope.contains(&id)) {
            continue;
        }
        if conflicted.contains(&id) {
            continue;
        }
        if opts.dry_run {
            report.note(format!("Would post comment to #{id}"));
            continue;
        }
        if let Err(err) = remote.create_comment(cancel, &id, &comment.body) {
            report.warn(format!("posting comment to #{id}: {err}"));
            continue;
        }
        if let Err(err) = store::delete_pending_comment(&comment) {
            report.warn(format!(
                "removing comment file {}: {err}",
                paths.rel(&comment.path)
            ));
        }
        report.note(format!("Posted comment to #{id}"));
    }
    Ok(())
}

fn load_or_fetch_label_colors(
    paths: &Paths,
    remote: &dyn RemoteService,
    cancel: &CancelToken,
    report: &mut SyncReport,
) -> HashMap<String, String> {
    let cache = match catalog::load_labels(paths) {
        Ok(cache) => cache,
        Err(err) => {
            report.warn(format!("loading label cache: {err}"));
            catalog::LabelCache::default()
        }
    };
    let colors = cache.color_map();
    if !colors.is_empty() {
        return colors;
    }
    fetch_label_colors(remote, cancel)
}

fn load_milestone_cache(
    paths: &Paths,
    remote: &dyn RemoteService,
    cancel: &CancelToken,
    report: &mut SyncReport,
) -> catalog::MilestoneCache {
    let mut cache = match catalog::load_milestones(paths) {
        Ok(cache) => cache,
        Err(err) => {
            report.warn(format!("loading milestone cache: {err}"));
            catalog::MilestoneCache::default()
        }
    };
    if cache.milestones.is_empty() {
        if let Ok(milestones) = remote.list_milestones(cancel) {
            cache.milestones = milestones
                .into_iter()
                .map(|m| catalog::MilestoneEntry {
                    title: m.title,
                    description: m.description,
                    due_on: m.due_on,
                    state: m.state,
                })
                .collect();
            cache.synced_at = Some(Utc::now());
        }
    }
    cache
}

fn load_issue_type_cache(
    paths: &Paths,
    remote: &dyn RemoteService,
    cancel: &CancelToken,
    report: &mut SyncReport,
) -> catalog::IssueTypeCache {
    let mut cache = match catalog::load_issue_types(paths) {
        Ok(cache) => cache,
        Err(err) => {
            report.warn(format!("loading issue type cache: {err}"));
            catalog::IssueTypeCache::default()
        }
    };
    if cache.issue_types.is_empty() {
        if let Ok(types) = remote.list_issue_types(cancel) {
            cache.issue_types = types
                .into_iter()
                .map(|t| catalog::IssueTypeEntry {
                    id: t.id,
                    name: t.name,
                    description: t.description,
                })
                .collect();
            cache.synced_at = Some(Utc::now());
        }
    }
    cache
}

fn load_project_cache(
    paths: &Paths,
    remote: &dyn RemoteService,
    cancel: &CancelToken,
    _report: &mut SyncReport,
) -> catalog::ProjectCache {
    // Projects are optional; a missing cache is not worth a warning.
    let mut cache = catalog::load_projects(paths).unwrap_or_default();
    if cache.projects.is_empty() {
        if let Ok(projects) = remote.list_projects(cancel) {
            cache.projects = projects
                .into_iter()
                .map(|p| catalog::ProjectEntry {
                    id: p.id,
                    title: p.title,
                })
                .collect();
            cache.synced_at = Some(Utc::now());
        }
    }
    cache
}

const LABEL_COLORS: &[&str] = &[
    "0052CC", "00875A", "5243AA", "FF5630", "FFAB00", "36B37E", "00B8D9", "6554C0", "FF8B00",
    "57D9A3", "1D7AFC", "E774BB", "8777D9", "2684FF", "FF991F",
];

fn random_label_color() -> &'static str {
    let mut rng = rand::rng();
    LABEL_COLORS.choose(&mut rng).copied().unwrap_or("0052CC")
}
