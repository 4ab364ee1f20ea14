//! Pull orchestration: classification, conflict precedence, idempotence,
//! container moves, orphan restore, incremental fast path.

mod common;

use common::{base_time, issue, workspace, write_local, write_original, MockRemote};
use issuemirror::model::State;
use issuemirror::remote::CancelToken;
use issuemirror::store::{self, document, Location};
use issuemirror::sync::{pull, OutcomeKind, PullOptions};
use std::fs;

fn run_pull(
    paths: &issuemirror::store::Paths,
    config: &mut issuemirror::config::Config,
    remote: &MockRemote,
    opts: &PullOptions,
    args: &[String],
) -> issuemirror::sync::SyncReport {
    pull(paths, config, remote, &CancelToken::new(), opts, args).unwrap()
}

#[test]
fn first_pull_adds_records() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();
    remote.insert_issue(issue("1", "First"));
    remote.insert_issue(issue("2", "Second"));

    let report = run_pull(&paths, &mut config, &remote, &PullOptions::default(), &[]);

    assert_eq!(report.records.len(), 2);
    assert!(report
        .records
        .iter()
        .all(|r| r.kind == OutcomeKind::Added));
    assert!(paths.open_dir.join("1-first.md").is_file());
    assert!(paths.originals_dir.join("1.md").is_file());
    assert!(config.sync.last_full_pull.is_some());
}

#[test]
fn second_pull_is_idempotent() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();
    remote.insert_issue(issue("1", "First"));
    remote.insert_issue(issue("2", "Second"));

    run_pull(
        &paths,
        &mut config,
        &remote,
        &PullOptions {
            full: true,
            ..PullOptions::default()
        },
        &[],
    );
    let mirror_before = fs::read_to_string(paths.open_dir.join("1-first.md")).unwrap();
    let original_before = fs::read_to_string(paths.originals_dir.join("1.md")).unwrap();

    let report = run_pull(
        &paths,
        &mut config,
        &remote,
        &PullOptions {
            full: true,
            ..PullOptions::default()
        },
        &[],
    );

    assert!(report.records.is_empty());
    assert_eq!(report.unchanged, 2);
    assert_eq!(
        fs::read_to_string(paths.open_dir.join("1-first.md")).unwrap(),
        mirror_before
    );
    assert_eq!(
        fs::read_to_string(paths.originals_dir.join("1.md")).unwrap(),
        original_before
    );
}

#[test]
fn locally_changed_record_conflicts_and_stays_untouched() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();
    let mut remote_issue = issue("5", "Widget");
    remote_issue.body = "remote body\n".to_string();
    remote.insert_issue(remote_issue);

    // Snapshot from an earlier sync, plus a local edit on top of it.
    write_original(&paths, &issue("5", "Widget"));
    let mut local = issue("5", "Widget");
    local.body = "local edit\n".to_string();
    let local_path = write_local(&paths, Location::Open, &local);
    let local_before = fs::read_to_string(&local_path).unwrap();
    let original_before = fs::read_to_string(paths.originals_dir.join("5.md")).unwrap();

    let report = run_pull(&paths, &mut config, &remote, &PullOptions::default(), &[]);

    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].as_str(), "5");
    assert!(report.records.is_empty());
    assert_eq!(fs::read_to_string(&local_path).unwrap(), local_before);
    assert_eq!(
        fs::read_to_string(paths.originals_dir.join("5.md")).unwrap(),
        original_before
    );
}

#[test]
fn force_overwrites_local_changes() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();
    let mut remote_issue = issue("5", "Widget");
    remote_issue.body = "remote body\n".to_string();
    remote.insert_issue(remote_issue);

    write_original(&paths, &issue("5", "Widget"));
    let mut local = issue("5", "Widget");
    local.body = "local edit\n".to_string();
    let local_path = write_local(&paths, Location::Open, &local);

    let report = run_pull(
        &paths,
        &mut config,
        &remote,
        &PullOptions {
            force: true,
            ..PullOptions::default()
        },
        &[],
    );

    assert!(report.conflicts.is_empty());
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].kind, OutcomeKind::Updated);
    let content = fs::read_to_string(&local_path).unwrap();
    assert!(content.contains("remote body"));
}

#[test]
fn remote_close_moves_record_to_closed_container() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();
    let mut remote_issue = issue("7", "Going away");
    remote_issue.state = State::Closed;
    remote_issue.state_reason = Some("completed".to_string());
    remote.insert_issue(remote_issue);

    // Local copy still open, unmodified since its snapshot.
    let snapshot = issue("7", "Going away");
    write_original(&paths, &snapshot);
    let open_path = write_local(&paths, Location::Open, &snapshot);

    // The open listing misses closed records; the batched lookup of known
    // ids catches them.
    let report = run_pull(&paths, &mut config, &remote, &PullOptions::default(), &[]);

    assert_eq!(report.records.len(), 1);
    assert!(!open_path.exists());
    let closed_path = paths.closed_dir.join("7-going-away.md");
    assert!(closed_path.is_file());
    let moved = document::parse_file(&closed_path).unwrap();
    assert_eq!(moved.state, State::Closed);
}

#[test]
fn orphaned_snapshot_is_restored() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();
    // Closed on the remote, so the open listing does not cover it; only
    // the orphan pass can bring it back.
    let mut gone = issue("9", "Deleted locally");
    gone.state = State::Closed;
    remote.insert_issue(gone);

    // Snapshot exists, mirror file does not.
    write_original(&paths, &issue("9", "Deleted locally"));

    let report = run_pull(&paths, &mut config, &remote, &PullOptions::default(), &[]);

    assert!(report
        .records
        .iter()
        .any(|r| r.kind == OutcomeKind::Restored && r.id.as_str() == "9"));
    assert!(paths.closed_dir.join("9-deleted-locally.md").is_file());
}

#[test]
fn temporary_ids_never_restored() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();

    write_original(&paths, &issue("T3ab", "Never pushed"));

    let report = run_pull(&paths, &mut config, &remote, &PullOptions::default(), &[]);

    assert!(report.records.is_empty());
    assert!(store::load_local_issues(&paths).unwrap().is_empty());
}

#[test]
fn incremental_pull_short_circuits_when_nothing_changed() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();
    // Updated long before the last pull.
    remote.insert_issue(issue("1", "Old news"));

    config.sync.last_full_pull = Some(base_time() + chrono::Duration::days(10));
    config.save(&paths.config_path).unwrap();
    let before = config.sync.last_full_pull;

    let report = run_pull(&paths, &mut config, &remote, &PullOptions::default(), &[]);

    assert!(report.records.is_empty());
    assert!(report
        .notes
        .iter()
        .any(|note| note.contains("Nothing to pull")));
    assert!(store::load_local_issues(&paths).unwrap().is_empty());
    // Timestamp still advances so the next window starts here.
    assert_ne!(config.sync.last_full_pull, before);
}

#[test]
fn scoped_pull_fetches_named_ids_only() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();
    remote.insert_issue(issue("1", "Wanted"));
    remote.insert_issue(issue("2", "Not wanted"));

    let report = run_pull(
        &paths,
        &mut config,
        &remote,
        &PullOptions::default(),
        &["1".to_string()],
    );

    assert_eq!(report.records.len(), 1);
    assert!(paths.open_dir.join("1-wanted.md").is_file());
    assert!(!paths.open_dir.join("2-not-wanted.md").exists());
    // A scoped pull must not advance the full-pull timestamp.
    assert!(config.sync.last_full_pull.is_none());
}

#[test]
fn title_change_renames_mirror_file() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();
    remote.insert_issue(issue("4", "New title"));

    let snapshot = issue("4", "Old title");
    write_original(&paths, &snapshot);
    let old_path = write_local(&paths, Location::Open, &snapshot);

    let report = run_pull(&paths, &mut config, &remote, &PullOptions::default(), &[]);

    assert_eq!(report.records.len(), 1);
    assert!(!old_path.exists());
    assert!(paths.open_dir.join("4-new-title.md").is_file());
}

#[test]
fn pull_refreshes_catalog_caches() {
    let (_dir, paths, mut config) = workspace();
    let remote = MockRemote::new();
    remote.insert_label("bug", "ff0000");
    remote
        .milestones
        .lock()
        .unwrap()
        .push(issuemirror::remote::Milestone {
            title: "v1".to_string(),
            description: String::new(),
            due_on: None,
            state: "open".to_string(),
        });

    run_pull(&paths, &mut config, &remote, &PullOptions::default(), &[]);

    let labels = issuemirror::store::catalog::load_labels(&paths).unwrap();
    assert_eq!(labels.labels.len(), 1);
    assert_eq!(labels.labels[0].name, "bug");
    let milestones = issuemirror::store::catalog::load_milestones(&paths).unwrap();
    assert_eq!(milestones.milestones.len(), 1);
}
