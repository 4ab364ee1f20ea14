//! End-to-end coverage of the offline commands through the real binary.
//! Remote-touching commands are exercised in the library tests with a mock
//! service; everything here works against the filesystem only.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn imi(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("imi").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

fn init(dir: &TempDir) {
    imi(dir)
        .args(["init", "--owner", "acme", "--repo", "widgets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized acme/widgets"));
}

/// Find the generated temporary id by scanning the open container.
fn find_local_id(dir: &TempDir) -> String {
    let open_dir = dir.path().join(".issues/open");
    let entry = fs::read_dir(open_dir).unwrap().next().unwrap().unwrap();
    let name = entry.file_name().into_string().unwrap();
    name.split('-').next().unwrap().to_string()
}

#[test]
fn uninitialized_workspace_reports_hint() {
    let dir = TempDir::new().unwrap();
    imi(&dir)
        .arg("status")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not initialized"))
        .stderr(predicate::str::contains("imi init"));
}

#[test]
fn init_creates_layout_and_refuses_to_repeat() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    assert!(dir.path().join(".issues/open").is_dir());
    assert!(dir.path().join(".issues/closed").is_dir());
    assert!(dir.path().join(".issues/.sync/originals").is_dir());
    assert!(dir.path().join(".issues/.sync/config.json").is_file());

    imi(&dir)
        .args(["init", "--owner", "acme", "--repo", "widgets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn new_creates_a_temporary_id_record() {
    let dir = TempDir::new().unwrap();
    init(&dir);

    imi(&dir)
        .args(["new", "Fix the crash", "-l", "bug"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created .issues/open/T"));

    let id = find_local_id(&dir);
    assert!(id.starts_with('T'));

    let content =
        fs::read_to_string(dir.path().join(format!(".issues/open/{id}-fix-the-crash.md"))).unwrap();
    assert!(content.starts_with("---\n"));
    assert!(content.contains("title: Fix the crash"));
    assert!(content.contains("- bug"));
}

#[test]
fn new_requires_a_title() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    imi(&dir)
        .args(["new", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("title"));
}

#[test]
fn close_and_reopen_move_between_containers() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    imi(&dir).args(["new", "Toggle me"]).assert().success();
    let id = find_local_id(&dir);

    imi(&dir).args(["close", &id, "-r", "not_planned"]).assert().success();
    let closed_path = dir.path().join(format!(".issues/closed/{id}-toggle-me.md"));
    assert!(closed_path.is_file());
    let content = fs::read_to_string(&closed_path).unwrap();
    assert!(content.contains("state: closed"));
    assert!(content.contains("state_reason: not_planned"));

    imi(&dir).args(["reopen", &id]).assert().success();
    let open_path = dir.path().join(format!(".issues/open/{id}-toggle-me.md"));
    assert!(open_path.is_file());
    let content = fs::read_to_string(&open_path).unwrap();
    assert!(content.contains("state: open"));
    assert!(content.contains("state_reason: null"));
}

#[test]
fn list_filters_by_state() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    imi(&dir).args(["new", "Open one"]).assert().success();

    imi(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Open one"));

    let id = find_local_id(&dir);
    imi(&dir).args(["close", &id]).assert().success();

    imi(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found"));

    imi(&dir)
        .args(["list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Open one"));
}

#[test]
fn status_reports_new_local_issue() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    imi(&dir).args(["new", "Brand new"]).assert().success();

    imi(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Repository: acme/widgets"))
        .stdout(predicate::str::contains("Last full pull: never"))
        .stdout(predicate::str::contains("New local issues:"));
}

#[test]
fn view_prints_metadata_and_body() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    imi(&dir)
        .args(["new", "Viewable", "-b", "The body text."])
        .assert()
        .success();
    let id = find_local_id(&dir);

    imi(&dir)
        .args(["view", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("title:\tViewable"))
        .stdout(predicate::str::contains("state:\tOPEN"))
        .stdout(predicate::str::contains("The body text."));

    imi(&dir)
        .args(["view", &id, "--raw"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("---\n"));
}

#[test]
fn comment_queues_for_next_push() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    imi(&dir).args(["new", "Discussable"]).assert().success();
    let id = find_local_id(&dir);

    imi(&dir)
        .args(["comment", &id, "first thought"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued comment"));

    let comment_path = dir.path().join(format!(".issues/.sync/comments/{id}.md"));
    assert!(comment_path.is_file());
    assert!(fs::read_to_string(&comment_path)
        .unwrap()
        .contains("first thought"));

    imi(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending comments:"));
}

#[test]
fn comment_rejects_unknown_issue() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    imi(&dir)
        .args(["comment", "999", "into the void"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Issue not found"));
}

#[test]
fn diff_without_changes_reports_clean() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    imi(&dir)
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::contains("No local changes"));
}
