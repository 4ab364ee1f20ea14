//! Serialization round-trip: rendering a record and re-parsing it yields a
//! strictly-equal record, for every combination of populated and empty
//! optional fields.

use chrono::{TimeZone, Utc};
use issuemirror::model::{eq_ignoring_synced_at, Issue, IssueId, IssueRef, State};
use issuemirror::store::document;

const OPTIONAL_FIELDS: usize = 10;

/// Build an issue with optional fields populated according to `mask`.
fn build(mask: u32) -> Issue {
    let mut issue = Issue {
        id: IssueId::new("42"),
        title: "Round trip".to_string(),
        state: if mask & 0x200 != 0 {
            State::Closed
        } else {
            State::Open
        },
        ..Issue::default()
    };
    if mask & 0x001 != 0 {
        issue.labels = vec!["bug".to_string(), "ui".to_string()];
    }
    if mask & 0x002 != 0 {
        issue.assignees = vec!["sam".to_string()];
    }
    if mask & 0x004 != 0 {
        issue.milestone = "v1.0".to_string();
    }
    if mask & 0x008 != 0 {
        issue.issue_type = "Feature".to_string();
    }
    if mask & 0x010 != 0 {
        issue.projects = vec!["Roadmap".to_string()];
    }
    if mask & 0x020 != 0 {
        issue.state_reason = Some("completed".to_string());
    }
    if mask & 0x040 != 0 {
        issue.parent = Some(IssueRef::new("7"));
        issue.blocked_by = vec![IssueRef::new("9"), IssueRef::new("T3a")];
        issue.blocks = vec![IssueRef::new("11")];
    }
    if mask & 0x080 != 0 {
        issue.body = "Some body text.\n\nSecond paragraph.\n".to_string();
    }
    if mask & 0x100 != 0 {
        issue.synced_at = Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap());
        issue.author = "octocat".to_string();
        issue.created_at = Some(Utc.with_ymd_and_hms(2025, 12, 24, 18, 0, 0).unwrap());
        issue.updated_at = Some(Utc.with_ymd_and_hms(2026, 2, 28, 7, 45, 0).unwrap());
    }
    issue
}

#[test]
fn every_optional_field_combination_round_trips() {
    for mask in 0..(1u32 << OPTIONAL_FIELDS) {
        let issue = build(mask);
        let rendered = document::render(&issue).unwrap();
        let mut parsed = document::parse(&rendered).unwrap();
        parsed.id = issue.id.clone();

        assert!(
            eq_ignoring_synced_at(&issue, &parsed),
            "mismatch for field mask {mask:#x}\nrendered:\n{rendered}"
        );
        assert_eq!(
            parsed.synced_at, issue.synced_at,
            "synced_at mismatch for mask {mask:#x}"
        );
    }
}

#[test]
fn rendered_set_fields_are_sorted() {
    let mut issue = build(0x1ff);
    issue.labels = vec!["zeta".to_string(), "alpha".to_string()];
    let rendered = document::render(&issue).unwrap();
    let alpha_pos = rendered.find("alpha").unwrap();
    let zeta_pos = rendered.find("zeta").unwrap();
    assert!(alpha_pos < zeta_pos);
}

#[test]
fn local_reference_round_trips_as_string() {
    let mut issue = build(0);
    issue.parent = Some(IssueRef::new("T9xy"));
    let rendered = document::render(&issue).unwrap();
    assert!(rendered.contains("parent: T9xy"));
    let parsed = document::parse(&rendered).unwrap();
    assert_eq!(parsed.parent, Some(IssueRef::new("T9xy")));
}

#[test]
fn numeric_reference_round_trips_as_number() {
    let mut issue = build(0);
    issue.parent = Some(IssueRef::new("7"));
    let rendered = document::render(&issue).unwrap();
    assert!(rendered.contains("parent: 7"));
    let parsed = document::parse(&rendered).unwrap();
    assert_eq!(parsed.parent, Some(IssueRef::new("7")));
}
