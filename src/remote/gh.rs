//! `gh` CLI transport for the remote issue service.
//!
//! All remote access shells out to the authenticated `gh` binary through a
//! swappable [`Runner`], so tests never touch the network. REST endpoints
//! cover the plain issue surface; relationships, issue types and project
//! membership go through the GraphQL API.

use crate::error::{MirrorError, Result};
use crate::model::{Issue, IssueId, IssueRef, State};
use crate::remote::{
    BatchIssueUpdate, BatchUpdateResult, CancelToken, IssueTypeInfo, Label, ListOptions,
    ListState, Milestone, ProjectInfo, RemoteService,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::process::Command;
use std::str::FromStr;

/// Process execution boundary, swapped out in tests.
pub trait Runner: Send + Sync {
    /// Run a program and return its stdout, or the stderr as an error.
    fn run(&self, cancel: &CancelToken, program: &str, args: &[String]) -> Result<String>;
}

/// Runner backed by real subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecRunner;

impl Runner for ExecRunner {
    fn run(&self, cancel: &CancelToken, program: &str, args: &[String]) -> Result<String> {
        cancel.check()?;
        let output = Command::new(program).args(args).output()?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(MirrorError::Remote(format!(
                "{program} {}: {}",
                args.first().map_or("", String::as_str),
                stderr.trim()
            )))
        }
    }
}

/// Remote client over the `gh` CLI.
pub struct GhClient {
    runner: Box<dyn Runner>,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
    #[serde(default)]
    color: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiMilestone {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due_on: Option<String>,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    #[serde(default)]
    state_reason: Option<String>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    #[serde(default)]
    assignees: Vec<ApiUser>,
    #[serde(default)]
    milestone: Option<ApiMilestone>,
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Present when the "issue" is actually a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
    #[serde(rename = "type", default)]
    issue_type: Option<ApiIssueType>,
}

#[derive(Debug, Deserialize)]
struct ApiIssueType {
    name: String,
}

impl GhClient {
    #[must_use]
    pub fn new(runner: Box<dyn Runner>, repo: impl Into<String>) -> Self {
        Self {
            runner,
            repo: repo.into(),
        }
    }

    /// Client with the default subprocess runner.
    #[must_use]
    pub fn with_exec(repo: impl Into<String>) -> Self {
        Self::new(Box::new(ExecRunner), repo)
    }

    fn api(&self, cancel: &CancelToken, args: &[String]) -> Result<String> {
        let mut full = vec!["api".to_string()];
        full.extend_from_slice(args);
        self.runner.run(cancel, "gh", &full)
    }

    fn graphql(
        &self,
        cancel: &CancelToken,
        query: &str,
        fields: &[(&str, &str)],
    ) -> Result<serde_json::Value> {
        let mut args = vec![
            "api".to_string(),
            "graphql".to_string(),
            "-f".to_string(),
            format!("query={query}"),
        ];
        for (key, value) in fields {
            args.push("-F".to_string());
            args.push(format!("{key}={value}"));
        }
        let out = self.runner.run(cancel, "gh", &args)?;
        Ok(serde_json::from_str(&out)?)
    }

    fn owner_and_name(&self) -> (&str, &str) {
        self.repo.split_once('/').unwrap_or((self.repo.as_str(), ""))
    }

    fn issue_from_api(&self, api: ApiIssue) -> Issue {
        Issue {
            id: IssueId::new(api.number.to_string()),
            title: api.title,
            labels: api.labels.into_iter().map(|l| l.name).collect(),
            assignees: api.assignees.into_iter().map(|a| a.login).collect(),
            milestone: api.milestone.map(|m| m.title).unwrap_or_default(),
            issue_type: api.issue_type.map(|t| t.name).unwrap_or_default(),
            state: State::from_str(&api.state).unwrap_or_default(),
            state_reason: api.state_reason.filter(|r| !r.is_empty()),
            body: api.body.unwrap_or_default(),
            author: api.user.map(|u| u.login).unwrap_or_default(),
            created_at: api.created_at,
            updated_at: api.updated_at,
            ..Issue::default()
        }
    }

    /// Fetch parent and blocked-by references for one issue.
    fn fetch_relationships(
        &self,
        cancel: &CancelToken,
        id: &str,
    ) -> Result<(Option<IssueRef>, Vec<IssueRef>)> {
        let (owner, name) = self.owner_and_name();
        let query = "query($owner: String!, $name: String!, $number: Int!) {\
            repository(owner: $owner, name: $name) {\
              issue(number: $number) {\
                parent { number }\
                blockedByIssues(first: 50) { nodes { number } }\
              } } }";
        let data = self.graphql(
            cancel,
            query,
            &[("owner", owner), ("name", name), ("number", id)],
        )?;
        let issue = &data["data"]["repository"]["issue"];
        let parent = issue["parent"]["number"]
            .as_u64()
            .map(|n| IssueRef::new(n.to_string()));
        let blocked_by = issue["blockedByIssues"]["nodes"]
            .as_array()
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|node| node["number"].as_u64())
                    .map(|n| IssueRef::new(n.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Ok((parent, blocked_by))
    }

    fn issue_node_id(&self, cancel: &CancelToken, id: &str) -> Result<String> {
        let (owner, name) = self.owner_and_name();
        let query = "query($owner: String!, $name: String!, $number: Int!) {\
            repository(owner: $owner, name: $name) { issue(number: $number) { id } } }";
        let data = self.graphql(
            cancel,
            query,
            &[("owner", owner), ("name", name), ("number", id)],
        )?;
        data["data"]["repository"]["issue"]["id"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| MirrorError::Remote(format!("issue #{id} has no node id")))
    }

    fn enrich(&self, cancel: &CancelToken, issue: &mut Issue) {
        match self.fetch_relationships(cancel, issue.id.as_str()) {
            Ok((parent, blocked_by)) => {
                issue.parent = parent;
                issue.blocked_by = blocked_by;
            }
            Err(err) => {
                tracing::warn!(id = %issue.id, error = %err, "fetching relationships failed");
            }
        }
    }

    fn is_not_found(err: &MirrorError) -> bool {
        matches!(err, MirrorError::Remote(msg)
            if msg.contains("404") || msg.contains("Not Found") || msg.contains("Could not resolve"))
    }
}

impl RemoteService for GhClient {
    fn list_issues(&self, cancel: &CancelToken, opts: &ListOptions) -> Result<Vec<Issue>> {
        let state = opts.state.unwrap_or(ListState::Open);
        let mut endpoint = format!("repos/{}/issues?state={}&per_page=100", self.repo, state.as_str());
        if !opts.labels.is_empty() {
            endpoint.push_str(&format!("&labels={}", opts.labels.join(",")));
        }
        if let Some(since) = opts.since {
            endpoint.push_str(&format!("&since={}", since.to_rfc3339()));
        }
        let out = self.api(
            cancel,
            &[
                endpoint,
                "--paginate".to_string(),
                "--slurp".to_string(),
            ],
        )?;
        let pages: Vec<Vec<ApiIssue>> = serde_json::from_str(&out)?;
        let mut issues: Vec<Issue> = pages
            .into_iter()
            .flatten()
            .filter(|api| api.pull_request.is_none())
            .map(|api| self.issue_from_api(api))
            .collect();
        for issue in &mut issues {
            self.enrich(cancel, issue);
        }
        Ok(issues)
    }

    fn get_issue(&self, cancel: &CancelToken, id: &str) -> Result<Issue> {
        let out = self.api(cancel, &[format!("repos/{}/issues/{id}", self.repo)])?;
        let api: ApiIssue = serde_json::from_str(&out)?;
        let mut issue = self.issue_from_api(api);
        self.enrich(cancel, &mut issue);
        Ok(issue)
    }

    fn get_issues_batch(
        &self,
        cancel: &CancelToken,
        ids: &[String],
    ) -> Result<HashMap<String, Issue>> {
        let mut issues = HashMap::with_capacity(ids.len());
        for id in ids {
            match self.get_issue(cancel, id) {
                Ok(issue) => {
                    issues.insert(id.clone(), issue);
                }
                Err(err) if Self::is_not_found(&err) => {
                    tracing::debug!(id, "issue not found on remote");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(issues)
    }

    fn create_issue(&self, cancel: &CancelToken, issue: &Issue) -> Result<String> {
        let mut args = vec![
            format!("repos/{}/issues", self.repo),
            "-X".to_string(),
            "POST".to_string(),
            "-f".to_string(),
            format!("title={}", issue.title),
            "-f".to_string(),
            format!("body={}", issue.body),
        ];
        for label in &issue.labels {
            args.push("-f".to_string());
            args.push(format!("labels[]={label}"));
        }
        for assignee in &issue.assignees {
            args.push("-f".to_string());
            args.push(format!("assignees[]={assignee}"));
        }
        let out = self.api(cancel, &args)?;
        let created: serde_json::Value = serde_json::from_str(&out)?;
        created["number"]
            .as_u64()
            .map(|n| n.to_string())
            .ok_or_else(|| MirrorError::Remote("create response carries no number".to_string()))
    }

    fn edit_issues_batch(
        &self,
        cancel: &CancelToken,
        updates: &[BatchIssueUpdate],
    ) -> Result<BatchUpdateResult> {
        let mut result = BatchUpdateResult::default();
        for update in updates {
            cancel.check()?;
            let mut args = vec![
                format!("repos/{}/issues/{}", self.repo, update.id),
                "-X".to_string(),
                "PATCH".to_string(),
            ];
            if let Some(title) = &update.title {
                args.push("-f".to_string());
                args.push(format!("title={title}"));
            }
            if let Some(body) = &update.body {
                args.push("-f".to_string());
                args.push(format!("body={body}"));
            }
            if let Some(milestone) = &update.milestone {
                args.push("-f".to_string());
                args.push(format!("milestone={milestone}"));
            }
            if let Some(labels) = &update.labels {
                if labels.is_empty() {
                    args.push("-f".to_string());
                    args.push("labels[]=".to_string());
                }
                for label in labels {
                    args.push("-f".to_string());
                    args.push(format!("labels[]={label}"));
                }
            }
            if let Some(assignees) = &update.assignees {
                if assignees.is_empty() {
                    args.push("-f".to_string());
                    args.push("assignees[]=".to_string());
                }
                for assignee in assignees {
                    args.push("-f".to_string());
                    args.push(format!("assignees[]={assignee}"));
                }
            }
            if let Err(err) = self.api(cancel, &args) {
                if matches!(err, MirrorError::Cancelled) {
                    return Err(err);
                }
                result.errors.insert(update.id.clone(), err.to_string());
            }
        }
        Ok(result)
    }

    fn close_issue(&self, cancel: &CancelToken, id: &str, reason: Option<&str>) -> Result<()> {
        let mut args = vec![
            "issue".to_string(),
            "close".to_string(),
            id.to_string(),
            "-R".to_string(),
            self.repo.clone(),
        ];
        if let Some(reason) = reason.filter(|r| !r.is_empty()) {
            args.push("-r".to_string());
            args.push(reason.to_string());
        }
        self.runner.run(cancel, "gh", &args).map(|_| ())
    }

    fn reopen_issue(&self, cancel: &CancelToken, id: &str) -> Result<()> {
        let args = vec![
            "issue".to_string(),
            "reopen".to_string(),
            id.to_string(),
            "-R".to_string(),
            self.repo.clone(),
        ];
        self.runner.run(cancel, "gh", &args).map(|_| ())
    }

    fn list_labels(&self, cancel: &CancelToken) -> Result<Vec<Label>> {
        let out = self.api(
            cancel,
            &[
                format!("repos/{}/labels?per_page=100", self.repo),
                "--paginate".to_string(),
                "--slurp".to_string(),
            ],
        )?;
        let pages: Vec<Vec<ApiLabel>> = serde_json::from_str(&out)?;
        Ok(pages
            .into_iter()
            .flatten()
            .map(|l| Label {
                name: l.name,
                color: l.color,
            })
            .collect())
    }

    fn create_label(&self, cancel: &CancelToken, name: &str, color: &str) -> Result<()> {
        self.api(
            cancel,
            &[
                format!("repos/{}/labels", self.repo),
                "-X".to_string(),
                "POST".to_string(),
                "-f".to_string(),
                format!("name={name}"),
                "-f".to_string(),
                format!("color={color}"),
            ],
        )
        .map(|_| ())
    }

    fn list_milestones(&self, cancel: &CancelToken) -> Result<Vec<Milestone>> {
        let out = self.api(
            cancel,
            &[format!("repos/{}/milestones?state=all&per_page=100", self.repo)],
        )?;
        let api: Vec<ApiMilestone> = serde_json::from_str(&out)?;
        Ok(api
            .into_iter()
            .map(|m| Milestone {
                title: m.title,
                description: m.description.unwrap_or_default(),
                due_on: m.due_on,
                state: m.state,
            })
            .collect())
    }

    fn create_milestone(&self, cancel: &CancelToken, title: &str) -> Result<()> {
        self.api(
            cancel,
            &[
                format!("repos/{}/milestones", self.repo),
                "-X".to_string(),
                "POST".to_string(),
                "-f".to_string(),
                format!("title={title}"),
            ],
        )
        .map(|_| ())
    }

    fn list_issue_types(&self, cancel: &CancelToken) -> Result<Vec<IssueTypeInfo>> {
        let (owner, _) = self.owner_and_name();
        let query = "query($owner: String!) {\
            organization(login: $owner) {\
              issueTypes(first: 25) { nodes { id name description } } } }";
        let data = self.graphql(cancel, query, &[("owner", owner)])?;
        let nodes = data["data"]["organization"]["issueTypes"]["nodes"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(nodes
            .iter()
            .filter_map(|node| {
                Some(IssueTypeInfo {
                    id: node["id"].as_str()?.to_string(),
                    name: node["name"].as_str()?.to_string(),
                    description: node["description"].as_str().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    fn set_issue_type(&self, cancel: &CancelToken, id: &str, type_id: &str) -> Result<()> {
        let node_id = self.issue_node_id(cancel, id)?;
        let mutation = if type_id.is_empty() {
            "mutation($issue: ID!) {\
             updateIssueIssueType(input: {issueId: $issue, issueTypeId: null}) { issue { id } } }"
        } else {
            "mutation($issue: ID!, $type: ID!) {\
             updateIssueIssueType(input: {issueId: $issue, issueTypeId: $type}) { issue { id } } }"
        };
        let mut fields = vec![("issue", node_id.as_str())];
        if !type_id.is_empty() {
            fields.push(("type", type_id));
        }
        self.graphql(cancel, mutation, &fields).map(|_| ())
    }

    fn list_projects(&self, cancel: &CancelToken) -> Result<Vec<ProjectInfo>> {
        let (owner, name) = self.owner_and_name();
        let query = "query($owner: String!, $name: String!) {\
            repository(owner: $owner, name: $name) {\
              projectsV2(first: 50) { nodes { id title } } } }";
        let data = self.graphql(cancel, query, &[("owner", owner), ("name", name)])?;
        let nodes = data["data"]["repository"]["projectsV2"]["nodes"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(nodes
            .iter()
            .filter_map(|node| {
                Some(ProjectInfo {
                    id: node["id"].as_str()?.to_string(),
                    title: node["title"].as_str()?.to_string(),
                })
            })
            .collect())
    }

    fn sync_projects(
        &self,
        cancel: &CancelToken,
        id: &str,
        desired: &[String],
        known: &HashMap<String, String>,
    ) -> Result<()> {
        let node_id = self.issue_node_id(cancel, id)?;
        for title in desired {
            let Some(project_id) = known.get(&title.to_lowercase()) else {
                tracing::warn!(id, project = %title, "unknown project, skipping");
                continue;
            };
            let mutation = "mutation($project: ID!, $item: ID!) {\
                addProjectV2ItemById(input: {projectId: $project, contentId: $item}) {\
                  item { id } } }";
            self.graphql(
                cancel,
                mutation,
                &[("project", project_id.as_str()), ("item", node_id.as_str())],
            )?;
        }
        Ok(())
    }

    fn sync_relationships(&self, cancel: &CancelToken, id: &str, local: &Issue) -> Result<()> {
        let (current_parent, current_blocked_by) = self.fetch_relationships(cancel, id)?;
        let node_id = self.issue_node_id(cancel, id)?;

        let want_parent = local.parent.as_ref().map(IssueRef::as_str);
        let have_parent = current_parent.as_ref().map(IssueRef::as_str);
        if want_parent != have_parent {
            if let Some(parent) = want_parent {
                let parent_node = self.issue_node_id(cancel, parent)?;
                let mutation = "mutation($parent: ID!, $child: ID!) {\
                    addSubIssue(input: {issueId: $parent, subIssueId: $child}) {\
                      issue { id } } }";
                self.graphql(
                    cancel,
                    mutation,
                    &[("parent", parent_node.as_str()), ("child", node_id.as_str())],
                )?;
            } else if let Some(parent) = have_parent {
                let parent_node = self.issue_node_id(cancel, parent)?;
                let mutation = "mutation($parent: ID!, $child: ID!) {\
                    removeSubIssue(input: {issueId: $parent, subIssueId: $child}) {\
                      issue { id } } }";
                self.graphql(
                    cancel,
                    mutation,
                    &[("parent", parent_node.as_str()), ("child", node_id.as_str())],
                )?;
            }
        }

        let want: Vec<&str> = local.blocked_by.iter().map(IssueRef::as_str).collect();
        let have: Vec<&str> = current_blocked_by.iter().map(IssueRef::as_str).collect();
        for blocker in want.iter().filter(|b| !have.contains(b)) {
            let blocker_node = self.issue_node_id(cancel, blocker)?;
            let mutation = "mutation($issue: ID!, $blocker: ID!) {\
                addBlockedBy(input: {issueId: $issue, blockingIssueId: $blocker}) {\
                  issue { id } } }";
            self.graphql(
                cancel,
                mutation,
                &[("issue", node_id.as_str()), ("blocker", blocker_node.as_str())],
            )?;
        }
        for blocker in have.iter().filter(|b| !want.contains(b)) {
            let blocker_node = self.issue_node_id(cancel, blocker)?;
            let mutation = "mutation($issue: ID!, $blocker: ID!) {\
                removeBlockedBy(input: {issueId: $issue, blockingIssueId: $blocker}) {\
                  issue { id } } }";
            self.graphql(
                cancel,
                mutation,
                &[("issue", node_id.as_str()), ("blocker", blocker_node.as_str())],
            )?;
        }
        Ok(())
    }

    fn create_comment(&self, cancel: &CancelToken, id: &str, body: &str) -> Result<()> {
        self.api(
            cancel,
            &[
                format!("repos/{}/issues/{id}/comments", self.repo),
                "-X".to_string(),
                "POST".to_string(),
                "-f".to_string(),
                format!("body={body}"),
            ],
        )
        .map(|_| ())
    }
}

/// Detect `owner/repo` from the git remote, for `init` without flags.
pub fn detect_repo(runner: &dyn Runner, cancel: &CancelToken) -> Result<(String, String)> {
    let out = runner.run(
        cancel,
        "git",
        &[
            "config".to_string(),
            "--get".to_string(),
            "remote.origin.url".to_string(),
        ],
    )?;
    parse_remote(&out)
}

fn parse_remote(remote: &str) -> Result<(String, String)> {
    use once_cell::sync::Lazy;
    use regex::Regex;
    static REMOTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)(?:github\.com[:/])([^/]+)/([^/\s]+?)(?:\.git)?$")
            .expect("remote pattern is valid")
    });
    let remote = remote.trim();
    let caps = REMOTE_PATTERN
        .captures(remote)
        .ok_or_else(|| MirrorError::RepoDetection {
            reason: format!("unsupported remote '{remote}'"),
        })?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}
