//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Offline mirror and reconciliation for remote issue trackers
#[derive(Parser, Debug)]
#[command(name = "imi", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    pub root: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the mirror layout and config
    ///
    /// If --owner/--repo are omitted, the git remote is used.
    Init {
        /// Repository owner
        #[arg(long)]
        owner: Option<String>,

        /// Repository name
        #[arg(long)]
        repo: Option<String>,
    },

    /// Pull issues from the remote service
    Pull(PullArgs),

    /// Push local changes to the remote service
    Push(PushArgs),

    /// Push local changes, then pull updates
    Sync(SyncArgs),

    /// Show local changes and last pull time
    Status,

    /// List local issues
    #[command(alias = "ls")]
    List(ListArgs),

    /// Create a new local issue
    New(NewArgs),

    /// Mark an issue as closed locally (push to sync)
    Close(CloseArgs),

    /// Reopen a closed issue locally (push to sync)
    Reopen {
        /// Issue id
        id: String,
    },

    /// View an issue
    View(ViewArgs),

    /// Show what changed compared to the last synced version
    Diff(DiffArgs),

    /// Queue a comment for the next push
    Comment(CommentArgs),
}

#[derive(Args, Debug, Default)]
pub struct PullArgs {
    /// Issue ids or paths to pull (default: everything)
    pub args: Vec<String>,

    /// Include closed issues in the listing
    #[arg(long)]
    pub all: bool,

    /// Overwrite locally changed issues instead of reporting conflicts
    #[arg(long)]
    pub force: bool,

    /// Force a full listing even if an incremental pull is possible
    #[arg(long)]
    pub full: bool,

    /// Restrict the listing to these labels
    #[arg(short, long)]
    pub label: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct PushArgs {
    /// Issue ids or paths to push (default: everything)
    pub args: Vec<String>,

    /// Report what would happen without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip posting pending comments
    #[arg(long)]
    pub no_comments: bool,
}

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Include closed issues when pulling
    #[arg(long)]
    pub all: bool,

    /// Overwrite locally changed issues when pulling
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Include closed issues
    #[arg(long)]
    pub all: bool,

    /// Filter by state (open|closed)
    #[arg(long)]
    pub state: Option<String>,

    /// Filter by label
    #[arg(short, long)]
    pub label: Vec<String>,

    /// Filter by assignee
    #[arg(long)]
    pub assignee: Option<String>,

    /// Only issues that have never been pushed
    #[arg(long)]
    pub local: bool,

    /// Only issues modified since the last sync
    #[arg(long)]
    pub modified: bool,
}

#[derive(Args, Debug, Default)]
pub struct NewArgs {
    /// Issue title
    pub title: String,

    /// Labels to apply
    #[arg(short, long)]
    pub label: Vec<String>,

    /// Body text (default: empty)
    #[arg(short, long)]
    pub body: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct CloseArgs {
    /// Issue id
    pub id: String,

    /// State reason (completed, not_planned, ...)
    #[arg(short, long)]
    pub reason: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ViewArgs {
    /// Issue id or path
    pub reference: String,

    /// Print the raw file instead of formatted output
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug, Default)]
pub struct DiffArgs {
    /// Issue id (default: every modified issue)
    pub id: Option<String>,

    /// Diff against the current remote state instead of the snapshot
    #[arg(long)]
    pub remote: bool,
}

#[derive(Args, Debug, Default)]
pub struct CommentArgs {
    /// Issue id
    pub id: String,

    /// Comment text
    pub body: String,
}
