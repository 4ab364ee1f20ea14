//! Command implementations.

pub mod close;
pub mod comment;
pub mod diff;
pub mod init;
pub mod list;
pub mod new;
pub mod pull;
pub mod push;
pub mod reopen;
pub mod status;
pub mod sync;
pub mod view;

use crate::config::Config;
use crate::error::Result;
use crate::remote::gh::GhClient;
use crate::store::Paths;
use crate::sync::SyncReport;
use std::path::PathBuf;

/// Resolve the workspace and load its configuration.
pub fn workspace(root: Option<&PathBuf>) -> Result<(Paths, Config)> {
    let root = match root {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };
    let paths = Paths::new(&root);
    let config = Config::load(&paths.config_path)?;
    Ok((paths, config))
}

/// Remote client bound to the configured repository.
#[must_use]
pub fn client(config: &Config) -> GhClient {
    GhClient::with_exec(config.repo_slug())
}

/// Print a sync report: one line per affected record on stdout, warnings
/// and the conflict summary on stderr.
pub fn print_report(report: &SyncReport, conflict_direction: &str, nothing_verb: &str) {
    for note in &report.notes {
        println!("{note}");
    }
    for record in &report.records {
        println!("{}", record.header());
        for line in &record.changes {
            println!("{line}");
        }
    }
    for warning in &report.warnings {
        eprintln!("Warning: {warning}");
    }
    if let Some(summary) = report.conflict_summary(conflict_direction) {
        eprintln!("{summary}");
    }
    if report.unchanged > 0 {
        let noun = if report.unchanged == 1 { "issue" } else { "issues" };
        println!(
            "Nothing to {nothing_verb}: {} {noun} up to date",
            report.unchanged
        );
    }
}
