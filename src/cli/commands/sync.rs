//! Sync command: push local changes first, then pull updates.

use crate::cli::SyncArgs;
use crate::error::Result;
use crate::remote::CancelToken;
use crate::store::lock::{Lock, DEFAULT_TIMEOUT};
use crate::sync::{self, PullOptions, PushOptions};
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, args: &SyncArgs) -> Result<()> {
    let (paths, mut config) = super::workspace(root)?;
    let _lock = Lock::acquire(&paths.sync_dir, DEFAULT_TIMEOUT)?;

    let client = super::client(&config);
    let cancel = CancelToken::new();

    let push_report = sync::push(&paths, &client, &cancel, &PushOptions::default(), &[])?;
    super::print_report(&push_report, "remote changed", "push");

    let pull_opts = PullOptions {
        all: args.all,
        force: args.force,
        ..PullOptions::default()
    };
    let pull_report = sync::pull(&paths, &mut config, &client, &cancel, &pull_opts, &[])?;
    super::print_report(&pull_report, "local changes", "pull");
    Ok(())
}
