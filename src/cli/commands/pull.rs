//! Pull command.

use crate::cli::PullArgs;
use crate::error::Result;
use crate::remote::CancelToken;
use crate::store::lock::{Lock, DEFAULT_TIMEOUT};
use crate::sync::{self, PullOptions};
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, args: &PullArgs) -> Result<()> {
    let (paths, mut config) = super::workspace(root)?;
    let _lock = Lock::acquire(&paths.sync_dir, DEFAULT_TIMEOUT)?;

    let client = super::client(&config);
    let cancel = CancelToken::new();
    let opts = PullOptions {
        all: args.all,
        force: args.force,
        full: args.full,
        labels: args.label.clone(),
    };

    let report = sync::pull(&paths, &mut config, &client, &cancel, &opts, &args.args)?;
    super::print_report(&report, "local changes", "pull");
    Ok(())
}
