//! Push command.

use crate::cli::PushArgs;
use crate::error::Result;
use crate::remote::CancelToken;
use crate::store::lock::{Lock, DEFAULT_TIMEOUT};
use crate::sync::{self, PushOptions};
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, args: &PushArgs) -> Result<()> {
    let (paths, config) = super::workspace(root)?;
    let _lock = Lock::acquire(&paths.sync_dir, DEFAULT_TIMEOUT)?;

    let client = super::client(&config);
    let cancel = CancelToken::new();
    let opts = PushOptions {
        dry_run: args.dry_run,
        no_comments: args.no_comments,
    };

    let report = sync::push(&paths, &client, &cancel, &opts, &args.args)?;
    super::print_report(&report, "remote changed", "push");
    Ok(())
}
