//! Comment command: queue a comment for the next push.

use crate::cli::CommentArgs;
use crate::error::{MirrorError, Result};
use crate::store;
use crate::store::lock::{Lock, DEFAULT_TIMEOUT};
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, args: &CommentArgs) -> Result<()> {
    let (paths, _config) = super::workspace(root)?;
    if args.body.trim().is_empty() {
        return Err(MirrorError::validation("body", "cannot be empty"));
    }

    let _lock = Lock::acquire(&paths.sync_dir, DEFAULT_TIMEOUT)?;

    // The issue must exist locally before a comment can be queued.
    let file = store::find_issue(&paths, args.id.trim())?;
    let path = store::save_pending_comment(&paths, &file.issue.id, &args.body)?;
    println!("Queued comment in {}", paths.rel(&path));
    Ok(())
}
