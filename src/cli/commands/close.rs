//! Close command: mark an issue closed locally and move it to the closed
//! container. The transition reaches the remote on the next push.

use crate::cli::CloseArgs;
use crate::error::Result;
use crate::model::State;
use crate::store::lock::{Lock, DEFAULT_TIMEOUT};
use crate::store::{self, document, Location};
use std::fs;
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, args: &CloseArgs) -> Result<()> {
    let (paths, _config) = super::workspace(root)?;
    let _lock = Lock::acquire(&paths.sync_dir, DEFAULT_TIMEOUT)?;

    let mut file = store::find_issue(&paths, &args.id)?;
    if file.location == Location::Closed {
        return Ok(());
    }

    file.issue.state = State::Closed;
    file.issue.state_reason = args
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(ToString::to_string);

    let new_path = document::path_for(
        Location::Closed.dir(&paths),
        &file.issue.id,
        &file.issue.title,
    );
    fs::rename(&file.path, &new_path)?;
    document::write_file(&new_path, &file.issue)?;
    println!("Closed {}", file.issue.id);
    Ok(())
}
