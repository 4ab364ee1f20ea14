//! Reopen command: mark a closed issue open locally and move it back to
//! the open container. Clears the state reason.

use crate::error::Result;
use crate::model::State;
use crate::store::lock::{Lock, DEFAULT_TIMEOUT};
use crate::store::{self, document, Location};
use std::fs;
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, id: &str) -> Result<()> {
    let (paths, _config) = super::workspace(root)?;
    let _lock = Lock::acquire(&paths.sync_dir, DEFAULT_TIMEOUT)?;

    let mut file = store::find_issue(&paths, id)?;
    if file.location == Location::Open {
        return Ok(());
    }

    file.issue.state = State::Open;
    file.issue.state_reason = None;

    let new_path = document::path_for(
        Location::Open.dir(&paths),
        &file.issue.id,
        &file.issue.title,
    );
    fs::rename(&file.path, &new_path)?;
    document::write_file(&new_path, &file.issue)?;
    println!("Reopened {}", file.issue.id);
    Ok(())
}
