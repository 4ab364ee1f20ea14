//! New command: create a local issue under a temporary id.

use crate::cli::NewArgs;
use crate::error::{MirrorError, Result};
use crate::model::{Issue, State};
use crate::store::lock::{Lock, DEFAULT_TIMEOUT};
use crate::store::{self, document, Location};
use crate::util::localid;
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, args: &NewArgs) -> Result<()> {
    let (paths, _config) = super::workspace(root)?;
    let title = args.title.trim();
    if title.is_empty() {
        return Err(MirrorError::validation("title", "cannot be empty"));
    }

    let _lock = Lock::acquire(&paths.sync_dir, DEFAULT_TIMEOUT)?;

    let existing = store::load_local_issues(&paths)?;
    let id = localid::generate_unique(|candidate| {
        existing
            .iter()
            .any(|item| item.issue.id.as_str() == candidate.as_str())
    });

    let issue = Issue {
        id,
        title: title.to_string(),
        labels: args.label.clone(),
        state: State::Open,
        body: args.body.clone().unwrap_or_default(),
        ..Issue::default()
    };

    let path = document::path_for(Location::Open.dir(&paths), &issue.id, &issue.title);
    document::write_file(&path, &issue)?;
    println!("Created {}", paths.rel(&path));
    Ok(())
}
