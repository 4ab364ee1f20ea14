//! Init command: create the mirror layout and config.

use crate::config::Config;
use crate::error::{MirrorError, Result};
use crate::remote::gh::{detect_repo, ExecRunner};
use crate::remote::CancelToken;
use crate::store::Paths;
use std::path::PathBuf;

pub fn execute(root: Option<&PathBuf>, owner: Option<String>, repo: Option<String>) -> Result<()> {
    let root = match root {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };
    let paths = Paths::new(&root);

    let (owner, repo) = match (owner, repo) {
        (Some(owner), Some(repo)) => (owner, repo),
        (given_owner, given_repo) => {
            let cancel = CancelToken::new();
            let (detected_owner, detected_repo) = detect_repo(&ExecRunner, &cancel)?;
            (
                given_owner.unwrap_or(detected_owner),
                given_repo.unwrap_or(detected_repo),
            )
        }
    };

    paths.ensure_layout()?;
    if paths.config_path.exists() {
        return Err(MirrorError::AlreadyInitialized {
            path: paths.config_path,
        });
    }
    let config = Config::new(&owner, &repo);
    config.save(&paths.config_path)?;

    println!(
        "Initialized {owner}/{repo} in {}",
        paths.issues_dir.display()
    );
    Ok(())
}
