//! Backlog runtime configuration.
//!
//! Configuration is resolved once at process startup (the CLI reads the environment) and then
//! passed into core services. Core code never reads environment variables itself.

use crate::constants::{DEFAULT_BRANCH, DEFAULT_REMOTE, OVERVIEW_FILE_NAME};
use crate::error::{BacklogError, BacklogResult};
use crate::git::CommitAuthor;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct BacklogConfig {
    root_dir: PathBuf,
    author: CommitAuthor,
    remote: String,
    branch: String,
}

impl BacklogConfig {
    /// Create a new `BacklogConfig` with the default remote and branch.
    ///
    /// # Errors
    ///
    /// Returns `BacklogError::InvalidInput` if `root_dir` is not a directory.
    pub fn new(root_dir: PathBuf, author: CommitAuthor) -> BacklogResult<Self> {
        if !root_dir.is_dir() {
            return Err(BacklogError::InvalidInput(format!(
                "backlog root {} is not a directory",
                root_dir.display()
            )));
        }

        Ok(Self {
            root_dir,
            author,
            remote: DEFAULT_REMOTE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
        })
    }

    /// Overrides the remote name; blank values keep the current one.
    pub fn with_remote(mut self, remote: Option<String>) -> Self {
        if let Some(remote) = non_blank(remote) {
            self.remote = remote;
        }
        self
    }

    /// Overrides the branch name; blank values keep the current one.
    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        if let Some(branch) = non_blank(branch) {
            self.branch = branch;
        }
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn author(&self) -> &CommitAuthor {
        &self.author
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}

/// Resolve the backlog root without reading environment variables.
///
/// An explicit `override_dir` wins. Otherwise `cwd` is the root, unless it is itself a
/// backlog directory (it holds an overview), in which case its parent is.
pub fn resolve_root_dir(override_dir: Option<PathBuf>, cwd: &Path) -> BacklogResult<PathBuf> {
    if let Some(root) = override_dir {
        if root.is_dir() {
            return Ok(root);
        }
        return Err(BacklogError::InvalidInput(format!(
            "BACKLOG_ROOT override {} is not a directory",
            root.display()
        )));
    }

    if cwd.join(OVERVIEW_FILE_NAME).is_file() {
        if let Some(parent) = cwd.parent() {
            return Ok(parent.to_path_buf());
        }
    }
    Ok(cwd.to_path_buf())
}

/// Build the commit author from optional name and email values.
///
/// # Errors
///
/// Returns `BacklogError::InvalidInput` if either value is missing or blank.
pub fn author_from_env_values(
    name: Option<String>,
    email: Option<String>,
) -> BacklogResult<CommitAuthor> {
    let name = non_blank(name)
        .ok_or_else(|| BacklogError::InvalidInput("BACKLOG_AUTHOR_NAME is not set".into()))?;
    let email = non_blank(email)
        .ok_or_else(|| BacklogError::InvalidInput("BACKLOG_AUTHOR_EMAIL is not set".into()))?;
    CommitAuthor::new(name, email)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn author() -> CommitAuthor {
        CommitAuthor::new("Test Author", "test@example.com").unwrap()
    }

    #[test]
    fn defaults_remote_and_branch() {
        let dir = tempfile::tempdir().unwrap();
        let config = BacklogConfig::new(dir.path().to_path_buf(), author())
            .unwrap()
            .with_remote(Some("  ".into()))
            .with_branch(None);
        assert_eq!(config.remote(), "origin");
        assert_eq!(config.branch(), "main");
        assert_eq!(config.root_dir(), dir.path());
    }

    #[test]
    fn overrides_remote_and_branch() {
        let dir = tempfile::tempdir().unwrap();
        let config = BacklogConfig::new(dir.path().to_path_buf(), author())
            .unwrap()
            .with_remote(Some("upstream".into()))
            .with_branch(Some(" trunk ".into()));
        assert_eq!(config.remote(), "upstream");
        assert_eq!(config.branch(), "trunk");
    }

    #[test]
    fn rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = BacklogConfig::new(dir.path().join("missing"), author()).unwrap_err();
        assert!(matches!(err, BacklogError::InvalidInput(_)));
    }

    #[test]
    fn root_is_parent_of_backlog_dir() {
        let dir = tempfile::tempdir().unwrap();
        let team = dir.path().join("team");
        fs::create_dir(&team).unwrap();
        fs::write(team.join(OVERVIEW_FILE_NAME), "# Team\n").unwrap();

        assert_eq!(resolve_root_dir(None, &team).unwrap(), dir.path());
        assert_eq!(resolve_root_dir(None, dir.path()).unwrap(), dir.path());
    }

    #[test]
    fn explicit_root_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let root = resolve_root_dir(Some(dir.path().to_path_buf()), Path::new("/")).unwrap();
        assert_eq!(root, dir.path());

        let err = resolve_root_dir(Some(dir.path().join("nope")), Path::new("/")).unwrap_err();
        assert!(matches!(err, BacklogError::InvalidInput(_)));
    }

    #[test]
    fn author_requires_both_values() {
        let author =
            author_from_env_values(Some(" Ann ".into()), Some("ann@example.com".into())).unwrap();
        assert_eq!(author.name, "Ann");

        let err = author_from_env_values(Some("Ann".into()), None).unwrap_err();
        assert!(err.to_string().contains("BACKLOG_AUTHOR_EMAIL"));
        assert!(author_from_env_values(Some("".into()), Some("a@b.c".into())).is_err());
    }
}
