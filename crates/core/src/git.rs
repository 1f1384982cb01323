//! Git synchronisation for a backlog root.
//!
//! A backlog root is an ordinary Git working tree. Synchronising it is the sequence
//! add → commit → fetch → merge → push, expressed by [`sync_repository`] over the
//! [`VersionControl`] trait so the sequence can be exercised without a real remote.
//! [`GitService`] implements the trait with `git2`/libgit2.
//!
//! ## Branch policy
//!
//! Backlogs standardise on `refs/heads/main`; another branch can be configured with
//! [`GitService::with_branch`]. The remote branch is tracked as
//! `refs/remotes/<remote>/<branch>`.
//!
//! ## Conflicts
//!
//! A merge that leaves conflicts is never committed. It is reported as
//! [`BacklogError::MergeConflict`] and [`sync_repository`] aborts it, restoring the
//! working tree to the local commit.

use crate::constants::{DEFAULT_BRANCH, DEFAULT_REMOTE};
use crate::error::{BacklogError, BacklogResult};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// Name and email recorded on sync and merge commits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl CommitAuthor {
    /// Validates and builds a commit author.
    ///
    /// # Errors
    ///
    /// Returns `BacklogError::InvalidInput` if either field is blank or spans several lines.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> BacklogResult<Self> {
        let name = name.into().trim().to_string();
        let email = email.into().trim().to_string();
        for (field, value) in [("name", &name), ("email", &email)] {
            if value.is_empty() || value.contains(['\n', '\r']) {
                return Err(BacklogError::InvalidInput(format!(
                    "commit author {field} must be a single non-empty line"
                )));
            }
        }
        Ok(Self { name, email })
    }

    fn signature(&self) -> BacklogResult<git2::Signature<'static>> {
        git2::Signature::now(&self.name, &self.email).map_err(BacklogError::GitSignature)
    }
}

/// What a merge of the remote branch did to the local branch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MergeOutcome {
    /// Nothing to merge: the remote branch is absent or already contained.
    UpToDate,
    /// The local branch moved forward to the remote commit.
    FastForward,
    /// A merge commit joining both histories was written.
    Merged,
}

/// Operations the sync flow needs from a version control system.
pub trait VersionControl {
    /// Stages every change in the working tree, deletions included.
    fn add_all(&self) -> BacklogResult<()>;

    /// Commits the staged tree, returning `None` when it matches `HEAD`.
    fn commit(&self, author: &CommitAuthor, message: &str) -> BacklogResult<Option<git2::Oid>>;

    fn fetch(&self) -> BacklogResult<()>;

    /// Merges the fetched remote branch into the local branch.
    ///
    /// Conflicts are reported as `BacklogError::MergeConflict` and left in place for
    /// [`abort_merge`](VersionControl::abort_merge).
    fn merge(&self, author: &CommitAuthor) -> BacklogResult<MergeOutcome>;

    fn abort_merge(&self) -> BacklogResult<()>;

    fn push(&self) -> BacklogResult<()>;
}

/// Runs add → commit → fetch → merge → push.
///
/// An empty commit is skipped; the remaining steps still run so remote changes are picked
/// up. On a merge conflict the merge is aborted before the error is returned, and nothing
/// is pushed.
pub fn sync_repository(
    vc: &dyn VersionControl,
    author: &CommitAuthor,
    message: &str,
) -> BacklogResult<MergeOutcome> {
    vc.add_all()?;
    match vc.commit(author, message)? {
        Some(oid) => tracing::info!(%oid, "committed local changes"),
        None => tracing::info!("no local changes to commit"),
    }

    vc.fetch()?;
    let outcome = match vc.merge(author) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(error = %err, "merge failed, aborting");
            vc.abort_merge()?;
            return Err(err);
        }
    };
    tracing::info!(?outcome, "merged remote changes");

    vc.push()?;
    tracing::info!("pushed");
    Ok(outcome)
}

/// Service for Git operations on the repository rooted at `workdir`.
pub struct GitService {
    repo: git2::Repository,
    workdir: PathBuf,
    remote: String,
    branch: String,
}

impl GitService {
    /// Create a new repository at `workdir` with `HEAD` on the (unborn) branch.
    pub fn init(workdir: &Path) -> BacklogResult<Self> {
        let repo = git2::Repository::init(workdir).map_err(BacklogError::GitInit)?;
        let service = Self::from_repo(repo, workdir);
        service.ensure_branch_head()?;
        Ok(service)
    }

    /// Open an existing repository at `workdir`.
    pub fn open(workdir: &Path) -> BacklogResult<Self> {
        let repo = git2::Repository::open(workdir).map_err(BacklogError::GitOpen)?;
        Ok(Self::from_repo(repo, workdir))
    }

    fn from_repo(repo: git2::Repository, workdir: &Path) -> Self {
        Self {
            repo,
            workdir: workdir.to_path_buf(),
            remote: DEFAULT_REMOTE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Registers `url` as the configured remote.
    pub fn add_remote(&self, url: &str) -> BacklogResult<()> {
        self.repo
            .remote(&self.remote, url)
            .map_err(BacklogError::GitRemote)?;
        Ok(())
    }

    fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    fn tracking_ref(&self) -> String {
        format!("refs/remotes/{}/{}", self.remote, self.branch)
    }

    /// Ensure `HEAD` points at the configured branch.
    ///
    /// For newly initialised repositories this creates an "unborn" branch until the first
    /// commit is written.
    fn ensure_branch_head(&self) -> BacklogResult<()> {
        self.repo
            .set_head(&self.branch_ref())
            .map_err(BacklogError::GitSetHead)
    }

    /// Resolve the parent commit(s) for a new commit.
    ///
    /// - If `HEAD` exists, the parent list is `[HEAD]`.
    /// - If the repository is empty (`UnbornBranch`/`NotFound`), the parent list is empty.
    fn resolve_head_parents(&self) -> BacklogResult<Vec<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(BacklogError::GitPeel)?;
                Ok(vec![commit])
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(vec![]),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(vec![]),
            Err(e) => Err(BacklogError::GitHead(e)),
        }
    }

    fn remote(&self) -> BacklogResult<git2::Remote<'_>> {
        self.repo
            .find_remote(&self.remote)
            .map_err(BacklogError::GitRemote)
    }

    fn checkout_head(&self) -> BacklogResult<()> {
        self.repo
            .checkout_head(Some(git2::build::CheckoutBuilder::new().force()))
            .map_err(BacklogError::GitCheckout)
    }

    fn conflicted_paths(&self, index: &git2::Index) -> BacklogResult<Vec<String>> {
        let mut paths = Vec::new();
        for conflict in index.conflicts().map_err(BacklogError::GitIndex)? {
            let conflict = conflict.map_err(BacklogError::GitIndex)?;
            let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
            if let Some(entry) = entry {
                paths.push(String::from_utf8_lossy(&entry.path).into_owned());
            }
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}

/// Credentials from an SSH agent or the configured Git credential helper.
fn remote_callbacks<'a>(config: Option<&'a git2::Config>) -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(move |url, username, allowed| {
        if allowed.contains(git2::CredentialType::SSH_KEY) {
            return git2::Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        if allowed.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
            if let Some(config) = config {
                return git2::Cred::credential_helper(config, url, username);
            }
        }
        git2::Cred::default()
    });
    callbacks
}

impl VersionControl for GitService {
    fn add_all(&self) -> BacklogResult<()> {
        let mut index = self.repo.index().map_err(BacklogError::GitIndex)?;
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .map_err(BacklogError::GitAdd)?;
        index
            .update_all(["*"].iter(), None)
            .map_err(BacklogError::GitAdd)?;
        index.write().map_err(BacklogError::GitIndex)?;
        Ok(())
    }

    fn commit(&self, author: &CommitAuthor, message: &str) -> BacklogResult<Option<git2::Oid>> {
        self.ensure_branch_head()?;
        let mut index = self.repo.index().map_err(BacklogError::GitIndex)?;
        let tree_id = index.write_tree().map_err(BacklogError::GitWriteTree)?;

        let parents = self.resolve_head_parents()?;
        let unchanged = match parents.first() {
            Some(head) => head.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            return Ok(None);
        }

        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(BacklogError::GitFindTree)?;
        let sig = author.signature()?;
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .map_err(BacklogError::GitCommit)?;
        Ok(Some(oid))
    }

    fn fetch(&self) -> BacklogResult<()> {
        let mut remote = self.remote()?;
        let config = self.repo.config().ok();
        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(remote_callbacks(config.as_ref()));

        let refspec = format!("+{}:{}", self.branch_ref(), self.tracking_ref());
        remote
            .fetch(&[refspec.as_str()], Some(&mut options), None)
            .map_err(BacklogError::GitFetch)?;
        tracing::debug!(remote = %self.remote, branch = %self.branch, "fetched");
        Ok(())
    }

    fn merge(&self, author: &CommitAuthor) -> BacklogResult<MergeOutcome> {
        let tracking = match self.repo.find_reference(&self.tracking_ref()) {
            Ok(reference) => reference,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                tracing::debug!(tracking = %self.tracking_ref(), "no remote branch yet");
                return Ok(MergeOutcome::UpToDate);
            }
            Err(e) => return Err(BacklogError::GitReference(e)),
        };
        let incoming = self
            .repo
            .reference_to_annotated_commit(&tracking)
            .map_err(BacklogError::GitMerge)?;
        let (analysis, _) = self
            .repo
            .merge_analysis(&[&incoming])
            .map_err(BacklogError::GitMerge)?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome::UpToDate);
        }

        if analysis.is_unborn() || analysis.is_fast_forward() {
            self.repo
                .reference(&self.branch_ref(), incoming.id(), true, "sync: fast-forward")
                .map_err(BacklogError::GitReference)?;
            self.ensure_branch_head()?;
            self.checkout_head()?;
            return Ok(MergeOutcome::FastForward);
        }

        self.repo
            .merge(&[&incoming], None, None)
            .map_err(BacklogError::GitMerge)?;
        let mut index = self.repo.index().map_err(BacklogError::GitIndex)?;
        if index.has_conflicts() {
            let paths = self.conflicted_paths(&index)?;
            return Err(BacklogError::MergeConflict(paths));
        }

        let tree_id = index.write_tree().map_err(BacklogError::GitWriteTree)?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(BacklogError::GitFindTree)?;
        let theirs = self
            .repo
            .find_commit(incoming.id())
            .map_err(BacklogError::GitMerge)?;
        let parents = self.resolve_head_parents()?;
        let mut parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        parent_refs.push(&theirs);

        let sig = author.signature()?;
        let message = format!("Merge {}/{}", self.remote, self.branch);
        self.repo
            .commit(Some("HEAD"), &sig, &sig, &message, &tree, &parent_refs)
            .map_err(BacklogError::GitCommit)?;
        self.repo.cleanup_state().map_err(BacklogError::GitMerge)?;
        Ok(MergeOutcome::Merged)
    }

    fn abort_merge(&self) -> BacklogResult<()> {
        let head = self
            .repo
            .head()
            .map_err(BacklogError::GitHead)?
            .peel_to_commit()
            .map_err(BacklogError::GitPeel)?;
        self.repo
            .reset(
                head.as_object(),
                git2::ResetType::Hard,
                Some(git2::build::CheckoutBuilder::new().force()),
            )
            .map_err(BacklogError::GitCheckout)?;
        self.repo.cleanup_state().map_err(BacklogError::GitMerge)?;
        Ok(())
    }

    fn push(&self) -> BacklogResult<()> {
        let mut remote = self.remote()?;
        let config = self.repo.config().ok();
        let rejected: RefCell<Option<String>> = RefCell::new(None);

        {
            let mut callbacks = remote_callbacks(config.as_ref());
            callbacks.push_update_reference(|reference, status| {
                if let Some(status) = status {
                    *rejected.borrow_mut() = Some(format!("{reference}: {status}"));
                }
                Ok(())
            });
            let mut options = git2::PushOptions::new();
            options.remote_callbacks(callbacks);

            let refspec = format!("{0}:{0}", self.branch_ref());
            remote
                .push(&[refspec.as_str()], Some(&mut options))
                .map_err(BacklogError::GitPush)?;
        }

        if let Some(reason) = rejected.into_inner() {
            return Err(BacklogError::GitPush(git2::Error::from_str(&reason)));
        }
        tracing::debug!(remote = %self.remote, branch = %self.branch, "pushed");
        Ok(())
    }
}
