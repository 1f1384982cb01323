#[derive(Debug, thiserror::Error)]
pub enum BacklogError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read backlog file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write backlog file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read backlog directory: {0}")]
    DirRead(std::io::Error),
    #[error("document has no storage path")]
    MissingPath,
    #[error("invalid footer pattern: {0}")]
    FooterPattern(regex::Error),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("failed to initialise git repository: {0}")]
    GitInit(git2::Error),
    #[error("failed to open git repository: {0}")]
    GitOpen(git2::Error),
    #[error("failed to access git index: {0}")]
    GitIndex(git2::Error),
    #[error("failed to add files to git index: {0}")]
    GitAdd(git2::Error),
    #[error("failed to write git tree: {0}")]
    GitWriteTree(git2::Error),
    #[error("failed to find git tree: {0}")]
    GitFindTree(git2::Error),
    #[error("failed to create git signature: {0}")]
    GitSignature(git2::Error),
    #[error("failed to create git commit: {0}")]
    GitCommit(git2::Error),
    #[error("failed to get git head: {0}")]
    GitHead(git2::Error),
    #[error("failed to set git head: {0}")]
    GitSetHead(git2::Error),
    #[error("failed to peel git commit: {0}")]
    GitPeel(git2::Error),
    #[error("failed to create/update git reference: {0}")]
    GitReference(git2::Error),
    #[error("failed to access git remote: {0}")]
    GitRemote(git2::Error),
    #[error("can't fetch: {0}")]
    GitFetch(git2::Error),
    #[error("can't merge: {0}")]
    GitMerge(git2::Error),
    #[error("can't merge: conflicts in {}", .0.join(", "))]
    MergeConflict(Vec<String>),
    #[error("failed to check out git tree: {0}")]
    GitCheckout(git2::Error),
    #[error("can't push: {0}")]
    GitPush(git2::Error),
}

pub type BacklogResult<T> = std::result::Result<T, BacklogError>;
