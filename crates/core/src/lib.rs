//! # Backlog Core
//!
//! Core logic for markdown backlogs kept in a Git repository.
//!
//! This crate contains the document model and file/folder management:
//! - Lenient parsing and deterministic serialisation of structured markdown documents
//! - Backlog items, backlog overviews, tag pages and the tables rendered from them
//! - Synchronisation of the backlog root through Git
//!
//! **No CLI concerns**: argument parsing, logging setup and environment handling belong in
//! the `backlog-cli` crate.

pub mod backlog;
pub mod config;
pub mod constants;
pub mod error;
pub mod git;
pub mod item;
pub mod links;
pub mod markdown;
pub mod overview;
pub mod status;
pub mod sync;
pub mod text_layout;
pub mod view;

pub use backlog::Backlog;
pub use config::{author_from_env_values, resolve_root_dir, BacklogConfig};
pub use error::{BacklogError, BacklogResult};
pub use git::{sync_repository, CommitAuthor, GitService, MergeOutcome, VersionControl};
pub use item::{new_item, BacklogItem};
pub use markdown::{MarkdownDocument, MarkdownGroup, MarkdownSchema};
pub use overview::BacklogOverview;
pub use status::BacklogItemStatus;
pub use sync::SyncAction;
pub use view::BacklogView;
