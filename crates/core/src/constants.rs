//! Constants used throughout the backlog core crate.
//!
//! File names, metadata keys and markdown markers live here so the document
//! conventions stay consistent between items, overviews and the sync pages.

/// Filename of the per-backlog overview document.
pub const OVERVIEW_FILE_NAME: &str = "overview.md";

/// Filename of the per-backlog archive document.
pub const ARCHIVE_FILE_NAME: &str = "archive.md";

/// Filename of the root tag list page, linking every tag page.
pub const TAGS_FILE_NAME: &str = "tags.md";

/// Directory under the root holding one page per tag.
pub const TAGS_DIR_NAME: &str = "tags";

/// Filename of the generated home page at the root.
pub const HOME_FILE_NAME: &str = "Home.md";

/// Filename of the generated sidebar page at the root.
pub const SIDEBAR_FILE_NAME: &str = "_Sidebar.md";

/// Extension of every backlog document.
pub const MARKDOWN_EXTENSION: &str = "md";

/// Prefix of the document title line.
pub const TITLE_MARKER: &str = "# ";

/// Prefix of an overview group heading.
pub const GROUP_MARKER: &str = "### ";

/// Line pattern that starts the overview footer, e.g. `[Archived stories](archive.md)`.
pub const OVERVIEW_FOOTER_PATTERN: &str = r"\[Archived [^\]]*\]\([^)]*\)";

/// Title of the archive link written into overview footers.
pub const ARCHIVED_STORIES_TITLE: &str = "Archived stories";

pub const TITLE_METADATA_KEY: &str = "Title";
pub const CREATED_METADATA_KEY: &str = "Created";
pub const MODIFIED_METADATA_KEY: &str = "Modified";
pub const AUTHOR_METADATA_KEY: &str = "Author";
pub const STATUS_METADATA_KEY: &str = "Status";
pub const ASSIGNED_METADATA_KEY: &str = "Assigned";
pub const ESTIMATE_METADATA_KEY: &str = "Estimate";
pub const TAGS_METADATA_KEY: &str = "Tags";

/// Separator between tags in the `Tags` metadata value.
pub const TAG_SEPARATOR: char = ',';

/// Branch every synchronised repository standardises on.
pub const DEFAULT_BRANCH: &str = "main";

/// Remote used for fetch and push when none is configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// Commit message used by `backlog sync` when none is given.
pub const DEFAULT_SYNC_MESSAGE: &str = "sync";
