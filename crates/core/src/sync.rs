//! The `sync` action: refresh generated pages, then synchronise the repository.
//!
//! For every backlog directory under the root (a non-hidden sub-directory holding an
//! `overview.md`) the overview is rebuilt from the items on disk and given a links line
//! back to the home and tag list pages. The root then gets a `_Sidebar.md` linking every
//! overview, a `Home.md` listing the items in flight per backlog, a `tags.md` linking
//! every tag and one `tags/<tag>.md` page per tag. Finally the working tree goes through
//! [`sync_repository`].

use crate::backlog::Backlog;
use crate::config::BacklogConfig;
use crate::constants::{
    ARCHIVE_FILE_NAME, HOME_FILE_NAME, MARKDOWN_EXTENSION, OVERVIEW_FILE_NAME, SIDEBAR_FILE_NAME,
    TAGS_DIR_NAME, TAGS_FILE_NAME, TITLE_MARKER,
};
use crate::error::{BacklogError, BacklogResult};
use crate::git::{sync_repository, CommitAuthor, MergeOutcome, VersionControl};
use crate::item::BacklogItem;
use crate::links::{
    make_index_link, make_overview_link, make_tag_links, make_tags_link, tag_file_name,
};
use crate::overview::BacklogOverview;
use crate::status::BacklogItemStatus;
use crate::text_layout::{contains_ignore_case, join_markdown_links, wrap_lines_to_code_block};
use crate::view::{status_table_title, BacklogView};
use std::fs;
use std::path::{Path, PathBuf};

/// Line separator of the generated root pages (markdown hard line breaks).
const PAGE_LINE_SEPARATOR: &str = "  \n";

pub struct SyncAction {
    root_dir: PathBuf,
    author: CommitAuthor,
    message: String,
}

impl SyncAction {
    pub fn new(config: &BacklogConfig, message: impl Into<String>) -> Self {
        Self {
            root_dir: config.root_dir().to_path_buf(),
            author: config.author().clone(),
            message: message.into(),
        }
    }

    /// Refreshes the generated pages and synchronises through `vc`.
    pub fn execute(&self, vc: &dyn VersionControl) -> BacklogResult<MergeOutcome> {
        let backlog_dirs = self.backlog_dirs()?;
        tracing::info!(root = %self.root_dir.display(), backlogs = backlog_dirs.len(), "syncing");

        let changed = self.update_overviews(&backlog_dirs)?;
        tracing::info!(changed, "overviews updated");
        self.update_home(&backlog_dirs)?;
        self.update_sidebar(&backlog_dirs)?;
        let tags = self.update_tags(&backlog_dirs)?;
        tracing::info!(tags, "tag pages updated");

        sync_repository(vc, &self.author, &self.message)
    }

    /// Non-hidden sub-directories of the root that hold an overview, sorted by path.
    pub fn backlog_dirs(&self) -> BacklogResult<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root_dir).map_err(BacklogError::DirRead)? {
            let entry = entry.map_err(BacklogError::DirRead)?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && path.is_dir() && path.join(OVERVIEW_FILE_NAME).is_file() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Rebuilds and saves each overview; returns how many changed.
    pub fn update_overviews(&self, backlog_dirs: &[PathBuf]) -> BacklogResult<usize> {
        let mut changed = 0;
        for dir in backlog_dirs {
            let mut overview = BacklogOverview::load(dir.join(OVERVIEW_FILE_NAME))?;
            let backlog = Backlog::load(dir)?;

            let links = join_markdown_links(&[
                make_index_link(&self.root_dir, dir),
                make_tags_link(&self.root_dir, dir),
            ]);
            let links_changed = overview.links() != links;
            overview.set_links(&links);

            let archive_path = dir.join(ARCHIVE_FILE_NAME);
            if archive_path.is_file() {
                overview.set_archive_link(&archive_path, dir);
            }
            if overview.update(backlog.items(), dir) || links_changed {
                changed += 1;
            }
            overview.save()?;
        }
        Ok(changed)
    }

    /// Writes `Home.md`: per backlog, a heading linking its overview and the items in
    /// flight as a table.
    pub fn update_home(&self, backlog_dirs: &[PathBuf]) -> BacklogResult<()> {
        let status = BacklogItemStatus::Flying;
        let mut lines = Vec::new();
        for dir in backlog_dirs {
            let overview = BacklogOverview::load(dir.join(OVERVIEW_FILE_NAME))?;
            let backlog = Backlog::load(dir)?;

            lines.push(format!("### {}", make_overview_link(&overview, &self.root_dir)));
            let items = overview.ordered_items(status, backlog.items());
            let table = BacklogView.write_ascii_table(&items, &status_table_title(status), false);
            lines.extend(wrap_lines_to_code_block(&table));
        }
        write_page(&self.root_dir.join(HOME_FILE_NAME), &lines)
    }

    /// Writes `tags.md` and one page per tag under `tags/`, removing pages of tags no item
    /// carries any more. Returns the number of tags.
    ///
    /// Tags are matched case-insensitively; the first spelling met names the page. Each tag
    /// page lists, per backlog, the tagged items in overview order as a markdown table.
    pub fn update_tags(&self, backlog_dirs: &[PathBuf]) -> BacklogResult<usize> {
        let tags_dir = self.root_dir.join(TAGS_DIR_NAME);
        let mut backlogs = Vec::with_capacity(backlog_dirs.len());
        let mut tags: Vec<String> = Vec::new();
        for dir in backlog_dirs {
            let overview = BacklogOverview::load(dir.join(OVERVIEW_FILE_NAME))?;
            let backlog = Backlog::load(dir)?;
            for tag in backlog.items().iter().flat_map(BacklogItem::tags) {
                if !contains_ignore_case(&tags, &tag) {
                    tags.push(tag);
                }
            }
            backlogs.push((overview, backlog));
        }
        tags.sort_by_key(|tag| tag.to_lowercase());

        let mut list = vec![format!("{TITLE_MARKER}Tags")];
        if !tags.is_empty() {
            list.push(make_tag_links(&tags, &tags_dir, &self.root_dir));
            fs::create_dir_all(&tags_dir).map_err(BacklogError::FileWrite)?;
        }
        write_page(&self.root_dir.join(TAGS_FILE_NAME), &list)?;

        let mut pages = Vec::with_capacity(tags.len());
        for tag in &tags {
            let mut lines = vec![format!("{TITLE_MARKER}{tag}")];
            for (overview, backlog) in &backlogs {
                let tagged: Vec<&BacklogItem> = BacklogItemStatus::ALL
                    .into_iter()
                    .flat_map(|status| overview.ordered_items(status, backlog.items()))
                    .filter(|item| item.has_tag(tag))
                    .collect();
                if tagged.is_empty() {
                    continue;
                }
                lines.push(format!("### {}", make_overview_link(overview, &tags_dir)));
                lines.extend(BacklogView.write_markdown_table(&tagged, &tags_dir));
            }
            let file_name = tag_file_name(tag);
            write_page(&tags_dir.join(&file_name), &lines)?;
            pages.push(file_name);
        }
        remove_stale_pages(&tags_dir, &pages)?;
        Ok(tags.len())
    }

    /// Writes `_Sidebar.md`: one overview link per backlog.
    pub fn update_sidebar(&self, backlog_dirs: &[PathBuf]) -> BacklogResult<()> {
        let mut lines = Vec::new();
        for dir in backlog_dirs {
            let overview = BacklogOverview::load(dir.join(OVERVIEW_FILE_NAME))?;
            lines.push(make_overview_link(&overview, &self.root_dir));
        }
        write_page(&self.root_dir.join(SIDEBAR_FILE_NAME), &lines)
    }
}

fn write_page(path: &Path, lines: &[String]) -> BacklogResult<()> {
    let content = lines.join(PAGE_LINE_SEPARATOR);
    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        return Ok(());
    }
    fs::write(path, content).map_err(BacklogError::FileWrite)?;
    tracing::debug!(path = %path.display(), "wrote page");
    Ok(())
}

fn remove_stale_pages(tags_dir: &Path, pages: &[String]) -> BacklogResult<()> {
    if !tags_dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(tags_dir).map_err(BacklogError::DirRead)? {
        let path = entry.map_err(BacklogError::DirRead)?.path();
        let is_page = path.is_file()
            && path.extension().is_some_and(|ext| ext == MARKDOWN_EXTENSION);
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_page && !pages.contains(&name) {
            fs::remove_file(&path).map_err(BacklogError::FileWrite)?;
            tracing::debug!(path = %path.display(), "removed stale tag page");
        }
    }
    Ok(())
}
