//! Markdown links between backlog documents.
//!
//! Every link is relative to the directory of the page it is written into (`base_dir`).

use crate::constants::{HOME_FILE_NAME, MARKDOWN_EXTENSION, TAGS_FILE_NAME};
use crate::item::BacklogItem;
use crate::overview::BacklogOverview;
use crate::text_layout::{make_markdown_link, valid_file_name};
use std::path::Path;

pub fn make_item_link(item: &BacklogItem, base_dir: &Path) -> String {
    make_markdown_link(item.title(), &item.location(), base_dir)
}

/// Link titled with the overview title. Overviews without a path link to their title.
pub fn make_overview_link(overview: &BacklogOverview, base_dir: &Path) -> String {
    match overview.path() {
        Some(path) => make_markdown_link(overview.title(), path, base_dir),
        None => format!("[{}]({})", overview.title(), overview.title()),
    }
}

pub fn make_archive_link(archive_path: &Path, title: &str, base_dir: &Path) -> String {
    make_markdown_link(title, archive_path, base_dir)
}

/// Link titled `home` to the generated home page at the root.
pub fn make_index_link(root_dir: &Path, base_dir: &Path) -> String {
    make_markdown_link("home", &root_dir.join(HOME_FILE_NAME), base_dir)
}

pub fn make_tags_link(root_dir: &Path, base_dir: &Path) -> String {
    make_markdown_link("tag list", &root_dir.join(TAGS_FILE_NAME), base_dir)
}

/// File name of the page for `tag`: the sanitised lowercase tag plus `.md`.
pub fn tag_file_name(tag: &str) -> String {
    format!("{}.{MARKDOWN_EXTENSION}", valid_file_name(&tag.to_lowercase()))
}

/// Links `tag` to its page in `tags_dir`.
pub fn make_tag_link(tag: &str, tags_dir: &Path, base_dir: &Path) -> String {
    make_markdown_link(tag, &tags_dir.join(tag_file_name(tag)), base_dir)
}

/// Space-separated tag links, in the order given.
pub fn make_tag_links(tags: &[String], tags_dir: &Path, base_dir: &Path) -> String {
    tags.iter()
        .map(|tag| make_tag_link(tag, tags_dir, base_dir))
        .collect::<Vec<_>>()
        .join(" ")
}
