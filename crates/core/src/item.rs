//! A single backlog item stored as one markdown file.
//!
//! Item files carry only a metadata block and a free-text description:
//!
//! ```markdown
//! Title: Fix login redirect
//! Created: 2024-03-05 02:07 PM
//! Modified: 2024-03-06 09:15 AM
//! Author: alice
//! Status: flying
//! Assigned: bob
//! Estimate: 3
//! Tags: auth, web
//!
//! Users land on the home page instead of the page they asked for.
//! ```

use crate::constants::{
    ASSIGNED_METADATA_KEY, AUTHOR_METADATA_KEY, CREATED_METADATA_KEY, ESTIMATE_METADATA_KEY,
    MARKDOWN_EXTENSION, MODIFIED_METADATA_KEY, STATUS_METADATA_KEY, TAGS_METADATA_KEY,
    TAG_SEPARATOR, TITLE_METADATA_KEY,
};
use crate::error::BacklogResult;
use crate::markdown::{MarkdownDocument, MarkdownSchema};
use crate::status::BacklogItemStatus;
use crate::text_layout::{
    collapse_whitespace, contains_ignore_case, current_timestamp, parse_timestamp,
};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

fn item_schema() -> MarkdownSchema {
    MarkdownSchema::new([
        TITLE_METADATA_KEY,
        CREATED_METADATA_KEY,
        MODIFIED_METADATA_KEY,
        AUTHOR_METADATA_KEY,
        STATUS_METADATA_KEY,
        ASSIGNED_METADATA_KEY,
        ESTIMATE_METADATA_KEY,
        TAGS_METADATA_KEY,
    ])
}

#[derive(Debug, Clone)]
pub struct BacklogItem {
    name: String,
    markdown: MarkdownDocument,
}

impl BacklogItem {
    /// Creates an unsaved item; `name` becomes the file stem once a path is assigned.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markdown: MarkdownDocument::new(item_schema()),
        }
    }

    /// Creates an unsaved item that will be written to `dir/<name>.md`.
    pub fn new_in(dir: &Path, name: impl Into<String>) -> Self {
        let mut item = Self::new(name);
        let path = dir.join(format!("{}.{MARKDOWN_EXTENSION}", item.name));
        item.markdown.set_path(path);
        item
    }

    /// Parses an item from text without touching the file system.
    pub fn parse(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            markdown: MarkdownDocument::parse(text, item_schema()),
        }
    }

    /// Loads the item stored at `path`; the name is the file stem.
    ///
    /// # Errors
    ///
    /// Returns `BacklogError::FileRead` if the file exists but cannot be read.
    pub fn load(path: impl AsRef<Path>) -> BacklogResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            markdown: MarkdownDocument::load(path, item_schema())?,
        })
    }

    pub fn save(&self) -> BacklogResult<()> {
        self.markdown.save()
    }

    pub fn content(&self) -> String {
        self.markdown.content()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.markdown.path()
    }

    /// Where the item lives, or `<name>.md` relative to the working directory when unsaved.
    pub fn location(&self) -> PathBuf {
        self.path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(format!("{}.{MARKDOWN_EXTENSION}", self.name)))
    }

    pub fn title(&self) -> &str {
        self.markdown.metadata_value(TITLE_METADATA_KEY)
    }

    pub fn set_title(&mut self, title: &str) {
        self.markdown.set_metadata_value(TITLE_METADATA_KEY, title);
    }

    pub fn created(&self) -> Option<NaiveDateTime> {
        parse_timestamp(self.markdown.metadata_value(CREATED_METADATA_KEY)).ok()
    }

    pub fn set_created(&mut self, timestamp: &str) {
        self.markdown.set_metadata_value(CREATED_METADATA_KEY, timestamp);
    }

    /// Last modification time; `None` when blank or unparseable.
    pub fn modified(&self) -> Option<NaiveDateTime> {
        parse_timestamp(self.markdown.metadata_value(MODIFIED_METADATA_KEY)).ok()
    }

    pub fn set_modified(&mut self, timestamp: &str) {
        self.markdown.set_metadata_value(MODIFIED_METADATA_KEY, timestamp);
    }

    /// Stamps `Modified` with the current time. Nothing else stamps it implicitly.
    pub fn touch_modified(&mut self) {
        self.markdown.touch_modified();
    }

    pub fn author(&self) -> &str {
        self.markdown.metadata_value(AUTHOR_METADATA_KEY)
    }

    pub fn set_author(&mut self, author: &str) {
        self.markdown.set_metadata_value(AUTHOR_METADATA_KEY, author);
    }

    /// The stored status text, verbatim.
    pub fn status_name(&self) -> &str {
        self.markdown.metadata_value(STATUS_METADATA_KEY)
    }

    /// The status, if the stored text names (or codes) a known one.
    pub fn status(&self) -> Option<BacklogItemStatus> {
        let value = self.status_name();
        BacklogItemStatus::from_name(value).or_else(|| BacklogItemStatus::from_code(value))
    }

    pub fn set_status(&mut self, status: BacklogItemStatus) {
        self.markdown
            .set_metadata_value(STATUS_METADATA_KEY, status.name());
    }

    pub fn assigned(&self) -> &str {
        self.markdown.metadata_value(ASSIGNED_METADATA_KEY)
    }

    pub fn set_assigned(&mut self, assigned: &str) {
        self.markdown.set_metadata_value(ASSIGNED_METADATA_KEY, assigned);
    }

    pub fn estimate(&self) -> &str {
        self.markdown.metadata_value(ESTIMATE_METADATA_KEY)
    }

    pub fn set_estimate(&mut self, estimate: &str) {
        self.markdown.set_metadata_value(ESTIMATE_METADATA_KEY, estimate);
    }

    /// The estimate as a number; blank or non-numeric estimates count as zero.
    pub fn estimate_points(&self) -> f64 {
        self.estimate()
            .parse::<f64>()
            .ok()
            .filter(|points| points.is_finite())
            .unwrap_or(0.0)
    }

    /// Tags in stored order, whitespace collapsed, without blanks or case-insensitive repeats.
    pub fn tags(&self) -> Vec<String> {
        normalise_tags(self.markdown.metadata_value(TAGS_METADATA_KEY).split(TAG_SEPARATOR))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        contains_ignore_case(&self.tags(), &collapse_whitespace(tag))
    }

    pub fn set_tags<S: AsRef<str>>(&mut self, tags: &[S]) {
        let tags = normalise_tags(tags.iter().map(|tag| tag.as_ref()));
        let separator = format!("{TAG_SEPARATOR} ");
        self.markdown
            .set_metadata_value(TAGS_METADATA_KEY, tags.join(separator.as_str()));
    }

    pub fn description(&self) -> &str {
        self.markdown.free_text()
    }

    /// Replaces the description. An empty description leaves no trailing blank line.
    pub fn set_description(&mut self, description: &str) {
        self.markdown.set_free_text(description.trim_end_matches('\n'));
    }
}

fn normalise_tags<'a>(tags: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for tag in tags {
        let tag = collapse_whitespace(tag);
        if !tag.is_empty() && !contains_ignore_case(&result, &tag) {
            result.push(tag);
        }
    }
    result
}

/// Builds a new item with creation metadata filled in.
pub fn new_item(
    dir: &Path,
    name: impl Into<String>,
    title: &str,
    author: &str,
    status: BacklogItemStatus,
) -> BacklogItem {
    let mut item = BacklogItem::new_in(dir, name);
    let now = current_timestamp();
    item.set_title(title);
    item.set_created(&now);
    item.set_modified(&now);
    item.set_author(author);
    item.set_status(status);
    item
}
