//! Structured markdown documents for backlog items and overviews.
//!
//! Backlog files are hand-edited markdown, so the model here is lenient on the way in and
//! strict on the way out: parsing never fails, and serializing always applies the same
//! section layout so untouched documents come back byte for byte.
//!
//! Document layout produced by [`MarkdownDocument::content`]:
//!
//! ```markdown
//! # Title
//!
//! Free-text header
//!
//! [home](../Home.md) || [tag list](../tags.md)
//!
//! Created: 2024-03-05 02:07 PM
//! Modified: 2024-03-05 02:07 PM
//!
//! Free text following the metadata
//!
//! ### Group title
//! first line
//! second line
//!
//! ### Another group
//! only line
//!
//! [Archived stories](archive.md)
//! ```
//!
//! Every section is optional and sections are separated by exactly one blank line. Which
//! metadata keys exist, which prefix marks a group heading and which line starts the
//! footer are declared up front in a [`MarkdownSchema`].

use crate::constants::{MODIFIED_METADATA_KEY, TITLE_MARKER};
use crate::error::{BacklogError, BacklogResult};
use crate::text_layout::current_timestamp;
use regex::Regex;
use std::borrow::Cow;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// A line made only of markdown links, optionally separated by whitespace or `||`.
static LINKS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[[^\]]*\]\([^)]*\)(?:\s*(?:\|\|)?\s*\[[^\]]*\]\([^)]*\))*\s*$")
        .expect("valid links line regex")
});

/// Declares how a family of documents is laid out.
#[derive(Debug, Clone)]
pub struct MarkdownSchema {
    metadata_keys: Vec<String>,
    group_marker: Option<String>,
    footer_pattern: Option<Regex>,
}

impl MarkdownSchema {
    /// Creates a schema recognising `metadata_keys`, in the order they are serialized.
    pub fn new<I, S>(metadata_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metadata_keys: metadata_keys.into_iter().map(Into::into).collect(),
            group_marker: None,
            footer_pattern: None,
        }
    }

    /// Enables groups, each introduced by a line starting with `marker` (e.g. `"### "`).
    ///
    /// An empty marker would turn every line into a heading, so it leaves groups disabled.
    pub fn with_group_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        self.group_marker = (!marker.is_empty()).then_some(marker);
        self
    }

    /// Enables a footer starting at the first line fully matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `BacklogError::FooterPattern` if `pattern` is not a valid regex.
    pub fn with_footer_pattern(mut self, pattern: &str) -> BacklogResult<Self> {
        let anchored =
            Regex::new(&format!("^(?:{pattern})$")).map_err(BacklogError::FooterPattern)?;
        self.footer_pattern = Some(anchored);
        Ok(self)
    }

    pub fn metadata_keys(&self) -> &[String] {
        &self.metadata_keys
    }

    pub fn group_marker(&self) -> Option<&str> {
        self.group_marker.as_deref()
    }

    pub fn declares(&self, key: &str) -> bool {
        self.metadata_keys.iter().any(|declared| declared == key)
    }

    fn is_group_heading(&self, line: &str) -> bool {
        self.group_marker
            .as_deref()
            .is_some_and(|marker| line.starts_with(marker))
    }

    fn is_footer_start(&self, line: &str) -> bool {
        self.footer_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(line))
    }

    /// Splits `Key: value` when `Key` is declared; any other line is not metadata.
    fn metadata_entry<'l>(&self, line: &'l str) -> Option<(&'l str, &'l str)> {
        let (key, value) = line.split_once(':')?;
        self.declares(key).then(|| (key, value.trim()))
    }

    fn is_title_line(&self, line: &str) -> bool {
        line.starts_with(TITLE_MARKER)
            && !self.is_group_heading(line)
            && self.metadata_entry(line).is_none()
    }
}

/// A named, ordered list of lines. Line order is priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownGroup {
    title: String,
    lines: Vec<String>,
    /// Parsed from a heading with no body at all, not even a blank line. While empty, such a
    /// group is written back as the bare heading.
    bare_heading: bool,
}

impl MarkdownGroup {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
            bare_heading: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Replaces the line at `index`, returning the previous text.
    ///
    /// Out-of-range indexes leave the group untouched and return `None`.
    pub fn set_line(&mut self, index: usize, text: impl Into<String>) -> Option<String> {
        let slot = self.lines.get_mut(index)?;
        Some(std::mem::replace(slot, text.into()))
    }

    pub fn add_line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    /// Inserts before `index`; `index == count()` appends. Returns false when out of range.
    pub fn insert_line(&mut self, index: usize, text: impl Into<String>) -> bool {
        if index > self.lines.len() {
            return false;
        }
        self.lines.insert(index, text.into());
        true
    }

    pub fn delete_line(&mut self, index: usize) -> Option<String> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    pub fn set_lines(&mut self, lines: Vec<String>) {
        self.lines = lines;
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// One parsed markdown file: title, header, links, metadata, free text, groups, footer.
#[derive(Debug, Clone)]
pub struct MarkdownDocument {
    schema: MarkdownSchema,
    path: Option<PathBuf>,
    title: String,
    header: String,
    links: String,
    metadata: Vec<(String, String)>,
    free_text: String,
    groups: Vec<MarkdownGroup>,
    footer: Vec<String>,
    trailing_newline: bool,
    crlf: bool,
}

impl MarkdownDocument {
    /// Creates an empty document with every declared metadata key present and blank.
    pub fn new(schema: MarkdownSchema) -> Self {
        let metadata = schema
            .metadata_keys
            .iter()
            .map(|key| (key.clone(), String::new()))
            .collect();
        Self {
            schema,
            path: None,
            title: String::new(),
            header: String::new(),
            links: String::new(),
            metadata,
            free_text: String::new(),
            groups: Vec::new(),
            footer: Vec::new(),
            trailing_newline: true,
            crlf: false,
        }
    }

    /// Parses `text` into a document.
    ///
    /// Parsing is total: missing or malformed sections come back empty instead of failing.
    /// The sections are peeled off in a fixed order, each step handing the remaining lines
    /// to the next: trailing newline, title, footer, groups, then the preamble (header,
    /// links line, metadata block and free text).
    ///
    /// Text containing any `\r\n` is read as CRLF: it is parsed with `\n` endings and
    /// [`content`](Self::content) writes every line ending back as `\r\n`, so a file with
    /// mixed endings comes back uniformly CRLF.
    pub fn parse(text: &str, schema: MarkdownSchema) -> Self {
        let crlf = text.contains("\r\n");
        let normalised = if crlf {
            Cow::Owned(text.replace("\r\n", "\n"))
        } else {
            Cow::Borrowed(text)
        };
        let (text, trailing_newline) = match normalised.strip_suffix('\n') {
            Some(stripped) => (stripped, true),
            None => (&*normalised, false),
        };
        let lines: Vec<&str> = text.split('\n').collect();

        let (title, rest) = take_title(&lines, &schema);
        let (rest, footer) = take_footer(rest, &schema);
        let (preamble, groups) = take_groups(rest, &schema);
        let preamble = parse_preamble(preamble, &schema);

        let mut document = Self::new(schema);
        document.title = title;
        document.header = preamble.header;
        document.links = preamble.links;
        document.free_text = preamble.free_text;
        document.groups = groups;
        document.footer = footer;
        document.trailing_newline = trailing_newline;
        document.crlf = crlf;
        // First occurrence of a key wins.
        for (key, value) in preamble.metadata.into_iter().rev() {
            document.set_metadata_value(&key, value);
        }
        document
    }

    /// Loads the document stored at `path`.
    ///
    /// A missing file yields an empty document bound to `path`, so new items and overviews
    /// can be created with the same call.
    ///
    /// # Errors
    ///
    /// Returns `BacklogError::FileRead` if the file exists but cannot be read.
    pub fn load(path: impl AsRef<Path>, schema: MarkdownSchema) -> BacklogResult<Self> {
        let path = path.as_ref();
        let mut document = match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, schema),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "document not found, starting empty");
                Self::new(schema)
            }
            Err(e) => return Err(BacklogError::FileRead(e)),
        };
        document.path = Some(path.to_path_buf());
        Ok(document)
    }

    /// Writes the serialized document back to its path.
    ///
    /// The file is left untouched when its content is already identical.
    ///
    /// # Errors
    ///
    /// Returns `BacklogError::MissingPath` for documents without a path and
    /// `BacklogError::FileWrite` if writing fails.
    pub fn save(&self) -> BacklogResult<()> {
        let path = self.path.as_deref().ok_or(BacklogError::MissingPath)?;
        let content = self.content();
        if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
            return Ok(());
        }
        fs::write(path, content).map_err(BacklogError::FileWrite)?;
        tracing::debug!(path = %path.display(), "saved document");
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn schema(&self) -> &MarkdownSchema {
        &self.schema
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into().trim().to_string();
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn set_header(&mut self, header: impl Into<String>) {
        self.header = header.into();
    }

    pub fn links(&self) -> &str {
        &self.links
    }

    pub fn set_links(&mut self, links: impl Into<String>) {
        self.links = links.into();
    }

    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    pub fn set_free_text(&mut self, free_text: impl Into<String>) {
        self.free_text = free_text.into();
    }

    pub fn footer(&self) -> &[String] {
        &self.footer
    }

    pub fn set_footer(&mut self, footer: Vec<String>) {
        self.footer = footer;
    }

    /// Declared keys with their values, in declared order.
    pub fn metadata(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Value of a declared key; blank for keys that are absent or not declared.
    pub fn metadata_value(&self, key: &str) -> &str {
        self.metadata
            .iter()
            .find(|(declared, _)| declared == key)
            .map_or("", |(_, value)| value.as_str())
    }

    /// Sets a declared key, flattening the value onto one line.
    ///
    /// Returns false, leaving the document unchanged, when `key` is not declared.
    pub fn set_metadata_value(&mut self, key: &str, value: impl Into<String>) -> bool {
        let Some((_, slot)) = self.metadata.iter_mut().find(|(declared, _)| declared == key)
        else {
            tracing::warn!(key, "ignoring undeclared metadata key");
            return false;
        };
        *slot = value.into().replace(['\r', '\n'], " ").trim().to_string();
        true
    }

    /// Stamps the `Modified` key with the current time, when the schema declares it.
    pub fn touch_modified(&mut self) -> bool {
        if !self.schema.declares(MODIFIED_METADATA_KEY) {
            return false;
        }
        self.set_metadata_value(MODIFIED_METADATA_KEY, current_timestamp())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &[MarkdownGroup] {
        &self.groups
    }

    pub fn find_group(&self, name: &str) -> Option<&MarkdownGroup> {
        let name = name.trim();
        self.groups.iter().find(|group| group.title == name)
    }

    /// Returns the group titled `name`, appending a new empty one if there is none yet.
    ///
    /// Returns `None` when the schema declares no group marker, since such a document has
    /// no way to write a heading that parses back as a group.
    pub fn group(&mut self, name: &str) -> Option<&mut MarkdownGroup> {
        if self.schema.group_marker().is_none() {
            tracing::warn!(group = name, "schema has no group marker, ignoring group");
            return None;
        }
        let name = name.trim();
        let index = match self.groups.iter().position(|group| group.title == name) {
            Some(index) => index,
            None => {
                self.groups.push(MarkdownGroup::new(name));
                self.groups.len() - 1
            }
        };
        Some(&mut self.groups[index])
    }

    pub fn remove_group(&mut self, name: &str) -> Option<MarkdownGroup> {
        let name = name.trim();
        let index = self.groups.iter().position(|group| group.title == name)?;
        Some(self.groups.remove(index))
    }

    /// Serializes the document.
    ///
    /// Sections are emitted in a fixed order and joined by one blank line. Metadata follows
    /// the declared key order with two trailing spaces per line. A group without lines keeps
    /// its heading followed by an empty line, unless it was parsed as a bare heading.
    pub fn content(&self) -> String {
        let mut blocks: Vec<String> = Vec::new();

        if !self.title.is_empty() {
            blocks.push(format!("{TITLE_MARKER}{}", self.title));
        }
        if !self.header.is_empty() {
            blocks.push(self.header.clone());
        }
        if !self.links.is_empty() {
            blocks.push(self.links.clone());
        }
        if !self.metadata.is_empty() {
            let lines: Vec<String> = self
                .metadata
                .iter()
                .map(|(key, value)| format!("{key}: {value}  "))
                .collect();
            blocks.push(lines.join("\n"));
        }
        if !self.free_text.is_empty() {
            blocks.push(self.free_text.clone());
        }

        if let Some(marker) = self.schema.group_marker() {
            for group in &self.groups {
                if group.is_empty() && group.bare_heading {
                    blocks.push(format!("{marker}{}", group.title));
                } else {
                    blocks.push(format!("{marker}{}\n{}", group.title, group.lines.join("\n")));
                }
            }
        }

        if !self.footer.is_empty() {
            blocks.push(self.footer.join("\n"));
        }

        let mut content = blocks.join("\n\n");
        if self.trailing_newline {
            content.push('\n');
        }
        if self.crlf {
            content = content.replace('\n', "\r\n");
        }
        content
    }
}

/// Header, links, metadata and free text found before the first group.
struct Preamble {
    header: String,
    links: String,
    metadata: Vec<(String, String)>,
    free_text: String,
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn strip_leading_blank<'a>(lines: &'a [&'a str]) -> &'a [&'a str] {
    match lines.split_first() {
        Some((first, rest)) if is_blank(first) => rest,
        _ => lines,
    }
}

fn strip_trailing_blank<'a>(lines: &'a [&'a str]) -> &'a [&'a str] {
    match lines.split_last() {
        Some((last, rest)) if is_blank(last) => rest,
        _ => lines,
    }
}

fn trim_blank_lines<'a>(mut lines: &'a [&'a str]) -> &'a [&'a str] {
    while let Some((first, rest)) = lines.split_first() {
        if !is_blank(first) {
            break;
        }
        lines = rest;
    }
    while let Some((last, rest)) = lines.split_last() {
        if !is_blank(last) {
            break;
        }
        lines = rest;
    }
    lines
}

/// Entry: every line of the document.
/// Exit: the title text (empty unless the first line is a `# ` heading) and the lines
/// after the title and its blank separator.
fn take_title<'a>(lines: &'a [&'a str], schema: &MarkdownSchema) -> (String, &'a [&'a str]) {
    match lines.split_first() {
        Some((first, rest)) if schema.is_title_line(first) => {
            let title = first[TITLE_MARKER.len()..].trim().to_string();
            (title, strip_leading_blank(rest))
        }
        _ => (String::new(), lines),
    }
}

/// Entry: the lines after the title.
/// Exit: the lines before the footer (minus its blank separator) and the footer lines,
/// verbatim from the first line matching the footer pattern to the end.
fn take_footer<'a>(
    lines: &'a [&'a str],
    schema: &MarkdownSchema,
) -> (&'a [&'a str], Vec<String>) {
    match lines.iter().position(|line| schema.is_footer_start(line)) {
        Some(start) => {
            let footer = lines[start..].iter().map(|line| line.to_string()).collect();
            (strip_trailing_blank(&lines[..start]), footer)
        }
        None => (lines, Vec::new()),
    }
}

/// Entry: the lines between the title and the footer.
/// Exit: the preamble before the first heading and the groups in heading order.
///
/// Every group but the last loses one trailing blank separator. A body that is then a
/// single blank line is an empty group; no body at all is an empty bare heading. Repeated
/// headings merge into the first group.
fn take_groups<'a>(
    lines: &'a [&'a str],
    schema: &MarkdownSchema,
) -> (&'a [&'a str], Vec<MarkdownGroup>) {
    let Some(marker) = schema.group_marker() else {
        return (lines, Vec::new());
    };

    let starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with(marker))
        .map(|(index, _)| index)
        .collect();
    let Some(&first) = starts.first() else {
        return (lines, Vec::new());
    };

    let mut groups: Vec<MarkdownGroup> = Vec::new();
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(lines.len());
        let mut body = &lines[start + 1..end];
        if n + 1 < starts.len() {
            body = strip_trailing_blank(body);
        }
        let bare_heading = body.is_empty();
        let body: Vec<String> = match body {
            [only] if is_blank(only) => Vec::new(),
            _ => body.iter().map(|line| line.to_string()).collect(),
        };

        let title = lines[start][marker.len()..].trim();
        match groups.iter_mut().find(|group| group.title == title) {
            Some(existing) => existing.lines.extend(body),
            None => groups.push(MarkdownGroup {
                title: title.to_string(),
                lines: body,
                bare_heading,
            }),
        }
    }

    (strip_trailing_blank(&lines[..first]), groups)
}

/// Entry: the lines before the first group heading.
/// Exit: the header (links line removed), the links line, the metadata block entries and
/// the free text after the metadata block.
fn parse_preamble(lines: &[&str], schema: &MarkdownSchema) -> Preamble {
    let metadata_start = lines
        .iter()
        .position(|line| schema.metadata_entry(line).is_some())
        .unwrap_or(lines.len());
    let (head, tail) = lines.split_at(metadata_start);

    let metadata: Vec<(String, String)> = tail
        .iter()
        .map_while(|line| schema.metadata_entry(line))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let free_text = strip_leading_blank(&tail[metadata.len()..]).join("\n");

    let (header, links) = take_links(head);

    Preamble {
        header,
        links,
        metadata,
        free_text,
    }
}

/// Extracts the first links-only line, together with the blank line after it, from the
/// header region.
fn take_links(lines: &[&str]) -> (String, String) {
    let Some(index) = lines.iter().position(|line| LINKS_LINE.is_match(line)) else {
        return (trim_blank_lines(lines).join("\n"), String::new());
    };

    let links = lines[index].to_string();
    let mut header: Vec<&str> = lines[..index].to_vec();
    header.extend_from_slice(strip_leading_blank(&lines[index + 1..]));
    (trim_blank_lines(&header).join("\n"), links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GROUP_MARKER, OVERVIEW_FOOTER_PATTERN};

    const MARKDOWN_DATA: &str = concat!(
        "# Test backlog\n",
        "\n",
        "Root: qwerty\n",
        "\n",
        "[title1](link1) [title2](link2)\n",
        "\n",
        "Data: test\n",
        "\n",
        "### Doing\n",
        "Story 1 [link1](link1.md) (points) (assigned)  \n",
        "Story 2 [link2](link2.md) (points) (assigned)  \n",
        "\n",
        "### Planned\n",
        "Story 5 [link5](link5.md) (points) (assigned)  \n",
        "Story 6 [link6](link6.md) (points) (assigned)  \n",
        "Story 7 [link7](link7.md) (points) (assigned)  \n",
        "\n",
        "### Unplanned\n",
        "Story 4 [link4](link4.md) (points) (assigned)  \n",
        "Story 3 [link3](link3.md) (points) (assigned)  \n",
        "\n",
        "### Finished\n",
        "Story 8 [link8](link8.md) (points) (assigned)  \n",
        "\n",
        "[Archived stories](archive.md)",
    );

    const UPDATED_DATA: &str = concat!(
        "# New backlog\n",
        "\n",
        "Test: header\n",
        "\n",
        "[title1](link1) [title22](link22) [title3](link3)\n",
        "\n",
        "Data: test  \n",
        "\n",
        "### Doing\n",
        "Story 1 [link1](link1.md) 12 Mike\n",
        "Story 2 [link2](link2.md) (points) (assigned)  \n",
        "\n",
        "### Planned\n",
        "Story 5 [link5](link5.md) (points) (assigned)  \n",
        "Story 6 [link6](link6.md) (points) (assigned)  \n",
        "Story 7 [link7](link7.md) (points) (assigned)  \n",
        "Story 9 [link9](link9.md) 9 Robert\n",
        "\n",
        "### Unplanned\n",
        "Story 4 [link4](link4.md) (points) (assigned)  \n",
        "\n",
        "### Finished\n",
        "\n",
        "\n",
        "footer1\n",
        "footer2",
    );

    fn overview_schema() -> MarkdownSchema {
        MarkdownSchema::new(["Data"])
            .with_group_marker(GROUP_MARKER)
            .with_footer_pattern(OVERVIEW_FOOTER_PATTERN)
            .unwrap()
    }

    fn board_schema() -> MarkdownSchema {
        MarkdownSchema::new(Vec::<String>::new())
            .with_group_marker(GROUP_MARKER)
            .with_footer_pattern(OVERVIEW_FOOTER_PATTERN)
            .unwrap()
    }

    fn item_schema() -> MarkdownSchema {
        MarkdownSchema::new(["Title", "Status", "Estimate"])
    }

    #[test]
    fn test_load_reports_structure() {
        let mut content = MarkdownDocument::parse(MARKDOWN_DATA, overview_schema());
        assert_eq!(content.title(), "Test backlog");
        assert_eq!(content.header(), "Root: qwerty");
        assert_eq!(content.links(), "[title1](link1) [title2](link2)");
        assert_eq!(content.metadata_value("Data"), "test");
        assert_eq!(content.group_count(), 4);

        assert_eq!(content.group("Doing").unwrap().title(), "Doing");
        assert_eq!(content.group("Doing").unwrap().count(), 2);
        assert_eq!(content.group("Planned").unwrap().title(), "Planned");
        assert_eq!(content.group("Planned").unwrap().count(), 3);
        assert_eq!(content.group("Unplanned").unwrap().title(), "Unplanned");
        assert_eq!(content.group("Unplanned").unwrap().count(), 2);
        assert_eq!(content.group("Finished").unwrap().title(), "Finished");
        assert_eq!(content.group("Finished").unwrap().count(), 1);

        assert_eq!(
            content.group("Doing").unwrap().line(0),
            Some("Story 1 [link1](link1.md) (points) (assigned)  ")
        );
        assert_eq!(
            content.group("Planned").unwrap().line(2),
            Some("Story 7 [link7](link7.md) (points) (assigned)  ")
        );
        assert_eq!(
            content.group("Unplanned").unwrap().line(1),
            Some("Story 3 [link3](link3.md) (points) (assigned)  ")
        );
        assert_eq!(
            content.group("Finished").unwrap().line(0),
            Some("Story 8 [link8](link8.md) (points) (assigned)  ")
        );

        assert_eq!(content.footer().len(), 1);
        assert_eq!(content.footer()[0], "[Archived stories](archive.md)");
        assert_eq!(content.group_count(), 4);
    }

    #[test]
    fn test_selective_mutation_matches_fixture() {
        let mut content = MarkdownDocument::parse(MARKDOWN_DATA, overview_schema());
        content.set_title("New backlog");
        content.set_header("Test: header");
        content.set_links("[title1](link1) [title22](link22) [title3](link3)");
        content
            .group("Doing").unwrap()
            .set_line(0, "Story 1 [link1](link1.md) 12 Mike");
        content
            .group("Planned").unwrap()
            .add_line("Story 9 [link9](link9.md) 9 Robert");
        content.group("Unplanned").unwrap().delete_line(1);
        content.group("Finished").unwrap().delete_line(0);
        content.set_footer(vec!["footer1".to_string(), "footer2".to_string()]);

        assert_eq!(content.content(), UPDATED_DATA);
    }

    #[test]
    fn test_round_trip_is_identity_for_canonical_text() {
        let canonical = MARKDOWN_DATA.replace("Data: test\n", "Data: test  \n");
        let content = MarkdownDocument::parse(&canonical, overview_schema());
        assert_eq!(content.content(), canonical);

        let with_newline = format!("{canonical}\n");
        let content = MarkdownDocument::parse(&with_newline, overview_schema());
        assert_eq!(content.content(), with_newline);
    }

    #[test]
    fn test_round_trip_normalises_only_metadata_spacing() {
        let content = MarkdownDocument::parse(MARKDOWN_DATA, overview_schema());
        assert_eq!(
            content.content(),
            MARKDOWN_DATA.replace("Data: test\n", "Data: test  \n")
        );
    }

    #[test]
    fn test_emptied_group_survives_reload() {
        let mut content = MarkdownDocument::parse(MARKDOWN_DATA, overview_schema());
        content.group("Finished").unwrap().delete_line(0);
        let text = content.content();
        assert!(text.ends_with("### Finished\n\n\n[Archived stories](archive.md)"));

        let reloaded = MarkdownDocument::parse(&text, overview_schema());
        assert_eq!(reloaded.group_count(), 4);
        assert!(reloaded.find_group("Finished").unwrap().is_empty());
        assert_eq!(reloaded.footer(), ["[Archived stories](archive.md)"]);
        assert_eq!(reloaded.content(), text);
    }

    #[test]
    fn test_metadata_keeps_declared_order() {
        let schema = MarkdownSchema::new(["Alpha", "Beta", "Gamma"]);
        let mut content = MarkdownDocument::parse("Gamma: 3\nAlpha: 1\nBeta: 2", schema);
        assert_eq!(content.metadata_value("Beta"), "2");

        content.set_metadata_value("Gamma", "three");
        assert_eq!(content.content(), "Alpha: 1  \nBeta: 2  \nGamma: three  ");
    }

    #[test]
    fn test_absent_declared_keys_are_blank() {
        let content = MarkdownDocument::parse("Title: Story  \n", item_schema());
        assert_eq!(content.metadata_value("Status"), "");
        assert_eq!(
            content.content(),
            "Title: Story  \nStatus:   \nEstimate:   \n"
        );
        let keys: Vec<&str> = content.metadata().map(|(key, _)| key).collect();
        assert_eq!(keys, ["Title", "Status", "Estimate"]);
    }

    #[test]
    fn test_undeclared_keys_stay_in_header() {
        let content = MarkdownDocument::parse(
            "# Doc\n\nOwner: someone\n\nTitle: Real  \n",
            item_schema(),
        );
        assert_eq!(content.header(), "Owner: someone");
        assert_eq!(content.metadata_value("Title"), "Real");
        assert_eq!(content.metadata_value("Owner"), "");
    }

    #[test]
    fn test_set_undeclared_key_is_ignored() {
        let mut content = MarkdownDocument::new(item_schema());
        assert!(!content.set_metadata_value("Owner", "x"));
        assert!(content.set_metadata_value("Title", "multi\nline"));
        assert_eq!(content.metadata_value("Title"), "multi line");
    }

    #[test]
    fn test_first_metadata_occurrence_wins() {
        let content = MarkdownDocument::parse("Title: one\nTitle: two\n", item_schema());
        assert_eq!(content.metadata_value("Title"), "one");
    }

    #[test]
    fn test_group_lookup_is_keyed_by_name() {
        let mut content = MarkdownDocument::new(overview_schema());
        content.group("Doing").unwrap().add_line("a");
        content.group("Done").unwrap().add_line("b");
        content.group("Doing").unwrap().add_line("c");

        assert_eq!(content.group_count(), 2);
        assert_eq!(content.group("Doing").unwrap().lines(), ["a", "c"]);
        let titles: Vec<&str> = content.groups().iter().map(MarkdownGroup::title).collect();
        assert_eq!(titles, ["Doing", "Done"]);
        assert!(content.find_group("Missing").is_none());
        assert_eq!(content.group_count(), 2);
    }

    #[test]
    fn test_group_line_mutators() {
        let mut group = MarkdownGroup::new("Doing");
        group.add_line("one");
        group.add_line("three");
        assert!(group.insert_line(1, "two"));
        assert!(!group.insert_line(9, "nine"));
        assert_eq!(group.set_line(0, "ONE"), Some("one".to_string()));
        assert_eq!(group.set_line(5, "x"), None);
        assert_eq!(group.delete_line(2), Some("three".to_string()));
        assert_eq!(group.delete_line(2), None);
        assert_eq!(group.lines(), ["ONE", "two"]);
        group.clear();
        assert!(group.is_empty());
    }

    #[test]
    fn test_duplicate_headings_merge() {
        let content = MarkdownDocument::parse("### A\nx\n\n### A\ny", overview_schema());
        assert_eq!(content.group_count(), 1);
        assert_eq!(content.find_group("A").unwrap().lines(), ["x", "y"]);
    }

    #[test]
    fn test_consecutive_empty_groups_round_trip() {
        let mut content = MarkdownDocument::new(board_schema());
        content.set_title("Board");
        content.group("First").unwrap();
        content.group("Second").unwrap();
        content.group("Third").unwrap().add_line("item  ");
        let text = content.content();
        assert_eq!(text, "# Board\n\n### First\n\n\n### Second\n\n\n### Third\nitem  \n");

        let reparsed = MarkdownDocument::parse(&text, board_schema());
        assert_eq!(reparsed.group_count(), 3);
        assert!(reparsed.find_group("First").unwrap().is_empty());
        assert!(reparsed.find_group("Second").unwrap().is_empty());
        assert_eq!(reparsed.content(), text);
    }

    #[test]
    fn test_trailing_bare_heading_round_trips() {
        let text = "# T\n\n### A\nx  \n\n### B\n";
        let content = MarkdownDocument::parse(text, board_schema());
        assert!(content.find_group("B").unwrap().is_empty());
        assert_eq!(content.content(), text);

        let without_newline = "# T\n\n### A\nx  \n\n### B";
        let content = MarkdownDocument::parse(without_newline, board_schema());
        assert_eq!(content.content(), without_newline);
    }

    #[test]
    fn test_bare_heading_before_footer_round_trips() {
        let text = "### A\n\n[Archived stories](archive.md)\n";
        let content = MarkdownDocument::parse(text, board_schema());
        assert!(content.find_group("A").unwrap().is_empty());
        assert_eq!(content.content(), text);
    }

    #[test]
    fn test_group_requires_declared_marker() {
        let mut content = MarkdownDocument::new(item_schema());
        assert!(content.group("Notes").is_none());
        assert_eq!(content.group_count(), 0);
        assert!(!content.content().contains("### "));
    }

    #[test]
    fn test_crlf_line_endings_round_trip() {
        let text = "# Board\r\n\r\n### Doing\r\nstory  \r\n\r\n### Done\r\n\r\n";
        let mut content = MarkdownDocument::parse(text, board_schema());
        assert_eq!(content.title(), "Board");
        assert_eq!(content.find_group("Doing").unwrap().lines(), ["story  "]);
        assert!(content.find_group("Done").unwrap().is_empty());
        assert_eq!(content.content(), text);

        content.group("Done").unwrap().add_line("shipped  ");
        assert_eq!(
            content.content(),
            "# Board\r\n\r\n### Doing\r\nstory  \r\n\r\n### Done\r\nshipped  \r\n"
        );
    }

    #[test]
    fn test_removed_group_is_not_emitted() {
        let mut content = MarkdownDocument::parse(MARKDOWN_DATA, overview_schema());
        let removed = content.remove_group("Finished").unwrap();
        assert_eq!(removed.count(), 1);
        assert!(content.content().contains(
            "Story 3 [link3](link3.md) (points) (assigned)  \n\n[Archived stories](archive.md)"
        ));
    }

    #[test]
    fn test_footer_keeps_inner_blank_lines() {
        let text = "# T\n\n### A\nx\n\n[Archived ideas](archive.md)\n\nmore\n";
        let content = MarkdownDocument::parse(text, board_schema());
        assert_eq!(content.footer(), ["[Archived ideas](archive.md)", "", "more"]);
        assert_eq!(content.content(), text);
    }

    #[test]
    fn test_links_line_with_separators() {
        let text = "# T\n\n[home](../index.md) || [tag list](../tags.md)\n\nData:   \n";
        let content = MarkdownDocument::parse(text, overview_schema());
        assert_eq!(content.header(), "");
        assert_eq!(content.links(), "[home](../index.md) || [tag list](../tags.md)");
        assert_eq!(content.content(), text);
    }

    #[test]
    fn test_free_text_follows_metadata() {
        let text = "Title: Story  \nStatus: flying  \nEstimate: 3  \n\nFirst paragraph.\n\nSecond.\n";
        let content = MarkdownDocument::parse(text, item_schema());
        assert_eq!(content.free_text(), "First paragraph.\n\nSecond.");
        assert_eq!(content.header(), "");
        assert_eq!(content.content(), text);
    }

    #[test]
    fn test_without_group_marker_headings_are_text() {
        let text = "Title: Story  \nStatus:   \nEstimate:   \n\n### Notes\nsome notes\n";
        let content = MarkdownDocument::parse(text, item_schema());
        assert_eq!(content.group_count(), 0);
        assert_eq!(content.free_text(), "### Notes\nsome notes");
        assert_eq!(content.content(), text);
    }

    #[test]
    fn test_parse_is_total() {
        let inputs = [
            "",
            "\n",
            "\n\n\n",
            "###",
            "### \n",
            ":",
            "# ",
            "[a](b)",
            "Data:",
            "### A\n### B\n### A",
            "[Archived stories](archive.md)",
            "\r\n\r\n",
        ];
        for input in inputs {
            let content = MarkdownDocument::parse(input, overview_schema());
            let _ = content.content();
        }
        assert_eq!(MarkdownDocument::parse("", item_schema()).title(), "");
    }

    #[test]
    fn test_empty_document_round_trips() {
        let schema = MarkdownSchema::new(Vec::<String>::new());
        assert_eq!(MarkdownDocument::parse("", schema.clone()).content(), "");
        assert_eq!(MarkdownDocument::parse("\n", schema).content(), "\n");
    }

    #[test]
    fn test_invalid_footer_pattern_is_rejected() {
        let result = MarkdownSchema::new(["Data"]).with_footer_pattern("[unclosed");
        assert!(matches!(result, Err(BacklogError::FooterPattern(_))));
    }

    #[test]
    fn test_touch_modified_only_with_declared_key() {
        let mut content = MarkdownDocument::new(item_schema());
        assert!(!content.touch_modified());

        let mut content = MarkdownDocument::new(MarkdownSchema::new([MODIFIED_METADATA_KEY]));
        assert!(content.touch_modified());
        assert!(!content.metadata_value(MODIFIED_METADATA_KEY).is_empty());
    }

    #[test]
    fn test_load_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.md");
        let content = MarkdownDocument::load(&path, item_schema()).unwrap();
        assert_eq!(content.path(), Some(path.as_path()));
        assert_eq!(content.metadata_value("Title"), "");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.md");
        let mut content = MarkdownDocument::load(&path, item_schema()).unwrap();
        content.set_metadata_value("Title", "Story");
        content.set_free_text("Details");
        content.save().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Title: Story  \nStatus:   \nEstimate:   \n\nDetails\n");

        let loaded = MarkdownDocument::load(&path, item_schema()).unwrap();
        assert_eq!(loaded.metadata_value("Title"), "Story");
        assert_eq!(loaded.free_text(), "Details");
    }

    #[test]
    fn test_save_without_path_fails() {
        let content = MarkdownDocument::new(item_schema());
        assert!(matches!(content.save(), Err(BacklogError::MissingPath)));
    }

    #[test]
    fn test_load_directory_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = MarkdownDocument::load(dir.path(), item_schema());
        assert!(matches!(result, Err(BacklogError::FileRead(_))));
    }
}
