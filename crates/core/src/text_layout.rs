//! Small text helpers shared by the document model and the views.
//!
//! Padding is measured in chars rather than bytes so that non-ASCII titles keep table
//! columns aligned. Links are always written with `/` separators because they end up in
//! markdown, regardless of the host platform.

use crate::error::{BacklogError, BacklogResult};
use chrono::{Local, NaiveDateTime};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Timestamp layout used by the `Created` and `Modified` metadata values.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %I:%M %p";

static FILE_NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \\/&_=+:]").expect("valid separators regex"));
static FILE_NAME_ILLEGAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^[:alnum:]-]").expect("valid illegal-name regex"));
static FILE_NAME_DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("valid dashes regex"));

pub fn pad_int_left(value: i64, width: usize) -> String {
    format!("{value:>width$}")
}

pub fn pad_string_right(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        return value.to_string();
    }
    format!("{value}{}", " ".repeat(width - len))
}

pub fn pad_string_left(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        return value.to_string();
    }
    format!("{}{value}", " ".repeat(width - len))
}

/// Display width of a value, in chars.
pub fn text_width(value: &str) -> usize {
    value.chars().count()
}

/// Replaces every run of whitespace with a single space and trims both ends.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercases the first char of `value`.
pub fn title_first_letter(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn contains_ignore_case(items: &[String], item: &str) -> bool {
    let item = item.to_lowercase();
    items.iter().any(|candidate| candidate.to_lowercase() == item)
}

/// Turns a free-form title into a file name made of ASCII alphanumerics and single dashes.
pub fn valid_file_name(name: &str) -> String {
    let file_name = FILE_NAME_SEPARATORS.replace_all(name.trim(), "-");
    let file_name = FILE_NAME_ILLEGAL.replace_all(&file_name, "");
    FILE_NAME_DASHES.replace_all(&file_name, "-").into_owned()
}

/// Wraps lines in a fenced code block; no lines produce no block.
pub fn wrap_lines_to_code_block(lines: &[String]) -> Vec<String> {
    if lines.is_empty() {
        return Vec::new();
    }
    let mut result = Vec::with_capacity(lines.len() + 2);
    result.push("```".to_string());
    result.extend(lines.iter().cloned());
    result.push("```".to_string());
    result
}

pub fn format_timestamp(moment: NaiveDateTime) -> String {
    moment.format(TIMESTAMP_FORMAT).to_string()
}

pub fn current_timestamp() -> String {
    format_timestamp(Local::now().naive_local())
}

pub fn parse_timestamp(timestamp: &str) -> BacklogResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| BacklogError::InvalidTimestamp(timestamp.to_string()))
}

/// Builds `[title](relative)` where `relative` leads from `base_dir` to `target`.
///
/// Both paths are made absolute and lexically normalised first. The link climbs with one
/// `../` per directory level between `base_dir` and the nearest common ancestor, so a
/// target below `base_dir` gets no `../` at all.
pub fn make_markdown_link(title: &str, target: &Path, base_dir: &Path) -> String {
    let target = absolute_path(target);
    let mut base = absolute_path(base_dir);

    let mut up_count = 0;
    while !target.starts_with(&base) {
        match base.parent() {
            Some(parent) => {
                base = parent.to_path_buf();
                up_count += 1;
            }
            None => break,
        }
    }

    let relative = target.strip_prefix(&base).unwrap_or(&target);
    let relative = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    format!("[{title}]({}{relative})", "../".repeat(up_count))
}

/// Joins several links into the ` || `-separated form used on links lines.
pub fn join_markdown_links(links: &[String]) -> String {
    links.join(" || ")
}

fn absolute_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalised = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalised.pop();
            }
            other => normalised.push(other.as_os_str()),
        }
    }
    normalised
}
