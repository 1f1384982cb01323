//! The overview page of a backlog: one group of item lines per status.
//!
//! ```markdown
//! # Team backlog
//!
//! Created: 2024-03-05 02:07 PM
//! Modified: 2024-03-06 09:15 AM
//!
//! ### In flight
//! [Fix login redirect](fix-login.md) 3 bob
//!
//! ### At the gate
//! [Add search](search.md)
//!
//! [Archived stories](archive.md)
//! ```
//!
//! Line order inside a group is priority order and is edited by hand, so [`update`]
//! keeps it and only appends or drops lines.
//!
//! [`update`]: BacklogOverview::update

use crate::constants::{
    ARCHIVED_STORIES_TITLE, CREATED_METADATA_KEY, GROUP_MARKER, MODIFIED_METADATA_KEY,
    OVERVIEW_FOOTER_PATTERN,
};
use crate::error::BacklogResult;
use crate::item::BacklogItem;
use crate::links::{make_archive_link, make_item_link};
use crate::markdown::{MarkdownDocument, MarkdownSchema};
use crate::status::BacklogItemStatus;
use crate::text_layout::current_timestamp;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static OVERVIEW_SCHEMA: LazyLock<MarkdownSchema> = LazyLock::new(|| {
    MarkdownSchema::new([CREATED_METADATA_KEY, MODIFIED_METADATA_KEY])
        .with_group_marker(GROUP_MARKER)
        .with_footer_pattern(OVERVIEW_FOOTER_PATTERN)
        .expect("valid overview footer pattern")
});

/// First link target on a line, e.g. `fix-login.md` in `[Fix login](fix-login.md) 3 bob`.
static LINK_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\(([^)]+)\)").expect("valid link target regex"));

#[derive(Debug, Clone)]
pub struct BacklogOverview {
    markdown: MarkdownDocument,
}

impl BacklogOverview {
    /// Creates an unsaved overview stamped with the current time.
    pub fn new(path: impl AsRef<Path>, title: &str) -> Self {
        let mut markdown = MarkdownDocument::new(OVERVIEW_SCHEMA.clone());
        markdown.set_path(path.as_ref());
        markdown.set_title(title);
        let now = current_timestamp();
        markdown.set_metadata_value(CREATED_METADATA_KEY, now.clone());
        markdown.set_metadata_value(MODIFIED_METADATA_KEY, now);
        Self { markdown }
    }

    pub fn parse(text: &str) -> Self {
        Self {
            markdown: MarkdownDocument::parse(text, OVERVIEW_SCHEMA.clone()),
        }
    }

    /// Loads the overview at `path`; a missing file gives an empty overview bound to it.
    pub fn load(path: impl AsRef<Path>) -> BacklogResult<Self> {
        Ok(Self {
            markdown: MarkdownDocument::load(path, OVERVIEW_SCHEMA.clone())?,
        })
    }

    pub fn save(&self) -> BacklogResult<()> {
        self.markdown.save()
    }

    pub fn content(&self) -> String {
        self.markdown.content()
    }

    pub fn path(&self) -> Option<&Path> {
        self.markdown.path()
    }

    pub fn title(&self) -> &str {
        self.markdown.title()
    }

    pub fn set_title(&mut self, title: &str) {
        self.markdown.set_title(title);
    }

    pub fn set_header(&mut self, header: &str) {
        self.markdown.set_header(header);
    }

    pub fn links(&self) -> &str {
        self.markdown.links()
    }

    pub fn set_links(&mut self, links: &str) {
        self.markdown.set_links(links);
    }

    pub fn modified(&self) -> &str {
        self.markdown.metadata_value(MODIFIED_METADATA_KEY)
    }

    /// Lines of the group for `status`, empty when the group does not exist yet.
    pub fn status_lines(&self, status: BacklogItemStatus) -> &[String] {
        self.markdown
            .find_group(status.description())
            .map(|group| group.lines())
            .unwrap_or(&[])
    }

    /// Items in `status`, in overview order; items the overview does not list yet follow
    /// in the order given.
    pub fn ordered_items<'a>(
        &self,
        status: BacklogItemStatus,
        items: &'a [BacklogItem],
    ) -> Vec<&'a BacklogItem> {
        let candidates: Vec<&BacklogItem> = items
            .iter()
            .filter(|item| item.status() == Some(status))
            .collect();

        let mut ordered: Vec<&BacklogItem> = Vec::with_capacity(candidates.len());
        for line in self.status_lines(status) {
            let Some(name) = linked_item_name(line) else {
                continue;
            };
            if let Some(item) = candidates.iter().copied().find(|item| item.name() == name) {
                if !ordered.iter().any(|seen| seen.name() == name) {
                    ordered.push(item);
                }
            }
        }
        for item in candidates {
            if !ordered.iter().any(|seen| seen.name() == item.name()) {
                ordered.push(item);
            }
        }
        ordered
    }

    /// Rebuilds every status group from `items`, linking relative to `base_dir`.
    ///
    /// Returns whether the overview changed; `Modified` is stamped only then.
    pub fn update(&mut self, items: &[BacklogItem], base_dir: &Path) -> bool {
        let mut changed = false;
        for status in BacklogItemStatus::ALL {
            let lines: Vec<String> = self
                .ordered_items(status, items)
                .into_iter()
                .map(|item| overview_line(item, base_dir))
                .collect();

            let exists = self.markdown.find_group(status.description()).is_some();
            let Some(group) = self.markdown.group(status.description()) else {
                continue;
            };
            if !exists || group.lines() != lines.as_slice() {
                group.set_lines(lines);
                changed = true;
            }
        }

        if changed {
            self.markdown.touch_modified();
            tracing::debug!(title = self.title(), "overview updated");
        }
        changed
    }

    /// Replaces the footer with a link to the archive page.
    pub fn set_archive_link(&mut self, archive_path: &Path, base_dir: &Path) {
        let link = make_archive_link(archive_path, ARCHIVED_STORIES_TITLE, base_dir);
        self.markdown.set_footer(vec![link]);
    }
}

/// `[title](link) estimate assigned` followed by a hard line break.
fn overview_line(item: &BacklogItem, base_dir: &Path) -> String {
    let mut parts = vec![make_item_link(item, base_dir)];
    if item.estimate_points() > 0.0 {
        parts.push(item.estimate().to_string());
    }
    if !item.assigned().is_empty() {
        parts.push(item.assigned().to_string());
    }
    format!("{}  ", parts.join(" "))
}

fn linked_item_name(line: &str) -> Option<String> {
    let target = LINK_TARGET.captures(line)?.get(1)?.as_str();
    Path::new(target)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(dir: &Path, name: &str, status: BacklogItemStatus) -> BacklogItem {
        let mut item = BacklogItem::new_in(dir, name);
        item.set_title(&name.to_uppercase());
        item.set_status(status);
        item
    }

    #[test]
    fn update_builds_groups_in_status_order() {
        let dir = Path::new("/work/team");
        let mut overview = BacklogOverview::new(dir.join("overview.md"), "Team");
        let mut a = item(dir, "a", BacklogItemStatus::Gate);
        a.set_estimate("3");
        a.set_assigned("bob");
        let items = vec![a, item(dir, "b", BacklogItemStatus::Flying)];

        assert!(overview.update(&items, dir));
        let content = overview.content();
        let expected_groups = concat!(
            "### In flight\n",
            "[B](b.md)  \n",
            "\n",
            "### At the gate\n",
            "[A](a.md) 3 bob  \n",
            "\n",
            "### In the hangar\n",
            "\n",
            "\n",
            "### Landed\n",
            "\n",
        );
        assert!(content.ends_with(expected_groups), "{content}");
    }

    #[test]
    fn update_keeps_hand_ordered_lines() {
        let dir = Path::new("/work/team");
        let text = concat!(
            "# Team\n",
            "\n",
            "Created: 2024-03-05 02:07 PM  \n",
            "Modified: 2024-03-05 02:07 PM  \n",
            "\n",
            "### In flight\n",
            "[C](c.md)  \n",
            "[Gone](gone.md)  \n",
            "[A](a.md)  \n",
            "\n",
            "[Archived stories](archive.md)\n",
        );
        let mut overview = BacklogOverview::parse(text);
        let items = vec![
            item(dir, "a", BacklogItemStatus::Flying),
            item(dir, "b", BacklogItemStatus::Flying),
            item(dir, "c", BacklogItemStatus::Flying),
        ];

        assert!(overview.update(&items, dir));
        assert_eq!(
            overview.status_lines(BacklogItemStatus::Flying),
            ["[C](c.md)  ", "[A](a.md)  ", "[B](b.md)  "]
        );
        assert_ne!(overview.modified(), "2024-03-05 02:07 PM");
        assert!(overview
            .content()
            .ends_with("### Landed\n\n\n[Archived stories](archive.md)\n"));
    }

    #[test]
    fn second_update_is_a_no_op() {
        let dir = Path::new("/work/team");
        let mut overview = BacklogOverview::new(dir.join("overview.md"), "Team");
        let items = vec![item(dir, "a", BacklogItemStatus::Hangar)];
        assert!(overview.update(&items, dir));

        let reloaded_text = overview.content();
        let mut reloaded = BacklogOverview::parse(&reloaded_text);
        assert!(!reloaded.update(&items, dir));
        assert_eq!(reloaded.content(), reloaded_text);
    }

    #[test]
    fn ordered_items_appends_unlisted() {
        let dir = Path::new("/work/team");
        let overview = BacklogOverview::parse("### Landed\n[Z](z.md)  \n");
        let items = vec![
            item(dir, "y", BacklogItemStatus::Landed),
            item(dir, "z", BacklogItemStatus::Landed),
            item(dir, "x", BacklogItemStatus::Gate),
        ];
        let names: Vec<&str> = overview
            .ordered_items(BacklogItemStatus::Landed, &items)
            .into_iter()
            .map(BacklogItem::name)
            .collect();
        assert_eq!(names, ["z", "y"]);
    }

    #[test]
    fn archive_link_becomes_footer() {
        let dir = Path::new("/work/team");
        let mut overview = BacklogOverview::new(dir.join("overview.md"), "Team");
        overview.set_archive_link(&dir.join("archive.md"), dir);
        assert!(overview
            .content()
            .ends_with("\n\n[Archived stories](archive.md)\n"));

        let reparsed = BacklogOverview::parse(&overview.content());
        assert_eq!(reparsed.title(), "Team");
        assert_eq!(reparsed.content(), overview.content());
    }

    #[test]
    fn load_and_save_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overview.md");
        let mut overview = BacklogOverview::new(&path, "Team");
        overview.set_links("[home](../index.md)");
        overview.save().unwrap();

        let loaded = BacklogOverview::load(&path).unwrap();
        assert_eq!(loaded.title(), "Team");
        assert_eq!(loaded.links(), "[home](../index.md)");
        assert_eq!(loaded.path(), Some(path.as_path()));
    }
}
