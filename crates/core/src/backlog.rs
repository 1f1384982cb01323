//! The items of one backlog directory.

use crate::constants::{ARCHIVE_FILE_NAME, MARKDOWN_EXTENSION, OVERVIEW_FILE_NAME};
use crate::error::{BacklogError, BacklogResult};
use crate::item::BacklogItem;
use crate::status::BacklogItemStatus;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Backlog {
    dir: PathBuf,
    items: Vec<BacklogItem>,
}

impl Backlog {
    /// Loads every item file in `dir`, sorted by item name.
    ///
    /// Item files are the `.md` files of the directory other than the overview and the
    /// archive. Sub-directories and hidden files are skipped.
    ///
    /// # Errors
    ///
    /// Returns `BacklogError::DirRead` if the directory cannot be listed, or
    /// `BacklogError::FileRead` if an item file cannot be read.
    pub fn load(dir: impl AsRef<Path>) -> BacklogResult<Self> {
        let dir = dir.as_ref();
        let mut items = Vec::new();
        for entry in fs::read_dir(dir).map_err(BacklogError::DirRead)? {
            let entry = entry.map_err(BacklogError::DirRead)?;
            let path = entry.path();
            if is_item_file(&path) {
                items.push(BacklogItem::load(&path)?);
            }
        }
        items.sort_by(|a, b| a.name().cmp(b.name()));
        tracing::debug!(dir = %dir.display(), count = items.len(), "loaded backlog");

        Ok(Self {
            dir: dir.to_path_buf(),
            items,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn items(&self) -> &[BacklogItem] {
        &self.items
    }

    pub fn item(&self, name: &str) -> Option<&BacklogItem> {
        self.items.iter().find(|item| item.name() == name)
    }

    pub fn item_mut(&mut self, name: &str) -> Option<&mut BacklogItem> {
        self.items.iter_mut().find(|item| item.name() == name)
    }

    /// Items currently in `status`, in name order.
    pub fn items_by_status(&self, status: BacklogItemStatus) -> Vec<&BacklogItem> {
        self.items
            .iter()
            .filter(|item| item.status() == Some(status))
            .collect()
    }
}

fn is_item_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    !file_name.starts_with('.')
        && file_name != OVERVIEW_FILE_NAME
        && file_name != ARCHIVE_FILE_NAME
        && path
            .extension()
            .is_some_and(|extension| extension == MARKDOWN_EXTENSION)
}
