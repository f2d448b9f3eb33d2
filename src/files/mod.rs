//! Folder-navigable LMS file browsing.
//!
//! # Architecture
//!
//! - [`FileEntry`] - One file or folder as returned by a "list files" endpoint
//! - [`FolderPath`] - Breadcrumbs from the synthetic root to the current folder
//! - [`LmsFilePicker`] - Fetch/authorize/error state machine over a folder tree
//! - [`LmsSource`] - Which LMS (and which kind of course content) is browsed

mod picker;
mod source;

pub use picker::{LmsFilePicker, PickerAction, PickerStatus, PickerView};
pub use source::LmsSource;

use serde::{Deserialize, Serialize};

use crate::config::ApiCallSpec;

/// Id of the synthetic root folder at the start of every [`FolderPath`].
pub const ROOT_FOLDER_ID: &str = "__root__";

/// Whether an entry is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Selectable document.
    File,
    /// Container that can be opened.
    Folder,
}

/// A file or folder in an LMS course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// LMS identifier. For non-Canvas sources this is a URL with an
    /// LMS-specific scheme.
    pub id: String,
    /// Name shown to the user.
    pub display_name: String,
    /// File or folder.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Last modification time as reported by the LMS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Call that lists this folder's children.
    #[serde(default, alias = "child_listing", skip_serializing_if = "Option::is_none")]
    pub contents: Option<ApiCallSpec>,
}

impl FileEntry {
    /// Creates a file entry.
    #[must_use]
    pub fn file(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind: EntryKind::File,
            updated_at: None,
            contents: None,
        }
    }

    /// Creates a folder entry whose children are listed by `contents`.
    #[must_use]
    pub fn folder(
        id: impl Into<String>,
        display_name: impl Into<String>,
        contents: ApiCallSpec,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind: EntryKind::Folder,
            updated_at: None,
            contents: Some(contents),
        }
    }

    /// Returns true for folders.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Breadcrumbs from the synthetic root to the current folder.
///
/// The root is always first. Navigation only appends or truncates.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderPath {
    root: FileEntry,
    folders: Vec<FileEntry>,
}

impl FolderPath {
    /// Creates a path holding only the root, listed by `root_listing`.
    #[must_use]
    pub fn new(root_listing: ApiCallSpec) -> Self {
        Self {
            root: FileEntry::folder(ROOT_FOLDER_ID, "Files", root_listing),
            folders: Vec::new(),
        }
    }

    /// Folder currently shown.
    #[must_use]
    pub fn current(&self) -> &FileEntry {
        self.folders.last().unwrap_or(&self.root)
    }

    /// All entries, root first.
    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        std::iter::once(&self.root).chain(self.folders.iter())
    }

    /// Number of folders below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.folders.len()
    }

    /// Moves to `folder`: truncates back to it when it is already on the path,
    /// otherwise appends it.
    pub fn navigate_to(&mut self, folder: FileEntry) {
        if folder.id == self.root.id {
            self.folders.clear();
        } else if let Some(index) = self.folders.iter().position(|entry| entry.id == folder.id) {
            self.folders.truncate(index + 1);
        } else {
            self.folders.push(folder);
        }
    }
}
