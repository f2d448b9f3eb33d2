//! LMS content sources browsable with the file picker.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::FileEntry;
use crate::content::Content;

/// An LMS and the kind of course content browsed in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LmsSource {
    /// Canvas course files.
    Canvas,
    /// Canvas course pages.
    CanvasPages,
    /// Blackboard course files.
    Blackboard,
    /// D2L (Brightspace) course files.
    D2l,
    /// Moodle course files.
    Moodle,
    /// Moodle course pages.
    MoodlePages,
}

impl LmsSource {
    /// All sources, in display order.
    pub const ALL: [Self; 6] = [
        Self::Canvas,
        Self::CanvasPages,
        Self::Blackboard,
        Self::D2l,
        Self::Moodle,
        Self::MoodlePages,
    ];

    /// Configuration key.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Canvas => "canvas",
            Self::CanvasPages => "canvas_pages",
            Self::Blackboard => "blackboard",
            Self::D2l => "d2l",
            Self::Moodle => "moodle",
            Self::MoodlePages => "moodle_pages",
        }
    }

    /// Name shown in the picker title.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Canvas => "Canvas files",
            Self::CanvasPages => "Canvas pages",
            Self::Blackboard => "Blackboard files",
            Self::D2l => "D2L files",
            Self::Moodle => "Moodle files",
            Self::MoodlePages => "Moodle pages",
        }
    }

    /// Converts a selected entry into assignment content.
    ///
    /// Canvas files are referenced by file id; every other source identifies
    /// documents by a URL with an LMS-specific scheme, carried in the entry id.
    #[must_use]
    pub fn content_for(self, entry: FileEntry) -> Content {
        match self {
            Self::Canvas => Content::File { file: entry },
            _ => Content::Url {
                url: entry.id,
                name: Some(entry.display_name),
            },
        }
    }
}

impl fmt::Display for LmsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for LmsSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.key() == value)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|source| source.key()).collect();
                format!("unknown LMS source '{value}' (expected one of: {})", known.join(", "))
            })
    }
}
