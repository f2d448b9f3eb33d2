//! Assignment content and the dispatcher that normalizes picker results.
//!
//! Each picker (URL entry, LMS file browsers, cloud drives, e-books) reports a
//! [`PickerOutcome`]. [`select_content`] turns it into the one [`Content`]
//! value the launch form serializes. A cancelled picker yields `None` and is
//! never reported as an error.

mod content_item;
mod web_url;

pub use self::content_item::{
    CONTENT_ITEM_CONTEXT, ContentItemTarget, FormFields, LTI_LINK_MEDIA_TYPE,
    content_item_for_content, form_fields, parse_content_item_url,
};
pub use self::web_url::{jstor_article_id, validate_web_url, youtube_video_id};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::api::ErrorLike;
use crate::files::{FileEntry, LmsSource};

/// What students will be shown. Immutable once selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    /// A document identified by URL (web, cloud drive, e-book, LMS scheme).
    Url {
        /// Document URL.
        url: String,
        /// Optional display name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// A Canvas file referenced by id.
    File {
        /// Selected file.
        file: FileEntry,
    },
}

impl Content {
    /// Creates URL content without a name.
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url {
            url: url.into(),
            name: None,
        }
    }
}

/// Pickers the content selector can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// Free-form URL entry.
    Url,
    /// One of the LMS file browsers.
    Lms(LmsSource),
    /// Google Drive picker.
    GoogleDrive,
    /// Microsoft OneDrive picker.
    OneDrive,
    /// YouTube video URL entry.
    YouTube,
    /// VitalSource e-book chapter picker.
    VitalSource,
    /// JSTOR article entry.
    Jstor,
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url => f.write_str("url"),
            Self::Lms(source) => write!(f, "lms:{source}"),
            Self::GoogleDrive => f.write_str("google_drive"),
            Self::OneDrive => f.write_str("one_drive"),
            Self::YouTube => f.write_str("youtube"),
            Self::VitalSource => f.write_str("vitalsource"),
            Self::Jstor => f.write_str("jstor"),
        }
    }
}

/// What a picker reported when it closed.
#[derive(Debug, Clone, PartialEq)]
pub enum PickerOutcome {
    /// A URL was entered or a cloud file was chosen.
    Url {
        /// URL as entered or as returned by the cloud picker.
        url: String,
        /// Optional display name.
        name: Option<String>,
    },
    /// An LMS file browser emitted a file.
    LmsFile(FileEntry),
    /// An e-book chapter was chosen.
    Book {
        /// Book identifier.
        book_id: String,
        /// Chapter location, when a chapter rather than the whole book was chosen.
        cfi: Option<String>,
    },
    /// The user dismissed the picker.
    Cancelled,
    /// The picker itself failed.
    Failed(ErrorLike),
}

/// Errors from content selection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentError {
    /// The entered URL is not acceptable.
    #[error("invalid URL '{input}': {reason}")]
    InvalidUrl {
        /// What the user entered.
        input: String,
        /// User-facing reason.
        reason: String,
    },

    /// The picker failed.
    #[error("{source_name} picker failed: {}", .error.message.as_deref().unwrap_or("unknown error"))]
    Picker {
        /// Picker that failed.
        source_name: String,
        /// What it reported.
        error: ErrorLike,
    },

    /// The picker reported a result it cannot produce (for example a folder).
    #[error("{source_name} picker returned an unusable result: {reason}")]
    UnexpectedOutcome {
        /// Picker that reported it.
        source_name: String,
        /// Why it is unusable.
        reason: String,
    },
}

impl ContentError {
    fn invalid_url(input: &str, reason: &str) -> Self {
        Self::InvalidUrl {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    fn unexpected(source: ContentSource, reason: &str) -> Self {
        Self::UnexpectedOutcome {
            source_name: source.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Normalizes a picker's outcome into assignment content.
///
/// Returns `Ok(None)` when the picker was cancelled.
///
/// # Errors
///
/// Returns [`ContentError`] when the outcome is invalid for `source` or the
/// picker reported a failure.
pub fn select_content(
    source: ContentSource,
    outcome: PickerOutcome,
) -> Result<Option<Content>, ContentError> {
    let content = match (source, outcome) {
        (_, PickerOutcome::Cancelled) => {
            debug!(%source, "Picker cancelled");
            return Ok(None);
        }
        (_, PickerOutcome::Failed(error)) => {
            return Err(ContentError::Picker {
                source_name: source.to_string(),
                error,
            });
        }
        (ContentSource::Url, PickerOutcome::Url { url, name }) => Content::Url {
            url: validate_web_url(&url)?.to_string(),
            name,
        },
        (ContentSource::YouTube, PickerOutcome::Url { url, name }) => {
            let id = youtube_video_id(&url).ok_or_else(|| {
                ContentError::invalid_url(&url, "Please enter a YouTube video URL")
            })?;
            Content::Url {
                url: format!("youtube://{id}"),
                name,
            }
        }
        (ContentSource::Jstor, PickerOutcome::Url { url, name }) => {
            let id = jstor_article_id(&url).ok_or_else(|| {
                ContentError::invalid_url(&url, "Please enter a JSTOR article URL or DOI")
            })?;
            Content::Url {
                url: format!("jstor://{id}"),
                name,
            }
        }
        (ContentSource::GoogleDrive | ContentSource::OneDrive, PickerOutcome::Url { url, name }) => {
            if url.trim().is_empty() {
                return Err(ContentError::unexpected(source, "empty file URL"));
            }
            Content::Url { url, name }
        }
        (ContentSource::VitalSource, PickerOutcome::Book { book_id, cfi }) => {
            let url = match cfi {
                Some(cfi) => format!("vitalsource://book/bookID/{book_id}/cfi/{cfi}"),
                None => format!("vitalsource://book/bookID/{book_id}"),
            };
            Content::url(url)
        }
        (ContentSource::Lms(lms), PickerOutcome::LmsFile(entry)) => {
            if entry.is_folder() {
                return Err(ContentError::unexpected(source, "a folder cannot be assigned"));
            }
            lms.content_for(entry)
        }
        (_, _) => return Err(ContentError::unexpected(source, "result type does not match picker")),
    };

    info!(%source, "Content selected");
    Ok(Some(content))
}
