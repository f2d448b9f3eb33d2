//! File browser state machine.
//!
//! # States
//!
//! ```text
//! Fetching{is_reload} --ok--> Fetched{files}
//!        |   \--authorization error--> Authorizing{is_retry}
//!        \------other error----------> Error{error}
//! Authorizing --authorize()--> Fetching{is_reload: true}
//! Error / Fetched([]) --retry()/reload()--> Fetching{is_reload: true}
//! ```
//!
//! There is no terminal state; the picker lives until its owner drops it.
//! Every fetch bumps a generation counter. A response whose generation is no
//! longer current belongs to an abandoned folder and is discarded, so the last
//! navigation always wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::{FileEntry, FolderPath};
use crate::api::{ApiCallError, ApiClient, ApiRequest, ErrorLike};
use crate::auth::{AuthWindow, AuthWindowError, PopupHost};
use crate::config::ApiCallSpec;

/// Current phase of the picker.
#[derive(Debug, Clone, PartialEq)]
pub enum PickerStatus {
    /// A listing request is in flight.
    Fetching {
        /// False for the first fetch of a folder, true for reloads and
        /// fetches after authorization.
        is_reload: bool,
    },
    /// The current folder's listing.
    Fetched {
        /// Entries of the current folder.
        files: Vec<FileEntry>,
    },
    /// The listing requires (re-)authorization.
    Authorizing {
        /// True when authorization already failed once for this folder.
        is_retry: bool,
    },
    /// The listing failed for a reason other than authorization.
    Error {
        /// What went wrong.
        error: ErrorLike,
    },
}

/// The single primary action the dialog offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerAction {
    /// Emit the selected file.
    Select,
    /// Open the selected folder.
    Open,
    /// Re-fetch an empty folder.
    Reload,
    /// Start authorization.
    Authorize,
    /// Authorize or re-fetch after a failure.
    TryAgain,
}

/// Render-ready snapshot of the picker.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerView {
    /// Current status.
    pub status: PickerStatus,
    /// Breadcrumb names, root first.
    pub breadcrumbs: Vec<String>,
    /// Highlighted entry.
    pub selected: Option<FileEntry>,
    /// Primary action; `None` while fetching.
    pub primary_action: Option<PickerAction>,
    /// Whether the primary action can be used right now.
    pub action_enabled: bool,
}

#[derive(Debug)]
struct PickerInner {
    status: PickerStatus,
    path: FolderPath,
    generation: u64,
    selected: Option<FileEntry>,
}

/// Folder-navigable file browser over a "list files" endpoint.
#[derive(Debug)]
pub struct LmsFilePicker {
    api: Arc<ApiClient>,
    auth_window: Option<AuthWindow>,
    inner: Mutex<PickerInner>,
}

impl LmsFilePicker {
    /// Creates a picker rooted at `list_files`. Nothing is fetched until
    /// [`load`](Self::load).
    ///
    /// The endpoint's authorization URL, if any, is used for re-authorization.
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallError::InvalidPath`] if the authorization URL cannot be
    /// resolved against the backend origin.
    pub fn new(
        api: Arc<ApiClient>,
        popups: Arc<dyn PopupHost>,
        list_files: ApiCallSpec,
    ) -> Result<Self, ApiCallError> {
        let auth_window = match &list_files.auth_url {
            Some(auth_url) => Some(AuthWindow::new(
                popups,
                api.auth_token(),
                api.resolve_url(auth_url)?,
            )),
            None => None,
        };
        Ok(Self {
            api,
            auth_window,
            inner: Mutex::new(PickerInner {
                status: PickerStatus::Fetching { is_reload: false },
                path: FolderPath::new(list_files),
                generation: 0,
                selected: None,
            }),
        })
    }

    /// Overrides the authorization popup poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.auth_window = self
            .auth_window
            .take()
            .map(|window| window.with_poll_interval(poll_interval));
        self
    }

    /// Fetches the current folder (initial mount).
    pub async fn load(&self) {
        self.fetch_current(false).await;
    }

    /// Re-fetches the current folder.
    pub async fn reload(&self) {
        self.fetch_current(true).await;
    }

    /// Runs the authorization popup, then re-fetches the current folder.
    ///
    /// Without an authorization URL this is a plain reload.
    ///
    /// # Errors
    ///
    /// Returns [`AuthWindowError`] when the popup could not be opened; the
    /// picker stays in its current state so the user can try again.
    pub async fn authorize(&self) -> Result<(), AuthWindowError> {
        if let Some(window) = &self.auth_window {
            window.authorize().await?;
        }
        self.fetch_current(true).await;
        Ok(())
    }

    /// The "Try again" affordance: authorizes when authorization is pending,
    /// otherwise re-fetches.
    ///
    /// # Errors
    ///
    /// See [`authorize`](Self::authorize).
    pub async fn retry(&self) -> Result<(), AuthWindowError> {
        let authorizing = matches!(self.lock().status, PickerStatus::Authorizing { .. });
        if authorizing {
            self.authorize().await
        } else {
            self.reload().await;
            Ok(())
        }
    }

    /// Opens `folder`, appending it to the breadcrumbs or truncating back to
    /// it, then fetches its listing.
    ///
    /// Files and folders without a child listing are ignored.
    pub async fn navigate_to(&self, folder: &FileEntry) {
        if !folder.is_folder() || folder.contents.is_none() {
            warn!(id = %folder.id, "Ignoring navigation to an entry without a listing");
            return;
        }
        self.lock().path.navigate_to(folder.clone());
        self.fetch_current(false).await;
    }

    /// Highlights the entry with `id` in the current listing.
    ///
    /// Returns false when no such entry is listed.
    pub fn select(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let entry = match &inner.status {
            PickerStatus::Fetched { files } => files.iter().find(|entry| entry.id == id).cloned(),
            _ => None,
        };
        let found = entry.is_some();
        inner.selected = entry;
        found
    }

    /// Confirms the highlighted entry.
    ///
    /// A file is returned to the caller as the selection. A folder is opened
    /// and `None` is returned.
    pub async fn confirm(&self) -> Option<FileEntry> {
        let selected = self.lock().selected.clone()?;
        if selected.is_folder() {
            self.navigate_to(&selected).await;
            None
        } else {
            info!(id = %selected.id, name = %selected.display_name, "File selected");
            Some(selected)
        }
    }

    /// Selects and confirms `entry` in one step (double-click or Enter).
    pub async fn activate(&self, entry: &FileEntry) -> Option<FileEntry> {
        if !self.select(&entry.id) {
            return None;
        }
        self.confirm().await
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> PickerStatus {
        self.lock().status.clone()
    }

    /// Folder currently shown.
    #[must_use]
    pub fn current_folder(&self) -> FileEntry {
        self.lock().path.current().clone()
    }

    /// Render-ready snapshot.
    #[must_use]
    pub fn view(&self) -> PickerView {
        let inner = self.lock();
        let (primary_action, action_enabled) = match &inner.status {
            PickerStatus::Fetching { .. } => (None, false),
            PickerStatus::Fetched { files } if files.is_empty() => {
                (Some(PickerAction::Reload), true)
            }
            PickerStatus::Fetched { .. } => match &inner.selected {
                Some(entry) if entry.is_folder() => (Some(PickerAction::Open), true),
                Some(_) => (Some(PickerAction::Select), true),
                None => (Some(PickerAction::Select), false),
            },
            PickerStatus::Authorizing { is_retry: false } => (Some(PickerAction::Authorize), true),
            PickerStatus::Authorizing { is_retry: true } | PickerStatus::Error { .. } => {
                (Some(PickerAction::TryAgain), true)
            }
        };
        PickerView {
            status: inner.status.clone(),
            breadcrumbs: inner
                .path
                .entries()
                .map(|entry| entry.display_name.clone())
                .collect(),
            selected: inner.selected.clone(),
            primary_action,
            action_enabled,
        }
    }

    #[instrument(skip(self))]
    async fn fetch_current(&self, is_reload: bool) {
        let (generation, folder) = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.status = PickerStatus::Fetching { is_reload };
            inner.selected = None;
            (inner.generation, inner.path.current().clone())
        };

        let Some(listing) = &folder.contents else {
            self.finish(
                generation,
                PickerStatus::Error {
                    error: ErrorLike::from_message(format!(
                        "folder '{}' has no listing",
                        folder.display_name
                    )),
                },
            );
            return;
        };

        debug!(folder = %folder.id, path = %listing.path, "Fetching folder listing");
        let result = self
            .api
            .call::<Vec<FileEntry>>(&ApiRequest::from_spec(listing))
            .await;

        let status = match result {
            Ok(files) => {
                debug!(folder = %folder.id, count = files.len(), "Folder listing fetched");
                PickerStatus::Fetched { files }
            }
            Err(error) if error.is_authorization_error() => {
                debug!(folder = %folder.id, "Folder listing requires authorization");
                PickerStatus::Authorizing {
                    is_retry: is_reload,
                }
            }
            Err(error) => {
                warn!(folder = %folder.id, error = %error, "Folder listing failed");
                PickerStatus::Error {
                    error: ErrorLike::from(&error),
                }
            }
        };
        self.finish(generation, status);
    }

    fn finish(&self, generation: u64, status: PickerStatus) {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(
                stale = generation,
                current = inner.generation,
                "Discarding stale folder listing"
            );
            return;
        }
        inner.status = status;
    }

    fn lock(&self) -> MutexGuard<'_, PickerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
