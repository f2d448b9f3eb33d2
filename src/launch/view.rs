//! Render-ready projection of [`LaunchState`].

use serde::Serialize;

use super::{LaunchErrorState, LaunchState};
use crate::api::ErrorLike;

/// Action offered by the error dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryAction {
    /// Open the authorization popup, then re-fetch.
    Authorize,
    /// Re-fetch.
    TryAgain,
}

/// Error dialog contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDialog {
    /// Error state that opened the dialog.
    pub state: LaunchErrorState,
    /// Details shown to the user. Absent for a plain authorization prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorLike>,
    /// `None` when the error cannot be retried in this session.
    pub retry_action: Option<RetryAction>,
}

/// What the launch page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchView {
    /// Content is still loading and nothing else is shown.
    pub show_spinner: bool,
    /// Content URL loaded into the iframe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iframe_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_dialog: Option<ErrorDialog>,
}

impl LaunchView {
    /// Projects `state`. Only content readiness and the error state matter;
    /// the groups fetch never holds back the iframe.
    #[must_use]
    pub fn from_state(state: &LaunchState) -> Self {
        let error_dialog = state.error_state.map(|error_state| ErrorDialog {
            state: error_state,
            error: match error_state {
                LaunchErrorState::Authorizing => None,
                _ => state.last_error.clone(),
            },
            retry_action: error_state.allows_retry().then_some(match error_state {
                LaunchErrorState::Authorizing => RetryAction::Authorize,
                _ => RetryAction::TryAgain,
            }),
        });
        let iframe_url = if error_dialog.is_none() {
            state.content_url.clone()
        } else {
            None
        };

        Self {
            show_spinner: !state.content_ready() && error_dialog.is_none(),
            iframe_url,
            error_dialog,
        }
    }
}
