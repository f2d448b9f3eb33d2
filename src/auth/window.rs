//! Popup window that runs an out-of-band authorization handshake.
//!
//! The popup is rendered by the backend and may be cross-origin, so nothing is
//! read back from it. Completion means only that the window is no longer open,
//! detected by polling its closed state.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument, warn};
use url::Url;

/// Popup width in CSS pixels.
pub const POPUP_WIDTH: i32 = 775;

/// Popup height in CSS pixels.
pub const POPUP_HEIGHT: i32 = 550;

/// How often the popup's closed state is checked.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Window name passed to the host; reusing it keeps hosts from stacking popups.
pub const POPUP_WINDOW_NAME: &str = "lms-authorization";

/// Query parameter that carries the session token to the authorization page.
pub const AUTHORIZATION_PARAM: &str = "authorization";

/// Position and size of the opener's screen area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenGeometry {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Outer width.
    pub width: i32,
    /// Outer height.
    pub height: i32,
}

/// Placement of a popup window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl PopupFeatures {
    /// Centers a `width` x `height` popup on `screen`, never starting left of
    /// or above the screen origin.
    #[must_use]
    pub fn centered(screen: ScreenGeometry, width: i32, height: i32) -> Self {
        Self {
            left: screen.left + ((screen.width - width) / 2).max(0),
            top: screen.top + ((screen.height - height) / 2).max(0),
            width,
            height,
        }
    }
}

impl fmt::Display for PopupFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "left={},top={},width={},height={}",
            self.left, self.top, self.width, self.height
        )
    }
}

/// A native popup window.
pub trait PopupWindow: Send + Sync {
    /// Returns true once the window is closed (by the user or the page).
    fn is_closed(&self) -> bool;

    /// Brings the window to the foreground.
    fn focus(&self);

    /// Closes the window.
    fn close(&self);
}

/// Something that can open popup windows (a browser, a terminal shim, a test fake).
pub trait PopupHost: Send + Sync {
    /// Geometry of the opener, used to center popups.
    fn screen(&self) -> ScreenGeometry;

    /// Opens `url` in a named popup. Returns `None` when the popup is blocked.
    fn open(&self, url: &Url, name: &str, features: &PopupFeatures)
    -> Option<Arc<dyn PopupWindow>>;
}

/// Errors from [`AuthWindow::authorize`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthWindowError {
    /// The host refused to create the popup (for example a popup blocker).
    #[error(
        "failed to open authorization window for {url}\n  Suggestion: Allow popups for this site and try again"
    )]
    WindowCreation {
        /// URL of the authorization page, without the token.
        url: String,
    },
}

/// Owns at most one authorization popup.
///
/// A second [`authorize`](Self::authorize) while the popup is open focuses it
/// and waits for the same window to close. Dropping the `AuthWindow` closes a
/// live popup.
pub struct AuthWindow {
    host: Arc<dyn PopupHost>,
    auth_token: String,
    authorization_url: Url,
    poll_interval: Duration,
    window: Mutex<Option<Arc<dyn PopupWindow>>>,
}

impl fmt::Debug for AuthWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthWindow")
            .field("authorization_url", &self.authorization_url.as_str())
            .field("poll_interval", &self.poll_interval)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl AuthWindow {
    /// Creates an authorization window manager. No popup is opened yet.
    #[must_use]
    pub fn new(
        host: Arc<dyn PopupHost>,
        auth_token: impl Into<String>,
        authorization_url: Url,
    ) -> Self {
        Self {
            host,
            auth_token: auth_token.into(),
            authorization_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            window: Mutex::new(None),
        }
    }

    /// Overrides the closed-state poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Authorization page this window opens (without the token).
    #[must_use]
    pub fn authorization_url(&self) -> &Url {
        &self.authorization_url
    }

    /// Returns true while a popup is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock_window()
            .as_ref()
            .is_some_and(|window| !window.is_closed())
    }

    /// Opens (or focuses) the popup and resolves once it has closed.
    ///
    /// A failed window creation is not remembered; the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns [`AuthWindowError::WindowCreation`] when the host blocks the popup.
    #[instrument(skip(self), fields(url = %self.authorization_url))]
    pub async fn authorize(&self) -> Result<(), AuthWindowError> {
        let window = self.open_or_focus()?;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if window.is_closed() {
                break;
            }
        }

        let mut slot = self.lock_window();
        if slot
            .as_ref()
            .is_some_and(|current| std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(&window)))
        {
            *slot = None;
        }
        debug!("Authorization window closed");
        Ok(())
    }

    /// Brings the popup to the foreground if one is open.
    pub fn focus(&self) {
        if let Some(window) = self.lock_window().as_ref()
            && !window.is_closed()
        {
            window.focus();
        }
    }

    /// Closes and releases the popup if one is open. Safe to call repeatedly.
    pub fn close(&self) {
        let window = self.lock_window().take();
        if let Some(window) = window
            && !window.is_closed()
        {
            debug!(url = %self.authorization_url, "Closing authorization window");
            window.close();
        }
    }

    fn open_or_focus(&self) -> Result<Arc<dyn PopupWindow>, AuthWindowError> {
        let mut slot = self.lock_window();
        if let Some(window) = slot.as_ref()
            && !window.is_closed()
        {
            debug!("Authorization window already open; focusing it");
            window.focus();
            return Ok(Arc::clone(window));
        }

        let features = PopupFeatures::centered(self.host.screen(), POPUP_WIDTH, POPUP_HEIGHT);
        let Some(window) = self
            .host
            .open(&self.popup_url(), POPUP_WINDOW_NAME, &features)
        else {
            *slot = None;
            warn!(url = %self.authorization_url, "Authorization popup was blocked");
            return Err(AuthWindowError::WindowCreation {
                url: self.authorization_url.to_string(),
            });
        };

        debug!(%features, "Opened authorization window");
        *slot = Some(Arc::clone(&window));
        Ok(window)
    }

    fn popup_url(&self) -> Url {
        let mut url = self.authorization_url.clone();
        url.query_pairs_mut()
            .append_pair(AUTHORIZATION_PARAM, &self.auth_token);
        url
    }

    fn lock_window(&self) -> MutexGuard<'_, Option<Arc<dyn PopupWindow>>> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AuthWindow {
    fn drop(&mut self) {
        self.close();
    }
}
