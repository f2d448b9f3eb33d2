//! Third-party authorization through a popup window.
//!
//! [`AuthWindow`] owns one popup at a time and resolves when it closes.
//! [`PopupHost`]/[`PopupWindow`] abstract the thing that actually shows the
//! page; [`TerminalPopupHost`] is the implementation used by the CLI.

mod terminal;
mod window;

pub use terminal::TerminalPopupHost;
pub use window::{
    AUTHORIZATION_PARAM, AuthWindow, AuthWindowError, DEFAULT_POLL_INTERVAL, POPUP_HEIGHT,
    POPUP_WIDTH, POPUP_WINDOW_NAME, PopupFeatures, PopupHost, PopupWindow, ScreenGeometry,
};
