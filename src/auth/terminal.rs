//! Popup host for terminal sessions.
//!
//! A terminal cannot open a browser popup it can observe, so the URL is printed
//! for the user to open. The "window" counts as closed once the user presses
//! Enter.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{debug, warn};
use url::Url;

use super::window::{PopupFeatures, PopupHost, PopupWindow, ScreenGeometry};

/// [`PopupHost`] that asks the terminal user to complete authorization.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPopupHost;

impl TerminalPopupHost {
    /// Creates a terminal popup host.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PopupHost for TerminalPopupHost {
    fn screen(&self) -> ScreenGeometry {
        ScreenGeometry::default()
    }

    fn open(
        &self,
        url: &Url,
        name: &str,
        _features: &PopupFeatures,
    ) -> Option<Arc<dyn PopupWindow>> {
        let mut stderr = io::stderr().lock();
        let prompt = writeln!(
            stderr,
            "Authorization required. Open this URL in a browser, finish signing in, then press Enter:\n  {url}"
        );
        if let Err(error) = prompt {
            warn!(error = %error, "Cannot prompt for authorization");
            return None;
        }

        let window = Arc::new(TerminalWindow::default());
        let closed = Arc::clone(&window.closed);
        let spawned = thread::Builder::new()
            .name(format!("{name}-stdin"))
            .spawn(move || {
                let mut line = String::new();
                if let Err(error) = io::stdin().lock().read_line(&mut line) {
                    debug!(error = %error, "stdin closed while waiting for authorization");
                }
                closed.store(true, Ordering::SeqCst);
            });
        if let Err(error) = spawned {
            warn!(error = %error, "Cannot wait for authorization input");
            return None;
        }
        Some(window)
    }
}

#[derive(Debug, Default)]
struct TerminalWindow {
    closed: Arc<AtomicBool>,
}

impl PopupWindow for TerminalWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn focus(&self) {
        eprintln!("Authorization is still pending; press Enter once it is complete.");
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_window_close_marks_closed() {
        let window = TerminalWindow::default();
        assert!(!window.is_closed());
        window.close();
        assert!(window.is_closed());
    }
}
