//! Shared fixtures for integration tests: a scripted popup host and backend
//! client helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lms_launch_core::auth::{PopupFeatures, PopupHost, PopupWindow, ScreenGeometry};
use lms_launch_core::ApiClient;
use url::Url;
use wiremock::MockServer;

pub const TEST_TOKEN: &str = "Bearer test-token";

/// Poll interval short enough to keep authorization tests fast.
pub const FAST_POLL: Duration = Duration::from_millis(10);

pub fn api_client(server: &MockServer) -> Arc<ApiClient> {
    let base = Url::parse(&server.uri()).expect("mock server URI is a URL");
    Arc::new(ApiClient::new(base, TEST_TOKEN).expect("client builds"))
}

/// Popup host whose windows report closed after a fixed number of polls.
pub struct FakePopupHost {
    closes_after_polls: usize,
    blocked: AtomicBool,
    opened: Mutex<Vec<Url>>,
    focuses: Arc<AtomicUsize>,
}

impl FakePopupHost {
    pub fn new(closes_after_polls: usize) -> Arc<Self> {
        Arc::new(Self {
            closes_after_polls,
            blocked: AtomicBool::new(false),
            opened: Mutex::new(Vec::new()),
            focuses: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// A host that refuses every popup, like a popup blocker.
    pub fn blocking() -> Arc<Self> {
        let host = Self::new(0);
        host.set_blocked(true);
        host
    }

    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn opened_urls(&self) -> Vec<Url> {
        self.opened.lock().unwrap().clone()
    }

    pub fn focus_count(&self) -> usize {
        self.focuses.load(Ordering::SeqCst)
    }
}

impl PopupHost for FakePopupHost {
    fn screen(&self) -> ScreenGeometry {
        ScreenGeometry {
            left: 0,
            top: 0,
            width: 1920,
            height: 1080,
        }
    }

    fn open(
        &self,
        url: &Url,
        _name: &str,
        _features: &PopupFeatures,
    ) -> Option<Arc<dyn PopupWindow>> {
        if self.blocked.load(Ordering::SeqCst) {
            return None;
        }
        self.opened.lock().unwrap().push(url.clone());
        Some(Arc::new(FakeWindow {
            polls: AtomicUsize::new(0),
            closes_after_polls: self.closes_after_polls,
            closed: AtomicBool::new(false),
            focuses: Arc::clone(&self.focuses),
        }))
    }
}

struct FakeWindow {
    polls: AtomicUsize,
    closes_after_polls: usize,
    closed: AtomicBool,
    focuses: Arc<AtomicUsize>,
}

impl PopupWindow for FakeWindow {
    fn is_closed(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return true;
        }
        let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if polls > self.closes_after_polls {
            self.closed.store(true, Ordering::SeqCst);
            return true;
        }
        false
    }

    fn focus(&self) {
        self.focuses.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
