//! Launch controller: content URL, groups, authorization retries and the
//! grading submission.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::join;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast::error::RecvError, watch};
use tracing::{debug, info, instrument, warn};

use super::{ClientRpc, LaunchErrorCode, LaunchErrorState, LaunchView};
use crate::api::{ApiCallError, ApiClient, ApiRequest, ErrorLike};
use crate::auth::{AuthWindow, DEFAULT_POLL_INTERVAL, PopupHost};
use crate::config::{ApiCallSpec, GradingConfig, LaunchConfig};

/// Observable state of a launch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LaunchState {
    /// URL shown in the iframe, once known.
    pub content_url: Option<String>,
    /// Fetches currently in flight.
    pub pending_fetch_count: usize,
    /// Authorization page to open on the next retry.
    pub authorization_url: Option<String>,
    /// Which error dialog is showing, if any.
    pub error_state: Option<LaunchErrorState>,
    /// Most recent failure. Kept while authorizing but not shown there.
    pub last_error: Option<ErrorLike>,
}

impl LaunchState {
    /// Content is ready once its URL is known.
    #[must_use]
    pub fn content_ready(&self) -> bool {
        self.content_url.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct ViaUrlResponse {
    via_url: String,
}

/// Drives one assignment launch.
///
/// The content-URL and groups fetches run concurrently on the caller's task.
/// Every state change is published on a watch channel; see
/// [`subscribe`](Self::subscribe).
pub struct LaunchController {
    api: Arc<ApiClient>,
    popups: Arc<dyn PopupHost>,
    rpc: Arc<dyn ClientRpc>,
    via_url: Option<ApiCallSpec>,
    sync: Option<ApiCallSpec>,
    grading: Option<GradingConfig>,
    poll_interval: Duration,
    state: watch::Sender<LaunchState>,
    auth_window: Mutex<Option<Arc<AuthWindow>>>,
    submitted: AtomicBool,
}

impl fmt::Debug for LaunchController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchController")
            .field("via_url", &self.via_url)
            .field("sync", &self.sync)
            .field("grading", &self.grading)
            .field("state", &*self.state.borrow())
            .field("submitted", &self.submitted.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl LaunchController {
    /// Creates a controller for the launch described by `config`.
    #[must_use]
    pub fn new(
        api: Arc<ApiClient>,
        popups: Arc<dyn PopupHost>,
        rpc: Arc<dyn ClientRpc>,
        config: &LaunchConfig,
    ) -> Self {
        let initial = LaunchState {
            content_url: config.content_url.clone(),
            ..LaunchState::default()
        };
        Self {
            api,
            popups,
            rpc,
            via_url: config.api.via_url.clone(),
            sync: config.api.sync.clone(),
            grading: config.grading.clone(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: watch::Sender::new(initial),
            auth_window: Mutex::new(None),
            submitted: AtomicBool::new(false),
        }
    }

    /// Overrides the authorization popup poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LaunchState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LaunchState> {
        self.state.subscribe()
    }

    /// Render-ready view of the current state.
    #[must_use]
    pub fn view(&self) -> LaunchView {
        LaunchView::from_state(&self.state.borrow())
    }

    /// True when the submission waits for annotation activity.
    #[must_use]
    pub fn submits_on_annotation(&self) -> bool {
        self.grading
            .as_ref()
            .is_some_and(|grading| grading.submit_on_annotation)
    }

    /// Runs the initial fetches and the submission reporter together.
    ///
    /// Completes once both fetches have settled and the submission has been
    /// made (or was not configured). With a deferred submission this waits
    /// for annotation activity.
    pub async fn run(&self) {
        join(self.fetch_all(), self.report_submission()).await;
    }

    /// Fetches the content URL and the groups concurrently.
    ///
    /// Returns true when both succeeded. Failures are recorded in the state.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> bool {
        let (content, groups) = join(self.fetch_content_url(), self.fetch_groups()).await;
        content && groups
    }

    /// The "Authorize" / "Try again" action.
    ///
    /// With a pending authorization URL, the popup is opened (or the open one
    /// focused) and awaited first. Both fetches then run again and the error
    /// is cleared only if both succeed. The error dialog stays up until then.
    #[instrument(skip(self))]
    pub async fn retry(&self) {
        let snapshot = self.state();
        if let Some(error_state) = snapshot.error_state
            && !error_state.allows_retry()
        {
            warn!(state = %error_state, "Retry is not available for this error");
            return;
        }

        if let Some(authorization_url) = snapshot.authorization_url {
            self.state.send_modify(|state| {
                state.error_state = Some(LaunchErrorState::Authorizing);
            });
            let window = match self.auth_window_for(&authorization_url) {
                Ok(window) => window,
                Err(error) => {
                    self.record_error(&error, LaunchErrorState::Fetching, false, None);
                    return;
                }
            };
            if let Err(error) = window.authorize().await {
                warn!(error = %error, "Authorization popup could not be opened");
                self.state.send_modify(|state| {
                    state.last_error = Some(ErrorLike::from_message(error.to_string()));
                });
                return;
            }
            self.state.send_modify(|state| state.authorization_url = None);
        }

        if self.fetch_all().await {
            self.state.send_modify(|state| {
                if state.error_state != Some(LaunchErrorState::ReportingSubmission) {
                    state.error_state = None;
                    state.last_error = None;
                }
            });
            info!("Launch recovered");
        }
    }

    /// Reports the grading submission once content is ready.
    ///
    /// Does nothing without a grading configuration. In deferred mode the
    /// activity subscription is taken before waiting and dropped once a
    /// qualifying event arrives. At most one submission is made per
    /// controller.
    #[instrument(skip(self))]
    pub async fn report_submission(&self) {
        let Some(grading) = &self.grading else {
            return;
        };

        let mut activity = grading
            .submit_on_annotation
            .then(|| self.rpc.annotation_activity());

        let mut ready = self.state.subscribe();
        if ready.wait_for(LaunchState::content_ready).await.is_err() {
            return;
        }

        if let Some(receiver) = activity.as_mut() {
            debug!("Waiting for shared annotation activity");
            loop {
                match receiver.recv().await {
                    Ok(event) if event.qualifies_for_submission() => break,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Annotation activity lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Annotation client went away before any activity");
                        return;
                    }
                }
            }
        }
        drop(activity);

        self.submit(grading).await;
    }

    async fn submit(&self, grading: &GradingConfig) {
        if self.submitted.swap(true, Ordering::AcqRel) {
            debug!("Submission already reported");
            return;
        }

        let request = ApiRequest::post(&grading.path, grading.submission_params.clone());
        match self.api.call::<Value>(&request).await {
            Ok(_) => info!(path = %grading.path, "Grading submission reported"),
            Err(error) => {
                warn!(error = %error, "Grading submission failed");
                let error = ErrorLike::from(&error);
                self.state.send_modify(|state| {
                    state.authorization_url = None;
                    state.error_state = Some(LaunchErrorState::ReportingSubmission);
                    state.last_error = Some(error);
                });
            }
        }
    }

    async fn fetch_content_url(&self) -> bool {
        let Some(spec) = &self.via_url else {
            return true;
        };

        self.begin_fetch();
        let result = self
            .api
            .call::<ViaUrlResponse>(&ApiRequest::from_spec(spec))
            .await;
        let ok = match result {
            Ok(response) => {
                debug!(url = %response.via_url, "Content URL resolved");
                self.state
                    .send_modify(|state| state.content_url = Some(response.via_url));
                true
            }
            Err(error) => {
                self.record_error(
                    &error,
                    LaunchErrorState::Fetching,
                    true,
                    spec.auth_url.as_deref(),
                );
                false
            }
        };
        self.end_fetch();
        ok
    }

    async fn fetch_groups(&self) -> bool {
        let Some(spec) = &self.sync else {
            return true;
        };

        self.begin_fetch();
        let ok = match self
            .api
            .call::<Vec<String>>(&ApiRequest::from_spec(spec))
            .await
        {
            Ok(groups) => {
                self.rpc.set_groups(groups);
                true
            }
            Err(error) => {
                self.record_error(
                    &error,
                    LaunchErrorState::Fetching,
                    true,
                    spec.auth_url.as_deref(),
                );
                false
            }
        };
        self.end_fetch();
        ok
    }

    fn begin_fetch(&self) {
        self.state
            .send_modify(|state| state.pending_fetch_count += 1);
    }

    fn end_fetch(&self) {
        self.state.send_modify(|state| {
            state.pending_fetch_count = state.pending_fetch_count.saturating_sub(1);
        });
    }

    /// Shared fetch error handler.
    ///
    /// A known server code wins, then an authorization failure (when the call
    /// is retryable), then `fallback`. A failed submission is never replaced.
    fn record_error(
        &self,
        error: &ApiCallError,
        fallback: LaunchErrorState,
        retryable: bool,
        authorization_url: Option<&str>,
    ) {
        let error = ErrorLike::from(error);
        let code = error
            .error_code
            .as_deref()
            .and_then(LaunchErrorCode::from_code);
        let error_state = match code {
            Some(code) => LaunchErrorState::Server(code),
            None if retryable && error.is_authorization_error() => LaunchErrorState::Authorizing,
            None => fallback,
        };
        debug!(
            state = %error_state,
            message = error.message.as_deref().unwrap_or_default(),
            "Launch fetch failed"
        );

        self.state.send_modify(|state| {
            if state.error_state == Some(LaunchErrorState::ReportingSubmission) {
                return;
            }
            state.authorization_url = if retryable {
                authorization_url.map(str::to_string)
            } else {
                None
            };
            state.last_error = (error_state != LaunchErrorState::Authorizing).then_some(error);
            state.error_state = Some(error_state);
        });
    }

    fn auth_window_for(&self, authorization_url: &str) -> Result<Arc<AuthWindow>, ApiCallError> {
        let url = self.api.resolve_url(authorization_url)?;
        let mut slot = self.lock_auth_window();
        if let Some(window) = slot.as_ref()
            && window.authorization_url() == &url
        {
            return Ok(Arc::clone(window));
        }

        let window = Arc::new(
            AuthWindow::new(Arc::clone(&self.popups), self.api.auth_token(), url)
                .with_poll_interval(self.poll_interval),
        );
        if let Some(previous) = slot.replace(Arc::clone(&window)) {
            previous.close();
        }
        Ok(window)
    }

    /// Closes the authorization popup, if one is open.
    pub fn close(&self) {
        if let Some(window) = self.lock_auth_window().as_ref() {
            window.close();
        }
    }

    fn lock_auth_window(&self) -> MutexGuard<'_, Option<Arc<AuthWindow>>> {
        self.auth_window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
