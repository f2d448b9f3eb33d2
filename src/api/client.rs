//! Authenticated backend client with one transparent token refresh.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::{ApiCallError, ApiError, RefreshSpec};
use crate::config::{ApiCallSpec, HttpSettings};

/// One backend request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Backend path, relative to the backend origin.
    pub path: String,
    /// JSON body. `Some` makes the request a POST.
    pub data: Option<Value>,
    /// Query string parameters.
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: None,
            params: Vec::new(),
        }
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, data: Value) -> Self {
        Self {
            path: path.into(),
            data: Some(data),
            params: Vec::new(),
        }
    }

    /// Creates the request described by an endpoint spec.
    #[must_use]
    pub fn from_spec(spec: &ApiCallSpec) -> Self {
        Self {
            path: spec.path.clone(),
            data: spec.data.clone(),
            params: Vec::new(),
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

/// HTTP client for the backend API.
///
/// Every request carries the session token verbatim in the `Authorization`
/// header. Status codes in `[200, 400)` are successes; `[400, 600)` become
/// [`ApiError`]. Transport and parse failures are returned unchanged inside
/// [`ApiCallError`].
///
/// The client is meant to be shared (`Arc<ApiClient>`) by every component of
/// a launch so concurrent calls share one token refresh.
#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth_token: String,
    refresh_generation: AtomicU64,
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    /// Creates a client with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(base_url: Url, auth_token: impl Into<String>) -> Result<Self, ApiCallError> {
        Self::with_settings(base_url, auth_token, &HttpSettings::default())
    }

    /// Creates a client with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallError::ClientBuild`] if the HTTP client cannot be built.
    pub fn with_settings(
        base_url: Url,
        auth_token: impl Into<String>,
        settings: &HttpSettings,
    ) -> Result<Self, ApiCallError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .gzip(true)
            .build()
            .map_err(|source| ApiCallError::ClientBuild { source })?;
        Ok(Self {
            client,
            base_url,
            auth_token: auth_token.into(),
            refresh_generation: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Session token sent with every request.
    #[must_use]
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// Backend origin.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a path or absolute URL against the backend origin.
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallError::InvalidPath`] when the result is not a valid URL.
    pub fn resolve_url(&self, path: &str) -> Result<Url, ApiCallError> {
        self.base_url
            .join(path)
            .map_err(|source| ApiCallError::InvalidPath {
                path: path.to_string(),
                source,
            })
    }

    /// Performs one request and decodes the JSON response.
    ///
    /// If the server reports an expired third-party token (an error body with
    /// a `refresh` instruction), the refresh call is made and the request is
    /// retried once. A second refresh signal is returned as an error.
    ///
    /// An empty success body decodes as JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallError`] on error statuses, transport failures, and
    /// undecodable bodies.
    #[instrument(skip(self, request), fields(path = %request.path, post = request.data.is_some()))]
    pub async fn call<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiCallError> {
        let seen_generation = self.refresh_generation.load(Ordering::Acquire);
        match self.send(request).await {
            Err(ApiCallError::Api(error)) => match error.refresh() {
                Some(refresh) => {
                    debug!(refresh_path = %refresh.path, "Server requested a token refresh");
                    self.refresh_credentials(refresh, seen_generation).await?;
                    self.send(request).await
                }
                None => Err(error.into()),
            },
            other => other,
        }
    }

    async fn refresh_credentials(
        &self,
        refresh: &RefreshSpec,
        seen_generation: u64,
    ) -> Result<(), ApiCallError> {
        let _guard = self.refresh_lock.lock().await;
        if self.refresh_generation.load(Ordering::Acquire) != seen_generation {
            debug!("Credentials already refreshed by a concurrent call");
            return Ok(());
        }

        let request = if refresh.method.eq_ignore_ascii_case("GET") {
            ApiRequest::get(&refresh.path)
        } else {
            ApiRequest::post(&refresh.path, json!({}))
        };
        if let Err(error) = self.execute(&request).await {
            warn!(error = %error, "Token refresh failed");
            return Err(error);
        }
        self.refresh_generation.fetch_add(1, Ordering::AcqRel);
        debug!("Token refreshed");
        Ok(())
    }

    async fn send<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiCallError> {
        let body = self.execute(request).await?;
        let body: &[u8] = if body.is_empty() { b"null" } else { &body };
        serde_json::from_slice(body).map_err(|source| ApiCallError::InvalidJson {
            path: request.path.clone(),
            source,
        })
    }

    async fn execute(&self, request: &ApiRequest) -> Result<Vec<u8>, ApiCallError> {
        let url = self.endpoint(request)?;
        let transport = |source| ApiCallError::Transport {
            path: request.path.clone(),
            source,
        };

        let builder = match &request.data {
            Some(data) => self.client.post(url).json(data),
            None => self.client.get(url),
        };
        let response = builder
            .header(AUTHORIZATION, self.auth_token.as_str())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport)?.to_vec();

        if status >= 400 {
            let parsed: Value =
                serde_json::from_slice(&body).map_err(|source| ApiCallError::InvalidJson {
                    path: request.path.clone(),
                    source,
                })?;
            let error = ApiError::from_body(&request.path, status, &parsed);
            debug!(
                status,
                error_code = error.error_code.as_deref().unwrap_or_default(),
                authorization = error.is_authorization_error(),
                "API call returned an error status"
            );
            return Err(error.into());
        }

        Ok(body)
    }

    fn endpoint(&self, request: &ApiRequest) -> Result<Url, ApiCallError> {
        let mut url = self.resolve_url(&request.path)?;
        if !request.params.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.params);
        }
        Ok(url)
    }
}
