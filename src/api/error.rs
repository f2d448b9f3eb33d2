//! Error types for backend API calls.
//!
//! [`ApiError`] is the server answering with a 4xx/5xx status. [`ApiCallError`]
//! adds the cases where no usable answer arrived at all. [`ErrorLike`] is the
//! normalized, cloneable shape that state machines store and views render.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Refresh instruction attached to an error response when a third-party
/// access token has expired.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshSpec {
    /// HTTP method of the refresh call (`GET` or `POST`).
    #[serde(default = "default_refresh_method")]
    pub method: String,
    /// Backend path of the refresh call.
    pub path: String,
}

fn default_refresh_method() -> String {
    "POST".to_string()
}

/// The backend answered with an HTTP error status.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("API call to {path} failed with HTTP {status}{}", describe_server_message(.server_message))]
pub struct ApiError {
    /// Backend path that failed.
    pub path: String,
    /// HTTP status code (400..600).
    pub status: u16,
    /// Machine-readable code from the body's `error_code`.
    pub error_code: Option<String>,
    /// Human-readable message from the body's `message`; empty when absent.
    pub server_message: String,
    /// Extra diagnostics from the body's `details` (object or string).
    pub details: Option<Value>,
    refresh: Option<RefreshSpec>,
}

fn describe_server_message(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

impl ApiError {
    /// Creates an error with no diagnostics.
    #[must_use]
    pub fn new(path: impl Into<String>, status: u16) -> Self {
        Self {
            path: path.into(),
            status,
            error_code: None,
            server_message: String::new(),
            details: None,
            refresh: None,
        }
    }

    /// Builds an error from a parsed error response body.
    ///
    /// Fields that are missing or of the wrong type are treated as absent.
    #[must_use]
    pub fn from_body(path: impl Into<String>, status: u16, body: &Value) -> Self {
        let text_field = |name: &str| body.get(name).and_then(Value::as_str);
        Self {
            path: path.into(),
            status,
            error_code: text_field("error_code")
                .filter(|code| !code.is_empty())
                .map(str::to_string),
            server_message: text_field("message").unwrap_or_default().to_string(),
            details: body.get("details").filter(|details| !details.is_null()).cloned(),
            refresh: body
                .get("refresh")
                .and_then(|refresh| RefreshSpec::deserialize(refresh).ok()),
        }
    }

    /// Sets the server error code.
    #[must_use]
    pub fn with_error_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = Some(error_code.into());
        self
    }

    /// Sets the server message.
    #[must_use]
    pub fn with_server_message(mut self, message: impl Into<String>) -> Self {
        self.server_message = message.into();
        self
    }

    /// Refresh instruction, when the server asked for a token refresh.
    #[must_use]
    pub fn refresh(&self) -> Option<&RefreshSpec> {
        self.refresh.as_ref()
    }

    /// See [`is_authorization_error`].
    #[must_use]
    pub fn is_authorization_error(&self) -> bool {
        self.error_code.is_none() && self.server_message.is_empty()
    }
}

/// Any failure of a single backend call.
#[derive(Debug, Error)]
pub enum ApiCallError {
    /// The server answered with an error status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request never completed (DNS, connect, TLS, timeout, body read).
    #[error("request to {path} did not complete: {source}")]
    Transport {
        /// Backend path that was requested.
        path: String,
        /// Unchanged transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered but the body was not the expected JSON.
    #[error("invalid JSON in response from {path}: {source}")]
    InvalidJson {
        /// Backend path that was requested.
        path: String,
        /// Unchanged parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The path could not be turned into a URL against the backend origin.
    #[error("invalid API path '{path}': {source}")]
    InvalidPath {
        /// Offending path.
        path: String,
        /// Underlying URL parse error.
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {source}")]
    ClientBuild {
        /// Underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl ApiCallError {
    /// Returns the server error, if the server answered.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            _ => None,
        }
    }

    /// See [`is_authorization_error`].
    #[must_use]
    pub fn is_authorization_error(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_authorization_error)
    }
}

/// Normalized error shape stored in state and shown to users.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLike {
    /// Human-readable summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Server-provided diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Server error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Server message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_message: Option<String>,
    /// HTTP status; present only when the server answered with an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorLike {
    /// Creates an error carrying only a message.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// See [`is_authorization_error`].
    #[must_use]
    pub fn is_authorization_error(&self) -> bool {
        is_authorization_error(self)
    }
}

/// Returns true when `error` means "the caller must re-authorize".
///
/// An error the server answered with, carrying neither an error code nor a
/// server message, is an authorization failure. Status codes are not
/// consulted. Errors that never reached the server are never authorization
/// failures.
#[must_use]
pub fn is_authorization_error(error: &ErrorLike) -> bool {
    error.status.is_some()
        && error.error_code.is_none()
        && error.server_message.as_deref().unwrap_or_default().is_empty()
}

impl From<&ApiError> for ErrorLike {
    fn from(error: &ApiError) -> Self {
        Self {
            message: Some(error.to_string()),
            details: error.details.clone(),
            error_code: error.error_code.clone(),
            server_message: (!error.server_message.is_empty())
                .then(|| error.server_message.clone()),
            status: Some(error.status),
        }
    }
}

impl From<&ApiCallError> for ErrorLike {
    fn from(error: &ApiCallError) -> Self {
        match error {
            ApiCallError::Api(api_error) => Self::from(api_error),
            other => Self::from_message(other.to_string()),
        }
    }
}

impl From<ApiCallError> for ErrorLike {
    fn from(error: ApiCallError) -> Self {
        Self::from(&error)
    }
}
