//! Page-load configuration for a launch.
//!
//! The backend renders a JSON configuration object into the launch page. This
//! module deserializes it, validates the parts the core depends on, and holds
//! the HTTP settings used when building the API client.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::files::LmsSource;

/// Default HTTP connect timeout for backend calls (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout for backend calls (30 seconds).
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Backend path that records grading submissions.
pub const DEFAULT_SUBMISSION_PATH: &str = "/api/lti/submissions";

/// One backend endpoint plus the authorization URL to use when that call
/// reports an authorization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallSpec {
    /// Backend path, relative to the backend origin.
    pub path: String,
    /// Authorization URL opened in a popup when this call needs re-authorization.
    #[serde(default, alias = "authorizationUrl", skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    /// JSON body. Its presence turns the call into a POST.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiCallSpec {
    /// Creates a GET endpoint spec with no authorization URL.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            auth_url: None,
            data: None,
        }
    }

    /// Sets the authorization URL.
    #[must_use]
    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = Some(auth_url.into());
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Backend API section of the launch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Session token sent verbatim in the `Authorization` header.
    pub auth_token: String,
    /// Endpoint that resolves the content URL when it is not known at page load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via_url: Option<ApiCallSpec>,
    /// Endpoint that returns the student's groups for grouped assignments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<ApiCallSpec>,
}

/// Grading submission settings. Present only for gradable student launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingConfig {
    /// Backend path that records the submission.
    #[serde(default = "default_submission_path")]
    pub path: String,
    /// Opaque parameters posted with the submission.
    pub submission_params: Value,
    /// Defer submission until the student creates or updates a shared annotation.
    #[serde(default)]
    pub submit_on_annotation: bool,
}

fn default_submission_path() -> String {
    DEFAULT_SUBMISSION_PATH.to_string()
}

/// Configuration object rendered into the launch page by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    /// Backend API settings.
    pub api: ApiConfig,
    /// Origin of the backend. Relative API paths are resolved against it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
    /// Content URL known synchronously at page load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    /// Grading submission settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading: Option<GradingConfig>,
    /// "List files" endpoint per LMS content source, used by the file browser.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub file_picker: BTreeMap<LmsSource, ApiCallSpec>,
}

impl LaunchConfig {
    /// Parses and validates a launch configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            origin: "inline configuration".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the launch controller relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.auth_token.trim().is_empty() {
            return Err(ConfigError::invalid(
                "api.authToken is empty",
                "Render the session token into the launch configuration",
            ));
        }
        if self.content_url.is_none() && self.api.via_url.is_none() {
            return Err(ConfigError::invalid(
                "neither contentUrl nor api.viaUrl is set",
                "Provide the content URL directly or an endpoint that resolves it",
            ));
        }
        if let Some(grading) = &self.grading
            && grading.path.trim().is_empty()
        {
            return Err(ConfigError::invalid(
                "grading.path is empty",
                "Omit grading.path to use the default submission endpoint",
            ));
        }
        Ok(())
    }

    /// Returns the "list files" endpoint configured for `source`.
    #[must_use]
    pub fn list_files(&self, source: LmsSource) -> Option<&ApiCallSpec> {
        self.file_picker.get(&source)
    }
}

/// Loads and validates a launch configuration from a JSON file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or validated.
#[instrument(level = "debug", fields(path = %path.display()))]
pub fn load_launch_config(path: &Path) -> Result<LaunchConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: LaunchConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        origin: path.display().to_string(),
        source,
    })?;
    config.validate()?;
    debug!(
        deferred_content_url = config.api.via_url.is_some(),
        groups = config.api.sync.is_some(),
        grading = config.grading.is_some(),
        "Launch configuration loaded"
    );
    Ok(config)
}

/// Timeouts used when building the backend HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub read_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

impl HttpSettings {
    /// Creates settings from timeout values in seconds.
    #[must_use]
    pub fn from_secs(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self {
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            read_timeout: Duration::from_secs(read_timeout_secs),
        }
    }
}

/// Errors raised while loading the launch configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read launch configuration {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON or does not match the expected shape.
    #[error("invalid launch configuration JSON in {origin}: {source}")]
    Parse {
        /// File path or a description of the inline source.
        origin: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The configuration parsed but violates a launch invariant.
    #[error("invalid launch configuration: {message}\n  Suggestion: {suggestion}")]
    Invalid {
        /// What is wrong.
        message: String,
        /// How to fix it.
        suggestion: String,
    },
}

impl ConfigError {
    fn invalid(message: &str, suggestion: &str) -> Self {
        Self::Invalid {
            message: message.to_string(),
            suggestion: suggestion.to_string(),
        }
    }
}
