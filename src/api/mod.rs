//! Backend API access and the error taxonomy every retry decision depends on.
//!
//! # Overview
//!
//! - [`ApiClient`] performs one authenticated request and classifies the outcome.
//! - [`ApiError`] is an HTTP 4xx/5xx answer with the server's diagnostics.
//! - [`ApiCallError`] wraps [`ApiError`] and the transport/parse failures,
//!   which are carried unchanged so callers can tell "the server said no"
//!   from "the request never completed".
//! - [`ErrorLike`] is the normalized shape stored in controller state.
//! - [`is_authorization_error`] decides when the caller must re-authorize.

mod client;
mod error;

pub use client::{ApiClient, ApiRequest};
pub use error::{ApiCallError, ApiError, ErrorLike, RefreshSpec, is_authorization_error};
