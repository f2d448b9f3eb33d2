//! LMS Launch Core Library
//!
//! Headless core of an LMS assignment launcher: the page embedded into
//! Canvas, Blackboard, Moodle and D2L that lets instructors pick content and
//! shows that content to students.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`api`] - Authenticated backend calls and the error taxonomy
//! - [`auth`] - Popup-window authorization
//! - [`config`] - Page-load launch configuration
//! - [`files`] - Folder-navigable LMS file browser
//! - [`content`] - Content selection and the content-item manifest
//! - [`launch`] - Launch controller: content URL, groups, retries, grading

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod files;
pub mod launch;

// Re-export commonly used types
pub use api::{
    ApiCallError, ApiClient, ApiError, ApiRequest, ErrorLike, is_authorization_error,
};
pub use auth::{AuthWindow, AuthWindowError, PopupHost, PopupWindow, TerminalPopupHost};
pub use config::{ApiCallSpec, ConfigError, HttpSettings, LaunchConfig, load_launch_config};
pub use content::{Content, ContentError, ContentSource, PickerOutcome, select_content};
pub use files::{FileEntry, FolderPath, LmsFilePicker, LmsSource, PickerAction, PickerStatus};
pub use launch::{
    BroadcastClientRpc, ClientRpc, LaunchController, LaunchErrorCode, LaunchErrorState,
    LaunchState, LaunchView,
};
