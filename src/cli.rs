//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use lms_launch_core::LmsSource;
use lms_launch_core::config::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS};

/// Default number of "Authorize"/"Try again" rounds during `launch`.
pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;

/// Run LMS assignment launches and browse LMS course files from a terminal.
///
/// Reads the launch configuration a backend renders into the launch page,
/// resolves the assignment content (authorizing when the backend asks for
/// it), reports the grading submission, and prints what the page would show.
#[derive(Parser, Debug)]
#[command(name = "lms-launch")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Backend origin; overrides `backendUrl` from the configuration
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// HTTP connect timeout in seconds (1-300)
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=300), global = true)]
    pub connect_timeout: u64,

    /// HTTP read timeout in seconds (1-3600)
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600), global = true)]
    pub read_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an assignment launch and print the resulting view as JSON
    Launch(LaunchArgs),
    /// List a folder of LMS course files as JSON
    Files(FilesArgs),
}

/// Arguments for `lms-launch launch`.
#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Launch configuration JSON file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Maximum "Authorize"/"Try again" rounds after a failed fetch (0-20)
    #[arg(short = 'a', long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u8).range(0..=20))]
    pub max_attempts: u8,
}

/// Arguments for `lms-launch files`.
#[derive(Args, Debug)]
pub struct FilesArgs {
    /// Launch configuration JSON file with a `filePicker` section
    #[arg(short, long)]
    pub config: PathBuf,

    /// LMS source to browse (canvas, canvas_pages, blackboard, d2l, moodle, moodle_pages)
    #[arg(short, long)]
    pub source: LmsSource,

    /// Folder ids to open in order, starting from the root listing
    #[arg(long = "open", value_name = "FOLDER_ID")]
    pub open: Vec<String>,
}
