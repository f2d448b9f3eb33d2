//! CLI entry point for the LMS launch tool.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use lms_launch_core::{
    ApiClient, BroadcastClientRpc, HttpSettings, LaunchConfig, LaunchController, LmsFilePicker,
    PickerStatus, TerminalPopupHost, load_launch_config,
};
use tracing::{debug, info, warn};
use url::Url;

mod cli;

use cli::{Cli, Command, FilesArgs, LaunchArgs};

/// Exit code when the launch ends with an error dialog or the listing failed.
const EXIT_UNRESOLVED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    debug!(?cli, "CLI arguments parsed");

    let settings = HttpSettings::from_secs(cli.connect_timeout, cli.read_timeout);
    match &cli.command {
        Command::Launch(args) => run_launch(&cli, args, &settings).await,
        Command::Files(args) => run_files(&cli, args, &settings).await,
    }
}

fn build_client(cli: &Cli, config: &LaunchConfig, settings: &HttpSettings) -> Result<ApiClient> {
    let backend = cli
        .backend_url
        .as_deref()
        .or(config.backend_url.as_deref())
        .ok_or_else(|| {
            anyhow!(
                "no backend URL configured\n  Suggestion: Pass --backend-url or set backendUrl in the configuration"
            )
        })?;
    let base_url =
        Url::parse(backend).with_context(|| format!("invalid backend URL '{backend}'"))?;
    Ok(ApiClient::with_settings(
        base_url,
        config.api.auth_token.as_str(),
        settings,
    )?)
}

async fn run_launch(cli: &Cli, args: &LaunchArgs, settings: &HttpSettings) -> Result<ExitCode> {
    let config = load_launch_config(&args.config)?;
    let api = Arc::new(build_client(cli, &config, settings)?);
    let rpc = Arc::new(BroadcastClientRpc::new());
    let controller =
        LaunchController::new(api, Arc::new(TerminalPopupHost::new()), rpc.clone(), &config);

    info!(config = %args.config.display(), "Launch starting");
    controller.fetch_all().await;

    let mut attempts = 0;
    while let Some(dialog) = controller.view().error_dialog {
        if dialog.retry_action.is_none() || attempts >= args.max_attempts {
            break;
        }
        attempts += 1;
        info!(attempt = attempts, state = %dialog.state, "Retrying launch");
        controller.retry().await;
    }

    if controller.state().content_ready() && controller.view().error_dialog.is_none() {
        if controller.submits_on_annotation() {
            info!("Grading submission waits for annotation activity; not reporting it");
        } else {
            controller.report_submission().await;
        }
    }
    controller.close();

    if let Some(groups) = rpc.groups() {
        debug!(?groups, "Groups forwarded to annotation client");
    }

    let view = controller.view();
    println!("{}", serde_json::to_string_pretty(&view)?);
    if let Some(dialog) = &view.error_dialog {
        warn!(state = %dialog.state, "Launch ended with an error");
        return Ok(ExitCode::from(EXIT_UNRESOLVED));
    }
    info!("Launch complete");
    Ok(ExitCode::SUCCESS)
}

async fn run_files(cli: &Cli, args: &FilesArgs, settings: &HttpSettings) -> Result<ExitCode> {
    let config = load_launch_config(&args.config)?;
    let Some(list_files) = config.list_files(args.source) else {
        bail!(
            "no file picker endpoint configured for {}\n  Suggestion: Add filePicker.{} to the configuration",
            args.source.label(),
            args.source.key()
        );
    };
    let api = Arc::new(build_client(cli, &config, settings)?);
    let picker = LmsFilePicker::new(api, Arc::new(TerminalPopupHost::new()), list_files.clone())?;

    picker.load().await;
    authorize_if_needed(&picker).await?;
    for folder_id in &args.open {
        let PickerStatus::Fetched { files } = picker.status() else {
            break;
        };
        let Some(folder) = files
            .into_iter()
            .find(|entry| entry.id == *folder_id && entry.is_folder())
        else {
            bail!(
                "folder '{folder_id}' not found in '{}'",
                picker.current_folder().display_name
            );
        };
        picker.navigate_to(&folder).await;
        authorize_if_needed(&picker).await?;
    }

    let breadcrumbs = picker.view().breadcrumbs.join(" / ");
    match picker.status() {
        PickerStatus::Fetched { files } => {
            info!(folder = %breadcrumbs, count = files.len(), "Folder listed");
            println!("{}", serde_json::to_string_pretty(&files)?);
            Ok(ExitCode::SUCCESS)
        }
        PickerStatus::Error { error } => {
            println!("{}", serde_json::to_string_pretty(&error)?);
            warn!(folder = %breadcrumbs, "Listing failed");
            Ok(ExitCode::from(EXIT_UNRESOLVED))
        }
        PickerStatus::Authorizing { .. } | PickerStatus::Fetching { .. } => {
            warn!(folder = %breadcrumbs, "Listing still requires authorization");
            Ok(ExitCode::from(EXIT_UNRESOLVED))
        }
    }
}

async fn authorize_if_needed(picker: &LmsFilePicker) -> Result<()> {
    if matches!(picker.status(), PickerStatus::Authorizing { .. }) {
        picker.authorize().await?;
    }
    Ok(())
}
