//! Default command: install msgvault.

use std::process::ExitCode;
use std::sync::Arc;

use mvi_core::path_env::{self, PathChange};
use mvi_core::{InstallError, InstallReport, Installer, Reporter};
use mvi_schema::Platform;

use crate::Cli;
use crate::ui::Output;

pub async fn install(cli: &Cli) -> ExitCode {
    let output = Arc::new(Output::new(cli.quiet));

    // Unsupported machines fail here, before any request is made.
    let platform = match Platform::detect() {
        Ok(platform) => platform,
        Err(e) => return fail(output.as_ref(), &InstallError::from(e)),
    };
    tracing::debug!("Detected platform {platform}");

    let client = match mvi_core::io::download::build_client() {
        Ok(client) => client,
        Err(e) => {
            output.error(&format!("Failed to initialize HTTP client: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let installer = Installer::new(
        client,
        cli.release_source(),
        platform,
        cli.install_options(),
        output.clone(),
    );

    // Dropping the run future on Ctrl-C releases its workspace.
    let result = tokio::select! {
        result = installer.run() => result,
        _ = tokio::signal::ctrl_c() => Err(InstallError::Interrupted),
    };

    match result {
        Ok(report) => {
            summarize(output.as_ref(), &report);
            ExitCode::SUCCESS
        }
        Err(e) => fail(output.as_ref(), &e),
    }
}

fn summarize(output: &Output, report: &InstallReport) {
    if report.dry_run {
        output.info("Dry run: nothing was downloaded or installed");
        return;
    }

    match report.path_change {
        Some(PathChange::Added) => {
            path_env::export_to_process(&report.install_dir);
            output.info(&format!(
                "Added {} to PATH. Restart your terminal to pick it up.",
                report.install_dir.display()
            ));
        }
        Some(PathChange::AlreadyPresent) => {}
        None => {
            if !on_process_path(report) {
                output.info(&format!(
                    "{} is not on PATH; run it as {}",
                    report.install_dir.display(),
                    report.destination.display()
                ));
            }
        }
    }

    output.success("Run `msgvault --help` to get started");
}

fn on_process_path(report: &InstallReport) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    let entries: Vec<String> = std::env::split_paths(&path)
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    path_env::path_contains(&entries, &report.install_dir.to_string_lossy())
}

fn fail(output: &Output, error: &InstallError) -> ExitCode {
    tracing::debug!("Install failed: {error:?}");
    output.error(&error.to_string());
    ExitCode::from(error.exit_code())
}
