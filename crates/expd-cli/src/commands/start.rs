//! Start command implementation.
//!
//! Runs the controller until Ctrl+C:
//! - Load configuration and resolve the user session
//! - Start the local server, packager and tunnel together
//! - Print notifications as they arrive
//! - Stop everything on shutdown, killing the packager if it hangs

use crate::cli::StartArgs;
use crate::config::{ConfigOverrides, ControllerConfig};
use crate::controller::Controller;
use crate::error::{CliError, ProcessError, Result};
use crate::ui;
use tokio::signal;
use tokio_stream::StreamExt;

/// Execute the start command.
///
/// A partial start is reported but not fatal: whatever came up keeps
/// running until Ctrl+C.
///
/// # Errors
///
/// Returns configuration errors, and a stop timeout when the packager had
/// to be killed.
pub async fn execute(args: StartArgs) -> Result<()> {
    let config = ControllerConfig::load(&ConfigOverrides::from(&args))?;
    ui::info(&format!(
        "Starting project at {}",
        config.project_root.display()
    ));

    let controller = Controller::new(config)?;
    match controller.refresh_user().await {
        Some(user) => ui::info(&format!("Logged in as {}", user.username)),
        None => ui::info("Not logged in; manifests will be served unsigned"),
    }

    // Subscribe before starting so early bundler output isn't missed
    let mut notifications = controller.subscribe();

    match controller.start().await {
        Ok(ports) => ui::success(&format!(
            "Server on port {}, packager on port {}",
            ports.port, ports.packager_port
        )),
        Err(CliError::StartFailed { failures }) => {
            for failure in &failures {
                ui::error(&format!("Failed to start {}", failure));
            }
        }
        Err(e) => return Err(e),
    }

    if let Some(url) = controller.manifest_url() {
        ui::success(&format!("Your URL is: {}", url));
    }
    ui::info("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(notification) = notifications.next() => {
                ui::print_notification(&notification);
            }

            _ = signal::ctrl_c() => {
                ui::info("Shutting down...");
                break;
            }
        }
    }

    match controller.stop().await {
        Err(CliError::Process(ProcessError::StopTimeout { timeout_ms })) => {
            ui::warning(&format!(
                "Packager didn't stop within {}ms; killing it",
                timeout_ms
            ));
            controller.kill_packager().await;
            Err(ProcessError::StopTimeout { timeout_ms }.into())
        }
        result => {
            if result.is_ok() {
                ui::success("Stopped");
            }
            result
        }
    }
}
