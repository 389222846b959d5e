//! Check command implementation.
//!
//! Runs compatibility validation once without starting anything.

use crate::cli::CheckArgs;
use crate::config::{ConfigOverrides, ControllerConfig};
use crate::controller::{EventChannel, Validator};
use crate::error::{CliError, Result};
use crate::ui;
use expd_api::{ApiClient, HttpApiClient};
use std::sync::Arc;

/// Execute the check command.
///
/// # Errors
///
/// Returns an error when configuration can't be loaded or the project has
/// an error-severity compatibility issue. Warnings are printed only.
pub async fn execute(args: CheckArgs) -> Result<()> {
    let config = ControllerConfig::load(&ConfigOverrides::from(&args))?;
    ui::info(&format!(
        "Checking project at {}",
        config.project_root.display()
    ));

    let api: Arc<dyn ApiClient> = Arc::new(HttpApiClient::new(config.api.clone())?);
    let validator = Validator::new(api, EventChannel::new());

    match validator.check(&config.project_root).await {
        None => {
            ui::success("Project is compatible");
            Ok(())
        }
        Some(issue) if !issue.is_error() => {
            ui::warning(&issue.message);
            Ok(())
        }
        Some(issue) => {
            ui::error(&issue.message);
            Err(CliError::Custom(
                "Project is not compatible with the Exponent SDK".to_string(),
            ))
        }
    }
}
