//! Miette diagnostic conversion for CLI errors.
//!
//! This module provides conversion from CLI errors to miette diagnostics
//! for error reporting at the binary boundary.

use crate::error::{CliError, ProcessError};
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Process(e) => process_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        CliError::StartFailed { failures } => {
            let lines = failures
                .iter()
                .map(|f| format!("  - {}", f))
                .collect::<Vec<_>>()
                .join("\n");
            miette::miette!(
                "Failed to start the development server:\n{}\n\nHint: Components that started are still running; press Ctrl+C to stop them",
                lines
            )
        }
        _ => miette::miette!("{}", err),
    }
}

/// Convert ProcessError to miette Report
pub fn process_error_to_miette(err: ProcessError) -> Report {
    match err {
        ProcessError::StopTimeout { timeout_ms } => miette::miette!(
            "Stopping packager timed out after {}ms\n\nHint: The packager may still be running; stop it manually or retry",
            timeout_ms
        ),
        _ => miette::miette!("{}", err),
    }
}
