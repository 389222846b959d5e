//! Error handling for the expd CLI and controller.
//!
//! This module provides a hierarchical error type system using `thiserror`.
//! Each error variant is designed to be actionable and carry enough context to
//! help users resolve the issue.
//!
//! # Architecture
//!
//! - **Top-level errors** (`CliError`) represent broad categories of failures
//! - **Domain-specific errors** (`ConfigError`, `ProcessError`, `TunnelError`,
//!   `ManifestError`) provide detailed context
//! - **Error conversion** is automatic via `#[from]` attributes
//! - **Context helpers** allow attaching additional information to errors
//!
//! Advisory failures (compatibility validation, tunnel trouble) never show up
//! here; they travel as notifications. Only configuration, launch and stop
//! errors reach the caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use expd_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_package_json(root: &Path) -> Result<String> {
//!     let path = root.join("package.json");
//!     std::fs::read_to_string(&path)
//!         .with_path(&path)
//!         .with_hint("Run expd from the project root")
//! }
//! ```

pub mod miette;

pub use self::miette::cli_error_to_miette;

use expd_api::ApiError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (file not found, invalid syntax, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bundler subprocess errors
    #[error("Packager error: {0}")]
    Process(#[from] ProcessError),

    /// Tunnel errors
    #[error("Tunnel error: {0}")]
    Tunnel(#[from] TunnelError),

    /// Manifest serving errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Remote API errors
    #[error("{0}")]
    Api(#[from] ApiError),

    /// The controller is not in a state that allows the operation
    #[error("Cannot {operation} while the controller is {state}")]
    InvalidState {
        /// Operation that was attempted
        operation: &'static str,
        /// Current controller state
        state: String,
    },

    /// One or more subcomponents failed to start
    #[error("Failed to start: {}", .failures.join("; "))]
    StartFailed {
        /// One message per failed subcomponent
        failures: Vec<String>,
    },

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Local HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file has invalid JSON syntax
    #[error("Invalid JSON in config file: {0}\n\nHint: Use a JSON validator to check syntax")]
    InvalidJson(#[from] serde_json::Error),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// I/O error while reading config
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Bundler subprocess errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Ports were not assigned before the packager was started
    #[error("The packager port must be set before starting the packager\n\nHint: Start through the controller so ports are allocated first")]
    PortNotAssigned,

    /// The bundler could not be launched
    #[error("Failed to launch {}: {source}\n\nHint: Check that the bundler CLI exists and the runtime is on PATH", .command.display())]
    Spawn {
        /// Command that failed to launch
        command: PathBuf,
        /// Underlying launch error
        #[source]
        source: std::io::Error,
    },

    /// The bundler did not exit within the stop deadline
    #[error("Stopping packager timed out after {timeout_ms}ms; the process may still be running")]
    StopTimeout {
        /// Deadline that elapsed
        timeout_ms: u64,
    },

    /// The termination signal could not be delivered
    #[error("Failed to signal packager (pid {pid}): {message}")]
    Signal {
        /// Target process id
        pid: u32,
        /// OS error text
        message: String,
    },
}

/// Tunnel errors.
///
/// The tunnel manager never propagates these; they are logged and turned into
/// notifications.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// The tunnel could not be opened
    #[error("Could not open tunnel for {hostname}: {message}")]
    Connect {
        /// Requested public hostname
        hostname: String,
        /// Provider error text
        message: String,
    },

    /// The tunnel could not be closed
    #[error("Could not close tunnel {url}: {message}")]
    Disconnect {
        /// Public URL of the tunnel
        url: String,
        /// Provider error text
        message: String,
    },

    /// Transport error talking to the tunnel agent
    #[error("Tunnel agent unreachable at {url}: {source}")]
    Agent {
        /// Agent endpoint
        url: String,
        /// Transport error
        #[source]
        source: reqwest::Error,
    },
}

/// Manifest serving errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// package.json is missing or unreadable
    #[error("Can't read project metadata at {}: {message}", .path.display())]
    ProjectUnreadable {
        /// Path of the metadata file
        path: PathBuf,
        /// Reason
        message: String,
    },

    /// exp.sdkVersion is required to sign or publish
    #[error("exp.sdkVersion is missing from package.json file")]
    MissingSdkVersion,

    /// The remote signing call failed
    #[error("Failed to sign manifest: {0}")]
    Signing(#[source] ApiError),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Add a file path to the error context.
    ///
    /// I/O "not found" errors become [`CliError::FileNotFound`].
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Add a helpful hint to the error context.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error with a custom message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_timeout_message() {
        let err = ProcessError::StopTimeout { timeout_ms: 10_000 };
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("10000ms"));
    }

    #[test]
    fn test_spawn_error_names_command() {
        let err = ProcessError::Spawn {
            command: PathBuf::from("node"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to launch node"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_cli_error_from_process_error() {
        let cli_err: CliError = ProcessError::PortNotAssigned.into();
        assert!(matches!(cli_err, CliError::Process(_)));
    }

    #[test]
    fn test_start_failed_joins_failures() {
        let err = CliError::StartFailed {
            failures: vec!["packager: boom".to_string(), "server: bind".to_string()],
        };
        assert_eq!(err.to_string(), "Failed to start: packager: boom; server: bind");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = CliError::InvalidState {
            operation: "start",
            state: "running".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot start while the controller is running");
    }

    #[test]
    fn test_result_ext_with_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        let err = result.with_path("/test/package.json").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn test_result_ext_with_hint() {
        let result: std::result::Result<(), ConfigError> =
            Err(ConfigError::MissingField {
                field: "project_root".to_string(),
                hint: "Pass a project directory".to_string(),
            });

        let err = result.with_hint("Try creating the file").unwrap_err();
        assert!(err.to_string().contains("Hint: Try creating the file"));
    }

    #[test]
    fn test_result_ext_context() {
        let result: std::result::Result<(), ProcessError> = Err(ProcessError::PortNotAssigned);

        let err = result.context("Failed to restart").unwrap_err();
        assert!(err.to_string().starts_with("Failed to restart: "));
    }

    #[test]
    fn test_config_error_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "hostType".to_string(),
            value: "carrier-pigeon".to_string(),
            hint: "Must be 'tunnel', 'lan' or 'localhost'".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid value for 'hostType'"));
        assert!(msg.contains("carrier-pigeon"));
    }
}
