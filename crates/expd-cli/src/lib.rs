//! expd - development server controller for Exponent projects.
//!
//! Runs three cooperating pieces for one project and reports on them through
//! a single notification stream:
//!
//! - a local HTTP server that serves the app manifest and proxies everything
//!   else to the bundler
//! - the React Native packager as a supervised subprocess
//! - an ngrok tunnel exposing the local server publicly
//!
//! # Architecture
//!
//! - [`controller`] - orchestration and the three subcomponents
//! - [`config`] - layered configuration (defaults, `expd.json`, `EXPD_*`, CLI)
//! - [`error`] - error types with actionable messages
//! - [`logger`] - structured logging with tracing
//! - [`ui`] - terminal status lines and notification rendering
//! - `cli` / `commands` - the `expd` binary
//!
//! # Example
//!
//! ```rust,no_run
//! use expd_cli::{config::ControllerConfig, controller::Controller, error::Result};
//!
//! # async fn run() -> Result<()> {
//! let controller = Controller::new(ControllerConfig::new("/path/to/app"))?;
//! let ports = controller.start().await?;
//! println!("Serving on port {}", ports.port);
//! controller.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod logger;
pub mod ui;

pub use controller::{Controller, ControllerState, Notification};
pub use error::{CliError, ConfigError, Result, ResultExt};
