//! Command-line interface definition for expd.
//!
//! Defines the CLI structure using clap v4's derive macros.
//!
//! # Command Structure
//!
//! - `expd start` - Run the bundler, local server and tunnel until Ctrl+C
//! - `expd check` - Validate the project against the SDK compatibility table

mod commands;
pub mod enums;
mod tests;
mod validation;

use clap::Parser;

pub use commands::{CheckArgs, Command, StartArgs};
pub use enums::*;
pub use validation::{parse_api_url, parse_port};

/// expd - development server for Exponent projects
#[derive(Parser, Debug)]
#[command(
    name = "expd",
    version,
    about = "Development server for Exponent projects",
    long_about = "expd supervises the React Native packager, serves the project manifest,\n\
                  proxies bundle requests and keeps a public tunnel open so a device\n\
                  can load the project from anywhere."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Shows detailed information about proxied requests, tunnel calls and
    /// packager lifecycle.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    ///
    /// Outputs plain text without ANSI color codes. Useful for logging to
    /// files or systems that don't support colored terminal output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
