use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::enums::*;
use crate::cli::validation::{parse_api_url, parse_port};

/// Available expd subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server
    ///
    /// Allocates ports, then starts the local HTTP server, the packager and
    /// the tunnel together. Runs until Ctrl+C.
    Start(StartArgs),

    /// Check the project against the SDK compatibility table
    ///
    /// Verifies package.json declares the Exponent fork of react-native and a
    /// valid exp.sdkVersion. Exits non-zero on errors.
    Check(CheckArgs),
}

/// Arguments for the start command
#[derive(Args, Debug, Clone)]
pub struct StartArgs {
    /// Project root (directory containing package.json)
    #[arg(default_value = ".", value_name = "PROJECT_ROOT")]
    pub project_root: PathBuf,

    /// Port for the local HTTP server
    ///
    /// When either port is omitted both are allocated from 19000 upwards.
    #[arg(short, long, value_parser = parse_port)]
    pub port: Option<u16>,

    /// Port for the packager
    #[arg(long, value_parser = parse_port)]
    pub packager_port: Option<u16>,

    /// Start the packager with --reset-cache
    #[arg(long)]
    pub reset_cache: bool,

    /// Override the project's hostType setting
    #[arg(long, value_enum)]
    pub host: Option<HostArg>,

    /// API root URL
    #[arg(long, value_name = "URL", value_parser = parse_api_url)]
    pub api_url: Option<String>,

    /// Session secret of the logged-in user
    ///
    /// Enables manifest signing and a stable tunnel hostname.
    #[arg(long, value_name = "TOKEN", env = "EXPD_SESSION")]
    pub session: Option<String>,
}

/// Arguments for the check command
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Project root (directory containing package.json)
    #[arg(default_value = ".", value_name = "PROJECT_ROOT")]
    pub project_root: PathBuf,

    /// API root URL
    #[arg(long, value_name = "URL", value_parser = parse_api_url)]
    pub api_url: Option<String>,
}
