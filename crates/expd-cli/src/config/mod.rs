//! Controller configuration with multi-source loading.
//!
//! Merges settings from CLI args, environment variables, and `expd.json`.
//! Priority: CLI > Environment > File > Defaults
//!
//! Project settings (`hostType`, `urlType`, bundle flags) are read from
//! `<root>/.exponent/settings.json` and never written back.

mod conversions;
mod defaults;
mod loading;
mod types;
mod validation;

use expd_api::ApiConfig;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

pub use conversions::ConfigOverrides;
pub use defaults::*;
pub use types::*;

/// Controller configuration - loaded from expd.json, `EXPD_*` and CLI args.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Absolute project root
    pub project_root: PathBuf,

    /// Port of the local HTTP server; allocated on start when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Port of the bundler; allocated on start when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packager_port: Option<u16>,

    /// Address the local HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Runtime executable the bundler CLI runs under
    #[serde(default = "default_runtime")]
    pub runtime: PathBuf,

    /// Bundler CLI script; relative paths resolve against the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_path: Option<PathBuf>,

    /// Entry point; derived from package.json when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,

    /// Main module path; derived from the entry point when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_module_path: Option<String>,

    /// How long `stop` waits for the bundler to exit
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// Pass `--reset-cache` to the bundler on the initial start
    #[serde(default)]
    pub reset_cache: bool,

    /// Settings from `.exponent/settings.json`
    #[serde(skip)]
    pub settings: ProjectSettings,

    #[serde(default)]
    pub tunnel: TunnelConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

impl ControllerConfig {
    /// Configuration with every default applied.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            port: None,
            packager_port: None,
            bind_address: default_bind_address(),
            runtime: default_runtime(),
            cli_path: None,
            entry_point: None,
            main_module_path: None,
            stop_timeout_ms: default_stop_timeout_ms(),
            reset_cache: false,
            settings: ProjectSettings::default(),
            tunnel: TunnelConfig::default(),
            api: ApiConfig::default(),
        }
    }

    /// Resolved bundler CLI script.
    pub fn cli_path(&self) -> PathBuf {
        match &self.cli_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.project_root.join(path),
            None => self.project_root.join(DEFAULT_CLI_PATH),
        }
    }

    /// Stop deadline as a `Duration`.
    pub fn stop_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.stop_timeout_ms)
    }
}
