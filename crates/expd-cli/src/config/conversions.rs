use crate::cli::{CheckArgs, HostArg, StartArgs};
use crate::config::types::HostType;
use std::path::PathBuf;

impl From<HostArg> for HostType {
    fn from(h: HostArg) -> Self {
        match h {
            HostArg::Tunnel => HostType::Tunnel,
            HostArg::Lan => HostType::Lan,
            HostArg::Localhost => HostType::Localhost,
        }
    }
}

/// Values given on the command line; they win over every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub project_root: PathBuf,
    pub port: Option<u16>,
    pub packager_port: Option<u16>,
    pub reset_cache: bool,
    pub host_type: Option<HostType>,
    pub api_url: Option<String>,
    pub session: Option<String>,
}

impl ConfigOverrides {
    /// Overrides that only pin the project root.
    pub fn for_root(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Self::default()
        }
    }
}

impl From<&StartArgs> for ConfigOverrides {
    fn from(args: &StartArgs) -> Self {
        Self {
            project_root: args.project_root.clone(),
            port: args.port,
            packager_port: args.packager_port,
            reset_cache: args.reset_cache,
            host_type: args.host.map(Into::into),
            api_url: args.api_url.clone(),
            session: args.session.clone(),
        }
    }
}

impl From<&CheckArgs> for ConfigOverrides {
    fn from(args: &CheckArgs) -> Self {
        Self {
            api_url: args.api_url.clone(),
            ..Self::for_root(args.project_root.clone())
        }
    }
}
