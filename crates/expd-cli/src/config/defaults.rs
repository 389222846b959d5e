use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Config file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "expd.json";

/// Prefix of environment overrides (`EXPD_TUNNEL__DOMAIN`, ...).
pub const ENV_PREFIX: &str = "EXPD_";

/// Project settings file, relative to the project root.
pub const PROJECT_SETTINGS_PATH: &str = ".exponent/settings.json";

/// Bundler CLI script, relative to the project root.
pub const DEFAULT_CLI_PATH: &str = "node_modules/react-native/local-cli/cli.js";

pub fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

pub fn default_runtime() -> PathBuf {
    PathBuf::from("node")
}

pub fn default_stop_timeout_ms() -> u64 {
    10_000
}

pub fn default_dev() -> bool {
    true
}

pub fn default_agent_url() -> String {
    "http://127.0.0.1:4040".to_string()
}

pub fn default_tunnel_domain() -> String {
    "exp.direct".to_string()
}
