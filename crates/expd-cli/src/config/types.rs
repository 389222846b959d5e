use serde::{Deserialize, Serialize};

/// How devices reach the local HTTP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostType {
    /// Through the public tunnel
    #[default]
    #[serde(alias = "ngrok")]
    Tunnel,
    /// Through the machine's LAN address
    Lan,
    /// Through `localhost` (simulators only)
    Localhost,
}

/// URL scheme used for the manifest URL shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlType {
    /// `exp://` deep link
    #[default]
    Exp,
    /// Plain `http://`
    Http,
    /// `http://` through the redirect service
    Redirect,
}

/// Per-project settings, read from `<root>/.exponent/settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    #[serde(default)]
    pub host_type: HostType,

    #[serde(default)]
    pub url_type: UrlType,

    /// Development mode bundles
    #[serde(default = "crate::config::defaults::default_dev")]
    pub dev: bool,

    /// Strict mode bundles
    #[serde(default)]
    pub strict: bool,

    /// Minified bundles
    #[serde(default)]
    pub minify: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            host_type: HostType::default(),
            url_type: UrlType::default(),
            dev: crate::config::defaults::default_dev(),
            strict: false,
            minify: false,
        }
    }
}

/// Tunnel agent settings; keys match `EXPD_TUNNEL__*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Base URL of the local ngrok agent API
    #[serde(default = "crate::config::defaults::default_agent_url")]
    pub agent_url: String,

    /// Domain public hostnames are created under
    #[serde(default = "crate::config::defaults::default_tunnel_domain")]
    pub domain: String,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            agent_url: crate::config::defaults::default_agent_url(),
            domain: crate::config::defaults::default_tunnel_domain(),
        }
    }
}
