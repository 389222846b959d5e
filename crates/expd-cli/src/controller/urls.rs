//! URL construction for manifests, bundles and the debugger.

use crate::config::{HostType, ProjectSettings, UrlType};
use std::net::{IpAddr, UdpSocket};

/// Module name the bundler serves for an entry point: `./main.js` -> `main`.
pub fn main_module_name(entry_point: &str) -> String {
    let path = entry_point.trim_start_matches("./");
    path.strip_suffix(".js").unwrap_or(path).to_string()
}

/// Query string appended to bundle URLs.
pub fn bundle_query_params(settings: &ProjectSettings) -> String {
    let mut params = format!("dev={}&minify={}", settings.dev, settings.minify);
    if settings.strict {
        params.push_str("&strict=true");
    }
    params
}

/// This machine's LAN address, if it has one.
///
/// Connecting a UDP socket sends nothing; it only makes the OS pick the
/// outbound interface.
pub fn lan_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
    socket.connect(("8.8.8.8", 80)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified() && !ip.is_loopback()).then_some(ip)
}

/// `host[:port]` devices use to reach the local server.
///
/// Tunnel hosts fall back to the LAN address until the tunnel is up.
pub fn server_host(host_type: HostType, port: u16, public_url: Option<&str>) -> String {
    match (host_type, public_url) {
        (HostType::Tunnel, Some(url)) => strip_scheme(url).to_string(),
        (HostType::Localhost, _) => format!("localhost:{}", port),
        (HostType::Tunnel, None) | (HostType::Lan, _) => local_host(port),
    }
}

/// `host:port` of the bundler for remote JS debugging.
pub fn debugger_host(packager_port: u16) -> String {
    local_host(packager_port)
}

/// Absolute bundle URL (without query).
pub fn bundle_url(host: &str) -> String {
    format!("http://{}/bundle", host)
}

/// Manifest URL shown to users, following the project's `urlType`.
pub fn manifest_url(url_type: UrlType, host: &str, api_base: &str) -> String {
    match url_type {
        UrlType::Exp => format!("exp://{}", host),
        UrlType::Http => format!("http://{}", host),
        UrlType::Redirect => format!(
            "{}/--/to-exp/{}",
            api_base.trim_end_matches('/'),
            urlencoding::encode(&format!("exp://{}", host))
        ),
    }
}

/// Convenience over [`server_host`] and [`manifest_url`].
pub fn manifest_url_for(
    settings: &ProjectSettings,
    port: u16,
    public_url: Option<&str>,
    api_base: &str,
) -> String {
    let host = server_host(settings.host_type, port, public_url);
    manifest_url(settings.url_type, &host, api_base)
}

fn local_host(port: u16) -> String {
    match lan_address() {
        Some(ip) => format!("{}:{}", ip, port),
        None => format!("localhost:{}", port),
    }
}

fn strip_scheme(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.trim_end_matches('/')
}
