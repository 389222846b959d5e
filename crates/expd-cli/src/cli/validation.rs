/// Parse an API root URL.
///
/// Accepts `http://` and `https://` URLs; a trailing slash is dropped.
///
/// # Errors
///
/// Returns an error message for any other scheme or an empty host.
pub fn parse_api_url(s: &str) -> Result<String, String> {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .ok_or_else(|| format!("API URL must start with http:// or https://: '{}'", s))?;

    if rest.trim_end_matches('/').is_empty() {
        return Err(format!("API URL has no host: '{}'", s));
    }

    Ok(s.trim_end_matches('/').to_string())
}

/// Parse a port number, rejecting 0.
pub fn parse_port(s: &str) -> Result<u16, String> {
    match s.parse::<u16>() {
        Ok(0) => Err("Port must be between 1 and 65535".to_string()),
        Ok(port) => Ok(port),
        Err(_) => Err(format!("Invalid port: '{}'", s)),
    }
}
