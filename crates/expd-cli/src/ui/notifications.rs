//! Terminal rendering of controller notifications.

use crate::controller::Notification;

use super::messages;

/// How a notification is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Bundler output, dimmed
    Debug,
    Success,
    Info,
    Warning,
    Error,
}

/// Level and text for a notification.
pub fn render_notification(notification: &Notification) -> (Level, String) {
    match notification {
        Notification::Stdout(line) => (Level::Debug, line.clone()),
        Notification::Stderr(line) if line.starts_with("Warning:") => {
            (Level::Warning, line.clone())
        }
        Notification::Stderr(line) => (Level::Error, line.clone()),
        Notification::PackagerReady => (Level::Success, "Packager ready".to_string()),
        Notification::PackagerWillStop => (Level::Info, "Stopping packager...".to_string()),
        Notification::PackagerStopped { code: Some(0) } => {
            (Level::Info, "Packager stopped".to_string())
        }
        Notification::PackagerStopped { code: Some(code) } => (
            Level::Error,
            format!("Packager exited with code {}", code),
        ),
        Notification::PackagerStopped { code: None } => {
            (Level::Warning, "Packager was killed".to_string())
        }
        Notification::NgrokWillStart { port } => {
            (Level::Info, format!("Starting tunnel to port {}...", port))
        }
        Notification::NgrokDidStart { url: Some(url), .. } => {
            (Level::Info, format!("Tunnel connected at {}", url))
        }
        Notification::NgrokDidStart { url: None, port } => (
            Level::Warning,
            format!("Couldn't open a tunnel to port {}", port),
        ),
        Notification::NgrokReady { url: Some(url), .. } => {
            (Level::Success, format!("Tunnel ready at {}", url))
        }
        Notification::NgrokReady { url: None, .. } => (
            Level::Warning,
            "Tunnel unavailable; use the LAN or localhost URL".to_string(),
        ),
        Notification::NgrokWillDisconnect { url } => {
            (Level::Info, format!("Closing tunnel {}...", url))
        }
        Notification::NgrokDisconnected { url } => {
            (Level::Info, format!("Tunnel {} closed", url))
        }
        Notification::NgrokDisconnectErr { error } => {
            (Level::Error, format!("Couldn't close tunnel: {}", error))
        }
    }
}

/// Print a notification to the terminal.
pub fn print_notification(notification: &Notification) {
    let (level, text) = render_notification(notification);
    match level {
        Level::Debug => messages::debug(&text),
        Level::Success => messages::success(&text),
        Level::Info => messages::info(&text),
        Level::Warning => messages::warning(&text),
        Level::Error => messages::error(&text),
    }
}
