//! Lifecycle notifications emitted by the controller's subcomponents.
//!
//! Each subcomponent owns an [`EventChannel`]; the controller merges them
//! into one stream for subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of each subcomponent's broadcast channel.
///
/// Slow subscribers lag and skip events rather than block the emitter.
pub const CHANNEL_CAPACITY: usize = 256;

/// Events in the controller lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "payload", rename_all = "kebab-case")]
pub enum Notification {
    /// One line of bundler stdout, or an advisory message
    Stdout(String),

    /// One line of bundler stderr, or a validation message
    Stderr(String),

    /// The bundler printed its ready marker
    PackagerReady,

    /// The bundler is about to be terminated
    PackagerWillStop,

    /// The bundler exited; `None` when killed by a signal
    PackagerStopped { code: Option<i32> },

    /// A tunnel to `port` is being opened
    NgrokWillStart { port: u16 },

    /// The tunnel attempt finished; `url` is `None` on failure
    NgrokDidStart { port: u16, url: Option<String> },

    /// The tunnel is ready for use
    NgrokReady { port: u16, url: Option<String> },

    /// The tunnel at `url` is being closed
    NgrokWillDisconnect { url: String },

    /// The tunnel at `url` was closed
    NgrokDisconnected { url: String },

    /// Closing the tunnel failed
    NgrokDisconnectErr { error: String },
}

impl Notification {
    /// The wire tag of this notification.
    pub fn tag(&self) -> &'static str {
        match self {
            Notification::Stdout(_) => "stdout",
            Notification::Stderr(_) => "stderr",
            Notification::PackagerReady => "packager-ready",
            Notification::PackagerWillStop => "packager-will-stop",
            Notification::PackagerStopped { .. } => "packager-stopped",
            Notification::NgrokWillStart { .. } => "ngrok-will-start",
            Notification::NgrokDidStart { .. } => "ngrok-did-start",
            Notification::NgrokReady { .. } => "ngrok-ready",
            Notification::NgrokWillDisconnect { .. } => "ngrok-will-disconnect",
            Notification::NgrokDisconnected { .. } => "ngrok-disconnected",
            Notification::NgrokDisconnectErr { .. } => "ngrok-disconnect-err",
        }
    }
}

/// Broadcast channel for one subcomponent's notifications.
#[derive(Debug, Clone)]
pub struct EventChannel {
    tx: broadcast::Sender<Notification>,
}

impl EventChannel {
    /// Create a channel with [`CHANNEL_CAPACITY`].
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Send a notification to all current subscribers.
    ///
    /// Having no subscribers is not an error.
    pub fn emit(&self, notification: Notification) {
        tracing::debug!(tag = notification.tag(), "notification");
        let _ = self.tx.send(notification);
    }

    /// Subscribe to notifications emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}
