//! Public tunnel management.
//!
//! The tunnel service sits behind [`TunnelProvider`]; [`NgrokAgent`] drives a
//! local ngrok agent through its HTTP API. [`TunnelManager`] serializes
//! connect and disconnect so at most one session exists.

use crate::controller::events::{EventChannel, Notification};
use crate::error::TunnelError;
use async_trait::async_trait;
use expd_api::ApiClient;
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Length of anonymous hostname tokens.
pub const RANDOM_TOKEN_LEN: usize = 7;

const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// What to expose and under which name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelRequest {
    /// Provider-side tunnel name, used again to disconnect
    pub name: String,
    /// Requested public hostname
    pub hostname: String,
    /// Local port to expose
    pub port: u16,
}

/// A service that exposes a local port publicly.
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    /// Open a tunnel and return its public URL.
    async fn connect(&self, request: &TunnelRequest) -> Result<String, TunnelError>;

    /// Close the tunnel `name` serving `public_url`.
    async fn disconnect(&self, name: &str, public_url: &str) -> Result<(), TunnelError>;
}

#[derive(Serialize)]
struct StartTunnel<'a> {
    name: &'a str,
    proto: &'static str,
    addr: String,
    hostname: &'a str,
}

#[derive(Deserialize)]
struct TunnelReply {
    public_url: String,
}

/// Tunnels through a local ngrok agent (`ngrok start --none`).
#[derive(Debug, Clone)]
pub struct NgrokAgent {
    client: reqwest::Client,
    agent_url: String,
}

impl NgrokAgent {
    pub fn new(agent_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            agent_url: agent_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn tunnels_url(&self) -> String {
        format!("{}/api/tunnels", self.agent_url)
    }
}

#[async_trait]
impl TunnelProvider for NgrokAgent {
    async fn connect(&self, request: &TunnelRequest) -> Result<String, TunnelError> {
        let url = self.tunnels_url();
        let response = self
            .client
            .post(&url)
            .json(&StartTunnel {
                name: &request.name,
                proto: "http",
                addr: request.port.to_string(),
                hostname: &request.hostname,
            })
            .send()
            .await
            .map_err(|source| TunnelError::Agent { url, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TunnelError::Connect {
                hostname: request.hostname.clone(),
                message: format!("agent returned {}: {}", status, body.trim()),
            });
        }

        let reply: TunnelReply = response.json().await.map_err(|e| TunnelError::Connect {
            hostname: request.hostname.clone(),
            message: format!("unexpected agent reply: {}", e),
        })?;
        Ok(reply.public_url)
    }

    async fn disconnect(&self, name: &str, public_url: &str) -> Result<(), TunnelError> {
        let url = format!("{}/{}", self.tunnels_url(), name);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|source| TunnelError::Agent { url, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TunnelError::Disconnect {
                url: public_url.to_string(),
                message: format!("agent returned {}", status),
            });
        }
        Ok(())
    }
}

/// Connection state of the tunnel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TunnelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// The one tunnel session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelSession {
    pub state: TunnelState,
    /// Public URL; `None` until connected
    pub public_url: Option<String>,
    pub hostname: Option<String>,
    name: Option<String>,
}

/// Opens and closes the public tunnel to the local server.
pub struct TunnelManager {
    provider: Arc<dyn TunnelProvider>,
    api: Arc<dyn ApiClient>,
    domain: String,
    project_name: String,
    events: EventChannel,
    ops: Mutex<()>,
    session: RwLock<TunnelSession>,
}

impl TunnelManager {
    pub fn new(
        provider: Arc<dyn TunnelProvider>,
        api: Arc<dyn ApiClient>,
        domain: impl Into<String>,
        project_name: impl Into<String>,
        events: EventChannel,
    ) -> Self {
        Self {
            provider,
            api,
            domain: domain.into(),
            project_name: project_name.into(),
            events,
            ops: Mutex::new(()),
            session: RwLock::new(TunnelSession::default()),
        }
    }

    /// Open a tunnel to `port`, closing any current one first.
    ///
    /// Never fails: provider errors are logged and leave the session
    /// disconnected, in which case `None` is returned.
    pub async fn start(&self, port: u16) -> Option<String> {
        let _op = self.ops.lock().await;

        if self.session.read().state == TunnelState::Connected {
            info!("Waiting for ngrok to disconnect...");
            self.stop_locked().await;
            info!("Disconnected ngrok; restarting...");
        }

        self.events.emit(Notification::NgrokWillStart { port });
        self.session.write().state = TunnelState::Connecting;

        let username = match self.api.whoami().await {
            Ok(user) => user.map(|user| user.username),
            Err(e) => {
                warn!("Couldn't determine who you are logged in as: {}", e);
                None
            }
        };

        let token = match &username {
            Some(username) => identity_token(username, &self.project_name),
            None => random_token(),
        };
        let request = TunnelRequest {
            hostname: format!("{}.{}", token, self.domain),
            name: token,
            port,
        };

        let url = match self.provider.connect(&request).await {
            Ok(url) => Some(url),
            Err(e) => {
                error!("Problem with ngrok: {}", e);
                None
            }
        };

        *self.session.write() = match &url {
            Some(url) => TunnelSession {
                state: TunnelState::Connected,
                public_url: Some(url.clone()),
                hostname: Some(request.hostname.clone()),
                name: Some(request.name.clone()),
            },
            None => TunnelSession::default(),
        };

        self.events.emit(Notification::NgrokDidStart {
            port,
            url: url.clone(),
        });
        self.events.emit(Notification::NgrokReady {
            port,
            url: url.clone(),
        });

        match &url {
            Some(url) => info!("Connected ngrok to port {} via {}", port, url),
            None => warn!("Tunnel to port {} is not available", port),
        }
        url
    }

    /// Close the current tunnel. No-op when none is connected.
    ///
    /// On failure the session stays connected so a later stop can retry.
    pub async fn stop(&self) {
        let _op = self.ops.lock().await;
        self.stop_locked().await;
    }

    async fn stop_locked(&self) {
        let (name, url) = {
            let mut session = self.session.write();
            if session.state != TunnelState::Connected {
                return;
            }
            let (Some(name), Some(url)) = (session.name.clone(), session.public_url.clone())
            else {
                *session = TunnelSession::default();
                return;
            };
            session.state = TunnelState::Disconnecting;
            (name, url)
        };

        self.events
            .emit(Notification::NgrokWillDisconnect { url: url.clone() });

        match self.provider.disconnect(&name, &url).await {
            Ok(()) => {
                *self.session.write() = TunnelSession::default();
                info!("Disconnected ngrok");
                self.events.emit(Notification::NgrokDisconnected { url });
            }
            Err(e) => {
                error!("Problem disconnecting ngrok: {}", e);
                self.session.write().state = TunnelState::Connected;
                self.events.emit(Notification::NgrokDisconnectErr {
                    error: e.to_string(),
                });
            }
        }
    }

    /// Public URL of the connected tunnel.
    pub fn public_url(&self) -> Option<String> {
        self.session.read().public_url.clone()
    }

    /// Snapshot of the session.
    pub fn session(&self) -> TunnelSession {
        self.session.read().clone()
    }
}

/// Stable hostname token for `username` working on `project`.
///
/// Lowercased; anything outside `[a-z0-9-]` becomes `-`.
pub fn identity_token(username: &str, project: &str) -> String {
    format!("{}-{}", username, project)
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Random seven-character `[a-z0-9]` token for anonymous sessions.
pub fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..RANDOM_TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}
