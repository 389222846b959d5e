//! Orchestration controller.
//!
//! Owns the configuration and brings up three subcomponents together:
//!
//! - [`LocalServer`] - manifest routes and reverse proxy to the bundler
//! - [`Supervisor`] - the bundler subprocess
//! - [`TunnelManager`] - the public tunnel to the local server
//!
//! Subcomponents report through [`Notification`]s, merged by
//! [`Controller::subscribe`]. Compatibility validation runs alongside and
//! only ever produces notifications.

pub mod cache;
pub mod events;
pub mod manifest;
pub mod ports;
pub mod project;
pub mod server;
pub mod supervisor;
pub mod tunnel;
pub mod urls;
pub mod validator;

pub use cache::ManifestCache;
pub use events::{EventChannel, Notification};
pub use manifest::ManifestContext;
pub use ports::{find_free_ports, PortAssignment};
pub use server::LocalServer;
pub use supervisor::{SubprocessState, SubprocessStatus, Supervisor};
pub use tunnel::{NgrokAgent, TunnelManager, TunnelProvider, TunnelSession, TunnelState};
pub use validator::{CompatibilityIssue, Severity, Validator};

use crate::config::ControllerConfig;
use crate::error::{CliError, ConfigError, Result};
use expd_api::{ApiClient, HttpApiClient, User};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

/// Merged notifications from every subcomponent.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Notification> + Send>>;

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Idle => "idle",
            ControllerState::Starting => "starting",
            ControllerState::Running => "running",
            ControllerState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Coordinates the local server, bundler and tunnel for one project.
pub struct Controller {
    config: RwLock<ControllerConfig>,
    state: Mutex<ControllerState>,
    api: Arc<dyn ApiClient>,
    user: Arc<RwLock<Option<User>>>,
    packager_events: EventChannel,
    tunnel_events: EventChannel,
    validator_events: EventChannel,
    supervisor: Supervisor,
    tunnel: Arc<TunnelManager>,
    server: LocalServer,
    cache: Arc<ManifestCache>,
    validator: Arc<Validator>,
    client: reqwest::Client,
}

impl Controller {
    /// Controller talking to the configured API and ngrok agent.
    pub fn new(config: ControllerConfig) -> Result<Self> {
        let api: Arc<dyn ApiClient> = Arc::new(HttpApiClient::new(config.api.clone())?);
        let provider: Arc<dyn TunnelProvider> =
            Arc::new(NgrokAgent::new(config.tunnel.agent_url.clone()));
        Ok(Self::with_components(config, api, provider))
    }

    /// Controller with explicit API client and tunnel provider.
    pub fn with_components(
        config: ControllerConfig,
        api: Arc<dyn ApiClient>,
        provider: Arc<dyn TunnelProvider>,
    ) -> Self {
        let packager_events = EventChannel::new();
        let tunnel_events = EventChannel::new();
        let validator_events = EventChannel::new();

        let tunnel = Arc::new(TunnelManager::new(
            provider,
            api.clone(),
            config.tunnel.domain.clone(),
            project::project_short_name(&config.project_root),
            tunnel_events.clone(),
        ));
        let validator = Arc::new(Validator::new(api.clone(), validator_events.clone()));

        Self {
            config: RwLock::new(config),
            state: Mutex::new(ControllerState::Idle),
            api,
            user: Arc::new(RwLock::new(None)),
            supervisor: Supervisor::new(packager_events.clone()),
            packager_events,
            tunnel_events,
            validator_events,
            tunnel,
            server: LocalServer::new(),
            cache: Arc::new(ManifestCache::new()),
            validator,
            client: reqwest::Client::new(),
        }
    }

    /// Allocate ports if needed and start all subcomponents concurrently.
    ///
    /// # Errors
    ///
    /// [`CliError::InvalidState`] unless idle. [`CliError::StartFailed`]
    /// when any subcomponent fails; the others keep running and the
    /// controller is `running`, so [`Controller::stop`] cleans up.
    pub async fn start(&self) -> Result<PortAssignment> {
        self.transition("start", ControllerState::Idle, ControllerState::Starting)?;

        self.validator.spawn(self.project_root());

        let ports = match self.ensure_ports() {
            Ok(ports) => ports,
            Err(e) => {
                *self.state.lock() = ControllerState::Idle;
                return Err(e);
            }
        };
        info!(
            "Using port {} for the server and {} for the packager",
            ports.port, ports.packager_port
        );

        let reset_cache = self.config.read().reset_cache;
        let (server, packager, tunnel) = tokio::join!(
            self.start_or_restart_local_server(),
            self.start_or_restart_packager(reset_cache),
            self.start_or_restart_tunnel(),
        );
        *self.state.lock() = ControllerState::Running;

        let mut failures = Vec::new();
        if let Err(e) = server {
            failures.push(format!("local server: {}", e));
        }
        if let Err(e) = packager {
            failures.push(format!("packager: {}", e));
        }
        if let Err(e) = tunnel {
            failures.push(format!("tunnel: {}", e));
        }
        if !failures.is_empty() {
            return Err(CliError::StartFailed { failures });
        }
        Ok(ports)
    }

    /// Stop every subcomponent, returning the first error after trying all.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state == ControllerState::Idle {
                return Ok(());
            }
            *state = ControllerState::Stopping;
        }

        let (_, packager, _) = tokio::join!(
            self.stop_local_server(),
            self.stop_packager(),
            self.stop_tunnel(),
        );
        *self.state.lock() = ControllerState::Idle;
        packager.map(|_| ())
    }

    /// (Re)start the local HTTP server on the assigned port.
    ///
    /// Drops the cached signed manifest, since it names the old server.
    pub async fn start_or_restart_local_server(&self) -> Result<SocketAddr> {
        let ports = self.require_ports()?;
        let config = self.config.read().clone();
        let main_module = self.main_module(&config).await;
        self.cache.clear().await;

        let context = Arc::new(ManifestContext {
            project_root: config.project_root,
            ports,
            settings: config.settings,
            main_module,
            api: self.api.clone(),
            tunnel: self.tunnel.clone(),
            user: self.user.clone(),
            cache: self.cache.clone(),
            validator: self.validator.clone(),
            client: self.client.clone(),
        });
        self.server.start(config.bind_address, context).await
    }

    /// (Re)start the bundler.
    pub async fn start_or_restart_packager(&self, reset_cache: bool) -> Result<()> {
        let config = self.config.read().clone();
        self.supervisor.start(&config, reset_cache).await
    }

    /// (Re)open the tunnel to the local server port.
    ///
    /// Tunnel failures are reported through notifications; the result is
    /// `Ok(None)` in that case.
    pub async fn start_or_restart_tunnel(&self) -> Result<Option<String>> {
        let ports = self.require_ports()?;
        Ok(self.tunnel.start(ports.port).await)
    }

    pub async fn stop_local_server(&self) {
        self.server.stop().await;
    }

    /// Stop the bundler under the configured deadline.
    pub async fn stop_packager(&self) -> Result<Option<i32>> {
        let timeout = self.config.read().stop_timeout();
        self.supervisor.stop(timeout).await
    }

    pub async fn stop_tunnel(&self) {
        self.tunnel.stop().await;
    }

    /// Forcibly kill the bundler.
    pub async fn kill_packager(&self) -> Option<i32> {
        self.supervisor.kill().await
    }

    /// Merged stream of notifications from the bundler, tunnel and
    /// validator. Order is preserved within each source only.
    pub fn subscribe(&self) -> NotificationStream {
        let packager = notifications(&self.packager_events);
        let tunnel = notifications(&self.tunnel_events);
        let validator = notifications(&self.validator_events);
        Box::pin(packager.merge(tunnel).merge(validator))
    }

    /// Run compatibility validation in the background.
    pub fn validate(&self) -> tokio::task::JoinHandle<()> {
        self.validator.spawn(self.project_root())
    }

    /// Run compatibility validation and return the first issue.
    pub async fn check_compatibility(&self) -> Option<CompatibilityIssue> {
        self.validator.check(&self.project_root()).await
    }

    /// Ask the API who the session belongs to and remember the answer.
    ///
    /// Failure is logged and leaves the session anonymous.
    pub async fn refresh_user(&self) -> Option<User> {
        let user = match self.api.whoami().await {
            Ok(user) => user,
            Err(e) => {
                warn!("Couldn't determine who you are logged in as: {}", e);
                None
            }
        };
        self.set_user(user.clone());
        user
    }

    pub fn set_user(&self, user: Option<User>) {
        *self.user.write() = user;
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock()
    }

    /// Both ports, once assigned.
    pub fn ports(&self) -> Option<PortAssignment> {
        let config = self.config.read();
        Some(PortAssignment {
            port: config.port?,
            packager_port: config.packager_port?,
        })
    }

    pub fn public_url(&self) -> Option<String> {
        self.tunnel.public_url()
    }

    pub fn tunnel_session(&self) -> TunnelSession {
        self.tunnel.session()
    }

    pub async fn packager_status(&self) -> Option<SubprocessStatus> {
        self.supervisor.status().await
    }

    /// URL users open on their device, once ports are assigned.
    pub fn manifest_url(&self) -> Option<String> {
        let ports = self.ports()?;
        let public_url = self.public_url();
        let config = self.config.read();
        Some(urls::manifest_url_for(
            &config.settings,
            ports.port,
            public_url.as_deref(),
            &config.api.base_url,
        ))
    }

    pub fn project_short_name(&self) -> String {
        project::project_short_name(&self.config.read().project_root)
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ControllerConfig {
        self.config.read().clone()
    }

    fn project_root(&self) -> std::path::PathBuf {
        self.config.read().project_root.clone()
    }

    fn transition(
        &self,
        operation: &'static str,
        from: ControllerState,
        to: ControllerState,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if *state != from {
            return Err(CliError::InvalidState {
                operation,
                state: state.to_string(),
            });
        }
        *state = to;
        Ok(())
    }

    /// Assign both ports in one allocation unless both are already set.
    fn ensure_ports(&self) -> Result<PortAssignment> {
        if let Some(ports) = self.ports() {
            return Ok(ports);
        }
        let ports = ports::allocate(ports::DEFAULT_LOWER_BOUND)?;
        let mut config = self.config.write();
        config.port = Some(ports.port);
        config.packager_port = Some(ports.packager_port);
        Ok(ports)
    }

    fn require_ports(&self) -> Result<PortAssignment> {
        self.ports().ok_or_else(|| {
            ConfigError::MissingField {
                field: "port".to_string(),
                hint: "Start the controller first so ports are allocated".to_string(),
            }
            .into()
        })
    }

    /// Configured main module, else derived from the entry point.
    async fn main_module(&self, config: &ControllerConfig) -> String {
        if let Some(main_module) = &config.main_module_path {
            return urls::main_module_name(main_module);
        }
        let entry_point = match &config.entry_point {
            Some(entry_point) => entry_point.clone(),
            None => match project::PackageJson::read(&config.project_root).await {
                Ok(pkg) => pkg.entry_point(),
                Err(e) => {
                    warn!("{}; assuming {}", e, project::DEFAULT_ENTRY_POINT);
                    project::DEFAULT_ENTRY_POINT.to_string()
                }
            },
        };
        urls::main_module_name(&entry_point)
    }
}

fn notifications(channel: &EventChannel) -> impl Stream<Item = Notification> + Send {
    BroadcastStream::new(channel.subscribe()).filter_map(|item| match item {
        Ok(notification) => Some(notification),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!("Notification subscriber lagged; skipped {}", skipped);
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TunnelError;
    use async_trait::async_trait;
    use expd_api::{ApiError, HttpMethod};
    use serde_json::Value;

    struct Offline;

    #[async_trait]
    impl ApiClient for Offline {
        async fn call_method(
            &self,
            method: &str,
            _args: Value,
            _http_method: HttpMethod,
            _body: Option<Value>,
        ) -> std::result::Result<Value, ApiError> {
            Err(ApiError::Remote {
                code: None,
                message: format!("{} unavailable", method),
            })
        }

        async fn call_path(&self, _path: &str) -> std::result::Result<Value, ApiError> {
            Ok(Value::Null)
        }
    }

    struct NoTunnel;

    #[async_trait]
    impl TunnelProvider for NoTunnel {
        async fn connect(
            &self,
            request: &tunnel::TunnelRequest,
        ) -> std::result::Result<String, TunnelError> {
            Err(TunnelError::Connect {
                hostname: request.hostname.clone(),
                message: "offline".to_string(),
            })
        }

        async fn disconnect(
            &self,
            _name: &str,
            _public_url: &str,
        ) -> std::result::Result<(), TunnelError> {
            Ok(())
        }
    }

    fn controller(config: ControllerConfig) -> Controller {
        Controller::with_components(config, Arc::new(Offline), Arc::new(NoTunnel))
    }

    #[test]
    fn test_initial_state() {
        let controller = controller(ControllerConfig::new("/tmp/my-app"));
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.ports(), None);
        assert_eq!(controller.manifest_url(), None);
        assert_eq!(controller.project_short_name(), "my-app");
        assert_eq!(controller.user(), None);
    }

    #[test]
    fn test_ports_require_both() {
        let mut config = ControllerConfig::new("/tmp/my-app");
        config.port = Some(19000);
        let controller = controller(config);
        assert_eq!(controller.ports(), None);
    }

    #[test]
    fn test_ensure_ports_allocates_both() {
        let mut config = ControllerConfig::new("/tmp/my-app");
        config.port = Some(19000);
        let controller = controller(config);

        let ports = controller.ensure_ports().unwrap();
        assert_ne!(ports.port, ports.packager_port);
        assert_eq!(controller.ports(), Some(ports));
    }

    #[tokio::test]
    async fn test_refresh_user_failure_is_anonymous() {
        let controller = controller(ControllerConfig::new("/tmp/my-app"));
        controller.set_user(Some(User {
            username: "jane".to_string(),
        }));
        assert_eq!(controller.refresh_user().await, None);
        assert_eq!(controller.user(), None);
    }

    #[tokio::test]
    async fn test_sub_start_requires_ports() {
        let controller = controller(ControllerConfig::new("/tmp/my-app"));
        assert!(controller.start_or_restart_tunnel().await.is_err());
        assert!(controller.start_or_restart_local_server().await.is_err());
        assert!(controller.start_or_restart_packager(false).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_when_idle() {
        let controller = controller(ControllerConfig::new("/tmp/my-app"));
        controller.stop().await.unwrap();
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[tokio::test]
    async fn test_server_restart_clears_signed_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = ControllerConfig::new(dir.path());
        config.bind_address = std::net::IpAddr::from([127, 0, 0, 1]);
        config.port = Some(0);
        config.packager_port = Some(1);
        let controller = controller(config);

        let signed: std::result::Result<String, ()> = controller
            .cache
            .get_signed("{}", || async { Ok("signed".to_string()) })
            .await;
        assert_eq!(signed.unwrap(), "signed");
        assert!(controller.cache.cached_raw().await.is_some());

        controller.start_or_restart_local_server().await.unwrap();
        assert_eq!(controller.cache.cached_raw().await, None);
        controller.stop_local_server().await;
    }

    #[tokio::test]
    async fn test_main_module_precedence() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"main": "src/main.js"}"#,
        )
        .unwrap();
        let mut config = ControllerConfig::new(dir.path());
        let controller = controller(config.clone());
        assert_eq!(controller.main_module(&config).await, "src/main");

        config.entry_point = Some("./entry.js".to_string());
        assert_eq!(controller.main_module(&config).await, "entry");

        config.main_module_path = Some("custom.js".to_string());
        assert_eq!(controller.main_module(&config).await, "custom");
    }
}
