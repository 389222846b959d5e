//! Manifest assembly and signing.

use crate::config::ProjectSettings;
use crate::controller::cache::ManifestCache;
use crate::controller::ports::PortAssignment;
use crate::controller::project::PackageJson;
use crate::controller::tunnel::TunnelManager;
use crate::controller::urls;
use crate::controller::validator::Validator;
use crate::error::ManifestError;
use expd_api::{ApiClient, User};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything the HTTP surface needs, built by the controller per server
/// start and injected as router state.
pub struct ManifestContext {
    pub project_root: PathBuf,
    pub ports: PortAssignment,
    pub settings: ProjectSettings,
    /// Module the bundler serves, e.g. `index` for `index.js`
    pub main_module: String,
    pub api: Arc<dyn ApiClient>,
    pub tunnel: Arc<TunnelManager>,
    pub user: Arc<RwLock<Option<User>>>,
    pub cache: Arc<ManifestCache>,
    pub validator: Arc<Validator>,
    /// Client used to forward requests to the bundler
    pub client: reqwest::Client,
}

impl ManifestContext {
    /// Base URL of the bundler.
    pub fn packager_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.ports.packager_port)
    }

    /// Build the unsigned manifest from `package.json`'s `exp` section.
    pub async fn manifest(&self) -> Result<(Value, PackageJson), ManifestError> {
        let pkg = PackageJson::read(&self.project_root).await?;
        let mut manifest = pkg.manifest();

        let query = urls::bundle_query_params(&self.settings);
        let public_url = self.tunnel.public_url();
        let host = urls::server_host(
            self.settings.host_type,
            self.ports.port,
            public_url.as_deref(),
        );

        manifest.insert("bundlePath".into(), format!("bundle?{}", query).into());
        manifest.insert("xde".into(), true.into());
        manifest.insert(
            "bundleUrl".into(),
            format!("{}?{}", urls::bundle_url(&host), query).into(),
        );
        manifest.insert(
            "debuggerHost".into(),
            urls::debugger_host(self.ports.packager_port).into(),
        );
        manifest.insert("mainModuleName".into(), self.main_module.clone().into());

        Ok((Value::Object(manifest), pkg))
    }

    /// Serve a manifest request.
    ///
    /// Kicks off compatibility validation without waiting for it. Signs
    /// only when `accept_signature` is set and a user is logged in; signing
    /// failures are returned, never replaced by the unsigned manifest.
    pub async fn respond(&self, accept_signature: bool) -> Result<String, ManifestError> {
        self.validator.spawn(self.project_root.clone());

        let (manifest, pkg) = self.manifest().await?;
        let raw = manifest.to_string();

        let user = self.user.read().clone();
        let Some(user) = user.filter(|_| accept_signature) else {
            return Ok(raw);
        };

        let (pkg, manifest, user) = (&pkg, &manifest, &user);
        self.cache
            .get_signed(&raw, move || async move {
                let public_url = self.tunnel.public_url();
                let args =
                    pkg.publish_args(&self.project_root, &user.username, public_url.as_deref())?;
                self.api
                    .sign_manifest(&args, manifest)
                    .await
                    .map_err(ManifestError::Signing)
            })
            .await
    }
}
