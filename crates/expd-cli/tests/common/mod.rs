//! Stand-ins shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Bytes,
    http::{Method, Uri},
    Router,
};
use expd_api::{ApiClient, ApiError, HttpMethod};
use expd_cli::controller::tunnel::TunnelRequest;
use expd_cli::controller::TunnelProvider;
use expd_cli::error::TunnelError;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Remote API double.
#[derive(Default)]
pub struct FakeApi {
    pub username: Option<String>,
    /// Reply to `signManifest`; `None` makes signing fail
    pub signature: Option<String>,
    pub sdk_versions: Value,
    pub sign_calls: AtomicUsize,
}

impl FakeApi {
    pub fn logged_in(username: &str, signature: Option<&str>) -> Self {
        Self {
            username: Some(username.to_string()),
            signature: signature.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn call_method(
        &self,
        method: &str,
        _args: Value,
        _http_method: HttpMethod,
        _body: Option<Value>,
    ) -> Result<Value, ApiError> {
        match method {
            "whoami" => Ok(match &self.username {
                Some(username) => json!({ "user": { "username": username } }),
                None => json!({ "user": null }),
            }),
            "signManifest" => {
                self.sign_calls.fetch_add(1, Ordering::SeqCst);
                match &self.signature {
                    Some(signature) => Ok(json!({ "response": signature })),
                    None => Err(ApiError::Remote {
                        code: Some("SIGNING_FAILED".to_string()),
                        message: "signing service unavailable".to_string(),
                    }),
                }
            }
            other => Err(ApiError::Remote {
                code: None,
                message: format!("unexpected method {}", other),
            }),
        }
    }

    async fn call_path(&self, _path: &str) -> Result<Value, ApiError> {
        Ok(self.sdk_versions.clone())
    }
}

/// Tunnel double that records requests.
#[derive(Default)]
pub struct FakeTunnel {
    pub fail: bool,
    pub requests: Mutex<Vec<TunnelRequest>>,
    pub disconnects: Mutex<Vec<String>>,
}

#[async_trait]
impl TunnelProvider for FakeTunnel {
    async fn connect(&self, request: &TunnelRequest) -> Result<String, TunnelError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(TunnelError::Connect {
                hostname: request.hostname.clone(),
                message: "agent offline".to_string(),
            });
        }
        Ok(format!("https://{}", request.hostname))
    }

    async fn disconnect(&self, name: &str, _public_url: &str) -> Result<(), TunnelError> {
        self.disconnects.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Serve `app` on an ephemeral port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Bundler stand-in echoing `<METHOD> <path?query> <body>` for every request.
pub async fn spawn_bundler() -> SocketAddr {
    let app = Router::new().fallback(|method: Method, uri: Uri, body: Bytes| async move {
        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default();
        (
            [("x-bundler", "yes")],
            format!("{} {} {}", method, target, String::from_utf8_lossy(&body)),
        )
    });
    serve(app).await
}

/// Write a project with the given `package.json`.
pub fn write_project(root: &Path, package_json: Value) {
    std::fs::write(
        root.join("package.json"),
        serde_json::to_string_pretty(&package_json).unwrap(),
    )
    .unwrap();
}

/// A minimal project using the Exponent fork at SDK 5.0.0.
pub fn sample_package() -> Value {
    json!({
        "name": "my-app",
        "version": "1.2.0",
        "main": "main.js",
        "dependencies": {
            "react-native": "github:exponentjs/react-native#sdk-5.0.0"
        },
        "exp": {
            "name": "My App",
            "sdkVersion": "5.0.0"
        }
    })
}

/// One free local port.
pub fn free_port(lower_bound: u16) -> u16 {
    expd_cli::controller::find_free_ports(1, lower_bound).unwrap()[0]
}
