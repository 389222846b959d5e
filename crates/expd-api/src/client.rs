//! `reqwest`-backed API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::{ApiClient, ApiError, HttpMethod};

/// Production API root.
pub const DEFAULT_API_URL: &str = "https://exp.host";

/// Header carrying the session secret of a logged-in user.
const SESSION_HEADER: &str = "Exp-Session";

/// Connection settings for [`HttpApiClient`].
///
/// Keys are snake_case so they line up with `EXPD_API__*` overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Session secret of the logged-in user, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// API client speaking HTTP to the backend.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpApiClient {
    /// Create a client for the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| ApiError::Transport {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self { client, config })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn root(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// URL of a method call: `/--/api/<method>/<urlencoded JSON args>`.
    pub fn method_url(&self, method: &str, args: &Value) -> String {
        format!(
            "{}/--/api/{}/{}",
            self.root(),
            method,
            urlencoding::encode(&args.to_string())
        )
    }

    /// URL of a path call.
    pub fn path_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.root(), path)
        } else {
            format!("{}/{}", self.root(), path)
        }
    }

    async fn send(&self, url: String, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let request = match &self.config.session {
            Some(session) => request.header(SESSION_HEADER, session),
            None => request,
        };

        debug!("API request: {}", url);
        let response = request.send().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|source| ApiError::Transport { url, source })?;

        check_remote_error(body)
    }
}

/// Turn an `{ "err": ... }` reply into an [`ApiError::Remote`].
fn check_remote_error(body: Value) -> Result<Value, ApiError> {
    let Some(err) = body.get("err").filter(|e| !e.is_null()) else {
        return Ok(body);
    };

    let message = match err {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    };
    let code = body
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string);

    Err(ApiError::Remote { code, message })
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn call_method(
        &self,
        method: &str,
        args: Value,
        http_method: HttpMethod,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = self.method_url(method, &args);
        let request = match http_method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        let request = match body {
            Some(body) => request.json(&body),
            None => request,
        };

        self.send(url, request).await
    }

    async fn call_path(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.path_url(path);
        let request = self.client.get(&url);
        self.send(url, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base_url: &str) -> HttpApiClient {
        HttpApiClient::new(ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_method_url_encodes_args() {
        let client = client("https://exp.host/");
        let url = client.method_url("whoami", &json!([]));
        assert_eq!(url, "https://exp.host/--/api/whoami/%5B%5D");

        let url = client.method_url("send", &json!(["a b"]));
        assert_eq!(url, "https://exp.host/--/api/send/%5B%22a%20b%22%5D");
    }

    #[test]
    fn test_path_url_joins_slashes() {
        let client = client("https://exp.host");
        assert_eq!(
            client.path_url("/--/sdk-versions"),
            "https://exp.host/--/sdk-versions"
        );
        assert_eq!(
            client.path_url("--/sdk-versions"),
            "https://exp.host/--/sdk-versions"
        );
    }

    #[test]
    fn test_check_remote_error() {
        let ok = check_remote_error(json!({ "user": null })).unwrap();
        assert_eq!(ok, json!({ "user": null }));

        let ok = check_remote_error(json!({ "err": null, "x": 1 })).unwrap();
        assert_eq!(ok["x"], 1);

        let err = check_remote_error(json!({ "err": "nope", "code": "E1" })).unwrap_err();
        assert_eq!(err.code(), Some("E1"));
        assert_eq!(err.to_string(), "API error: nope");
    }

    #[test]
    fn test_config_defaults() {
        let config: ApiConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.timeout_secs, 30);
    }
}
