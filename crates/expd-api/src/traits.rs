//! Client trait definition

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::types::{PublishArgs, SdkVersions, User, WhoamiReply};
use crate::ApiError;

/// HTTP verb used for a method call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A client for the remote API.
///
/// Implementors only provide the two primitives; the typed calls are
/// default methods built on them, so test doubles stay small.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use expd_api::{ApiClient, ApiError, HttpMethod};
/// use serde_json::{json, Value};
///
/// struct Offline;
///
/// #[async_trait]
/// impl ApiClient for Offline {
///     async fn call_method(
///         &self,
///         _method: &str,
///         _args: Value,
///         _http_method: HttpMethod,
///         _body: Option<Value>,
///     ) -> Result<Value, ApiError> {
///         Ok(json!({}))
///     }
///
///     async fn call_path(&self, _path: &str) -> Result<Value, ApiError> {
///         Err(ApiError::malformed("offline"))
///     }
/// }
/// ```
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Invoke a named API method with positional JSON arguments.
    async fn call_method(
        &self,
        method: &str,
        args: Value,
        http_method: HttpMethod,
        body: Option<Value>,
    ) -> Result<Value, ApiError>;

    /// Fetch a JSON document by path relative to the API root.
    async fn call_path(&self, path: &str) -> Result<Value, ApiError>;

    /// Look up the user the client is authenticated as.
    ///
    /// Returns `Ok(None)` for anonymous sessions.
    async fn whoami(&self) -> Result<Option<User>, ApiError> {
        let reply = self
            .call_method("whoami", json!([]), HttpMethod::Get, None)
            .await?;
        if reply.is_null() {
            return Ok(None);
        }
        let reply: WhoamiReply = serde_json::from_value(reply)
            .map_err(|e| ApiError::malformed(format!("whoami: {}", e)))?;
        Ok(reply.user.filter(|user| !user.username.is_empty()))
    }

    /// Fetch the SDK compatibility table.
    async fn sdk_versions(&self) -> Result<SdkVersions, ApiError> {
        let reply = self.call_path("/--/sdk-versions").await?;
        serde_json::from_value(reply)
            .map_err(|e| ApiError::malformed(format!("sdk-versions: {}", e)))
    }

    /// Ask the server to sign a manifest, returning the signed string.
    async fn sign_manifest(&self, args: &PublishArgs, manifest: &Value) -> Result<String, ApiError> {
        let reply = self
            .call_method(
                "signManifest",
                json!([args]),
                HttpMethod::Post,
                Some(manifest.clone()),
            )
            .await?;

        match reply.get("response") {
            Some(Value::String(signed)) => Ok(signed.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(ApiError::malformed("signManifest reply has no `response` field")),
        }
    }
}
