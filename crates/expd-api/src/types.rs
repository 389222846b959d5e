//! Typed request and reply payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// An authenticated user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

/// Reply of the `whoami` method.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WhoamiReply {
    #[serde(default)]
    pub user: Option<User>,
}

/// One row of the compatibility table served at `/--/sdk-versions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkVersionInfo {
    /// Tag of the native runtime fork required by this SDK version
    #[serde(
        rename = "exponent-react-native-tag",
        alias = "tag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub react_native_tag: Option<String>,

    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Compatibility table keyed by SDK version.
pub type SdkVersions = BTreeMap<String, SdkVersionInfo>;

/// Arguments sent along with `signManifest` (and `publish`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishArgs {
    pub username: String,
    pub local_package_name: String,
    pub package_version: String,
    pub remote_username: String,
    pub remote_package_name: String,
    pub remote_full_package_name: String,
    pub ngrok_url: String,
    pub sdk_version: String,
}

impl PublishArgs {
    /// Build publish arguments for `username` publishing `name@version`.
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        ngrok_url: impl Into<String>,
        sdk_version: impl Into<String>,
    ) -> Self {
        let username = username.into();
        let name = name.into();
        Self {
            remote_full_package_name: format!("@{}/{}", username, name),
            remote_username: username.clone(),
            remote_package_name: name.clone(),
            local_package_name: name,
            username,
            package_version: version.into(),
            ngrok_url: ngrok_url.into(),
            sdk_version: sdk_version.into(),
        }
    }
}
