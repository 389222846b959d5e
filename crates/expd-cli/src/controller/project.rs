//! Project metadata read from `package.json`.

use crate::error::ManifestError;
use expd_api::PublishArgs;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Sentinel SDK version for projects tracking unreleased runtime code.
pub const UNVERSIONED: &str = "UNVERSIONED";

/// Entry point used when package.json names none.
pub const DEFAULT_ENTRY_POINT: &str = "index.js";

/// The parts of `package.json` the controller reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub main: Option<String>,

    #[serde(default)]
    pub dependencies: Map<String, Value>,

    /// The project's declared manifest section
    #[serde(default)]
    pub exp: Option<Map<String, Value>>,
}

impl PackageJson {
    /// Read `<root>/package.json`.
    pub async fn read(project_root: &Path) -> Result<Self, ManifestError> {
        let path = project_root.join("package.json");
        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ManifestError::ProjectUnreadable {
                    path: path.clone(),
                    message: e.to_string(),
                })?;

        serde_json::from_str(&content).map_err(|e| ManifestError::ProjectUnreadable {
            path,
            message: e.to_string(),
        })
    }

    /// `exp.entryPoint`, else `main`, else `index.js`.
    pub fn entry_point(&self) -> String {
        self.exp_str("entryPoint")
            .or(self.main.as_deref())
            .unwrap_or(DEFAULT_ENTRY_POINT)
            .to_string()
    }

    /// Version spec of the `react-native` dependency.
    pub fn react_native_dependency(&self) -> Option<&str> {
        self.dependencies
            .get("react-native")
            .and_then(Value::as_str)
            .filter(|spec| !spec.is_empty())
    }

    /// `exp.sdkVersion`, or the older `exp.abiVersion`.
    pub fn sdk_version(&self) -> Option<&str> {
        self.exp_str("sdkVersion")
            .or_else(|| self.exp_str("abiVersion"))
            .filter(|v| !v.is_empty())
    }

    /// A copy of the manifest section, empty when absent.
    pub fn manifest(&self) -> Map<String, Value> {
        self.exp.clone().unwrap_or_default()
    }

    /// Arguments of the signing call for `username`.
    pub fn publish_args(
        &self,
        project_root: &Path,
        username: &str,
        ngrok_url: Option<&str>,
    ) -> Result<PublishArgs, ManifestError> {
        let sdk_version = self.sdk_version().ok_or(ManifestError::MissingSdkVersion)?;
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| project_short_name(project_root));

        Ok(PublishArgs::new(
            username,
            name,
            self.version.clone().unwrap_or_default(),
            ngrok_url.unwrap_or_default(),
            sdk_version,
        ))
    }

    fn exp_str(&self, key: &str) -> Option<&str> {
        self.exp.as_ref()?.get(key)?.as_str()
    }
}

/// Last path component of the project root.
pub fn project_short_name(project_root: &Path) -> String {
    project_root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
