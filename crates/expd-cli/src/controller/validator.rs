//! Advisory compatibility checks against the SDK version table.
//!
//! Validation never fails: the first problem found becomes a `stderr`
//! notification and nothing else happens.

use crate::controller::events::{EventChannel, Notification};
use crate::controller::project::{PackageJson, UNVERSIONED};
use expd_api::ApiClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Marker every Exponent fork dependency spec contains.
pub const FORK_MARKER: &str = "exponentjs/react-native#";

const HELP_URL: &str = "https://exponentjs.com/help";

/// How serious a compatibility issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// The first problem found by [`Validator::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityIssue {
    pub severity: Severity,
    pub message: String,
}

impl CompatibilityIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Checks a project's runtime dependency and SDK version.
///
/// Safe to run concurrently with itself and with manifest serving; it
/// only reads.
pub struct Validator {
    api: Arc<dyn ApiClient>,
    events: EventChannel,
}

impl Validator {
    pub fn new(api: Arc<dyn ApiClient>, events: EventChannel) -> Self {
        Self { api, events }
    }

    /// Run every check, stopping at the first issue.
    pub async fn check(&self, project_root: &Path) -> Option<CompatibilityIssue> {
        let pkg = match PackageJson::read(project_root).await {
            Ok(pkg) => pkg,
            Err(e) => {
                tracing::debug!("{}", e);
                return Some(CompatibilityIssue::error("Error: Can't find package.json"));
            }
        };

        let Some(react_native) = pkg.react_native_dependency() else {
            return Some(CompatibilityIssue::error(
                "Error: Can't find react-native in package.json dependencies",
            ));
        };

        if !react_native.contains(FORK_MARKER) {
            return Some(CompatibilityIssue::error(format!(
                "Error: Must use Exponent fork of react-native. See {}",
                HELP_URL
            )));
        }

        let Some(sdk_version) = pkg.sdk_version() else {
            return Some(CompatibilityIssue::error(format!(
                "Error: Can't find key exp.sdkVersion in package.json. See {}",
                HELP_URL
            )));
        };

        if sdk_version == UNVERSIONED {
            return Some(CompatibilityIssue::warning(
                "Warning: Using unversioned Exponent SDK. Do not publish until you set sdkVersion in package.json",
            ));
        }

        let react_native_tag = react_native
            .rsplit_once('#')
            .map_or(react_native, |(_, tag)| tag);

        let versions = match self.api.sdk_versions().await {
            Ok(versions) if !versions.is_empty() => versions,
            Ok(_) => {
                tracing::warn!("SDK version table is empty");
                return Some(CompatibilityIssue::error("Error: Couldn't connect to server"));
            }
            Err(e) => {
                tracing::warn!("Failed to fetch SDK versions: {}", e);
                return Some(CompatibilityIssue::error("Error: Couldn't connect to server"));
            }
        };

        let Some(info) = versions.get(sdk_version) else {
            let valid = versions.keys().cloned().collect::<Vec<_>>().join(", ");
            return Some(CompatibilityIssue::error(format!(
                "Error: Invalid sdkVersion. Valid options are {}",
                valid
            )));
        };

        let required_tag = info.react_native_tag.as_deref().unwrap_or_default();
        if required_tag != react_native_tag {
            return Some(CompatibilityIssue::error(format!(
                "Error: Invalid version of react-native for sdkVersion {}. Use github:exponentjs/react-native#{}",
                sdk_version, required_tag
            )));
        }

        None
    }

    /// Run the checks and report the first issue as a `stderr` notification.
    pub async fn validate(&self, project_root: &Path) {
        if let Some(issue) = self.check(project_root).await {
            self.events.emit(Notification::Stderr(issue.message));
        }
    }

    /// Run [`Validator::validate`] in the background.
    pub fn spawn(self: &Arc<Self>, project_root: PathBuf) -> JoinHandle<()> {
        let validator = Arc::clone(self);
        tokio::spawn(async move { validator.validate(&project_root).await })
    }
}
