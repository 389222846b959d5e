use crate::config::{
    ConfigOverrides, ControllerConfig, ProjectSettings, CONFIG_FILE_NAME, ENV_PREFIX,
    PROJECT_SETTINGS_PATH,
};
use crate::error::{CliError, ConfigError, Result, ResultExt};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use std::path::{Path, PathBuf};

impl ControllerConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI overrides > environment variables > expd.json > defaults
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let project_root = resolve_project_root(&overrides.project_root)?;

        let mut figment = Figment::new().merge(Serialized::defaults(Self::new(&project_root)));

        let config_file = project_root.join(CONFIG_FILE_NAME);
        if config_file.is_file() {
            tracing::debug!("Loading {}", config_file.display());
            figment = figment.merge(Json::file(&config_file));
        }

        // EXPD_STOP_TIMEOUT_MS, EXPD_TUNNEL__DOMAIN, EXPD_API__BASE_URL, ...
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment = figment.merge(Serialized::default("project_root", &project_root));
        if let Some(port) = overrides.port {
            figment = figment.merge(Serialized::default("port", port));
        }
        if let Some(port) = overrides.packager_port {
            figment = figment.merge(Serialized::default("packager_port", port));
        }
        if overrides.reset_cache {
            figment = figment.merge(Serialized::default("reset_cache", true));
        }
        if let Some(url) = &overrides.api_url {
            figment = figment.merge(Serialized::default("api.base_url", url));
        }
        if let Some(session) = &overrides.session {
            figment = figment.merge(Serialized::default("api.session", session));
        }

        let mut config: Self = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            value: e.to_string(),
            hint: format!("Check {} syntax and EXPD_* variables", CONFIG_FILE_NAME),
        })?;

        config.settings = ProjectSettings::load(&project_root)?;
        if let Some(host_type) = overrides.host_type {
            config.settings.host_type = host_type;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ProjectSettings {
    /// Read `<root>/.exponent/settings.json`, falling back to defaults when
    /// the file does not exist.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(PROJECT_SETTINGS_PATH);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No project settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e).into()),
        };

        serde_json::from_str(&content)
            .map_err(ConfigError::InvalidJson)
            .with_hint(format!("Fix or delete {}", path.display()))
    }
}

fn resolve_project_root(root: &Path) -> Result<PathBuf> {
    let root = std::fs::canonicalize(root).with_path(root)?;
    if !root.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "{} is not a directory; the project root must be a directory",
            root.display()
        )));
    }
    Ok(root)
}
