use crate::config::ControllerConfig;
use crate::error::{ConfigError, Result};

impl ControllerConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if let (Some(port), Some(packager_port)) = (self.port, self.packager_port) {
            if port == packager_port {
                return Err(ConfigError::InvalidValue {
                    field: "packager_port".to_string(),
                    value: packager_port.to_string(),
                    hint: "The packager needs its own port; pick a different one than --port"
                        .to_string(),
                }
                .into());
            }
        }

        if self.stop_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stop_timeout_ms".to_string(),
                value: "0".to_string(),
                hint: "Use a positive number of milliseconds".to_string(),
            }
            .into());
        }

        if self.tunnel.domain.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "tunnel.domain".to_string(),
                hint: "Set the domain tunnels are created under, e.g. exp.direct".to_string(),
            }
            .into());
        }

        let base_url = &self.api.base_url;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                value: base_url.clone(),
                hint: "Must be an http:// or https:// URL".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
