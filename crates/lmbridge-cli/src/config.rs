//! JSON config file loading.
//!
//! The file is optional. Every key inside it is optional too; anything left
//! out keeps the gateway default. Unknown keys are ignored so older files
//! (with e.g. `"reload": true` under `server`) still load.
//!
//! ```json
//! {
//!   "lm_studio": { "url": "http://localhost:1234", "timeout": 300 },
//!   "server": { "host": "0.0.0.0", "port": 8000 },
//!   "gateway": { "default_model": null, "max_tokens_ceiling": 2048 }
//! }
//! ```

use std::io::ErrorKind;
use std::path::Path;

use lmbridge_backend::DEFAULT_MAX_CONCURRENT;
use lmbridge_core::GatewaySettings;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CliError;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

/// Contents of the config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub lm_studio: LmStudioSection,
    pub server: ServerSection,
    pub gateway: GatewaySection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LmStudioSection {
    pub url: Option<String>,
    /// Seconds; whole-call ceiling.
    pub timeout: Option<u64>,
    /// Seconds between stream chunks.
    pub idle_timeout: Option<u64>,
    pub health_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub default_model: Option<String>,
    pub max_tokens_ceiling: Option<u32>,
    /// Seconds between background model list refreshes.
    pub refresh_interval: Option<u64>,
    pub max_concurrent_requests: Option<usize>,
    pub default_temperature: Option<f64>,
}

impl FileConfig {
    /// Load the config file at `path`.
    ///
    /// A missing file yields defaults with a warning. A file that exists but
    /// cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(CliError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        let config = serde_json::from_str(&raw).map_err(|e| {
            CliError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Gateway settings described by the file, defaults elsewhere.
    pub fn gateway_settings(&self) -> GatewaySettings {
        let mut settings = GatewaySettings::default();

        if let Some(ref url) = self.lm_studio.url {
            settings.backend_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = self.lm_studio.timeout {
            settings.request_timeout_secs = secs;
        }
        if let Some(secs) = self.lm_studio.idle_timeout {
            settings.stream_idle_timeout_secs = secs;
        }
        if let Some(secs) = self.lm_studio.health_timeout {
            settings.health_timeout_secs = secs;
        }
        if let Some(ref model) = self.gateway.default_model {
            settings.default_model = Some(model.clone());
        }
        if let Some(ceiling) = self.gateway.max_tokens_ceiling {
            settings.max_tokens_ceiling = ceiling;
        }
        if let Some(secs) = self.gateway.refresh_interval {
            settings.model_refresh_interval_secs = secs;
        }
        if let Some(temperature) = self.gateway.default_temperature {
            settings.default_temperature = temperature;
        }

        settings
    }

    pub fn host(&self) -> String {
        self.server
            .host
            .clone()
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    pub fn port(&self) -> u16 {
        self.server.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn max_concurrent(&self) -> usize {
        self.gateway
            .max_concurrent_requests
            .unwrap_or(DEFAULT_MAX_CONCURRENT)
    }
}
