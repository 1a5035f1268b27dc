//! CLI bootstrap - the composition root.
//!
//! The only place where the LM Studio client, the settings store and the
//! core services are wired together. Command handlers receive the composed
//! `CliContext`.

use std::sync::Arc;

use anyhow::{Context, Result};
use lmbridge_backend::{LmStudioClient, LmStudioClientConfig};
use lmbridge_core::{GatewaySettings, SettingsStore};
use lmbridge_proxy::AppState;

use crate::config::FileConfig;
use crate::error::CliError;

/// Bootstrap configuration: the config file merged with CLI overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub settings: GatewaySettings,
    pub host: String,
    pub port: u16,
    /// Bound on concurrent backend calls. Fixed for the process lifetime.
    pub max_concurrent: usize,
}

impl CliConfig {
    pub fn from_file(file: &FileConfig) -> Self {
        Self {
            settings: file.gateway_settings(),
            host: file.host(),
            port: file.port(),
            max_concurrent: file.max_concurrent(),
        }
    }

    /// Apply command-line overrides on top of the file values.
    #[must_use]
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        backend_url: Option<String>,
    ) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(url) = backend_url {
            self.settings.backend_url = url.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub config: CliConfig,
    pub settings: Arc<SettingsStore>,
    pub state: AppState,
}

impl CliContext {
    /// Live backend URL.
    pub fn backend_url(&self) -> String {
        self.settings.snapshot().backend_url.clone()
    }
}

/// Build the CLI context.
///
/// Invalid settings fail with [`CliError::Config`] so the process exits
/// with `EX_CONFIG`.
pub fn bootstrap(config: CliConfig) -> Result<CliContext> {
    let settings = SettingsStore::new(config.settings.clone())
        .map_err(|e| CliError::Config(format!("invalid gateway settings: {e}")))?;
    let settings = Arc::new(settings);

    let client_config = LmStudioClientConfig::new().with_max_concurrent(config.max_concurrent);
    let client = LmStudioClient::new(Arc::clone(&settings), &client_config)
        .context("Failed to build LM Studio client")?;

    let state = AppState::new(Arc::new(client), Arc::clone(&settings));

    Ok(CliContext {
        config,
        settings,
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win_over_file() {
        let config = CliConfig::from_file(&FileConfig::default()).with_overrides(
            Some("127.0.0.1".into()),
            Some(9001),
            Some("http://10.0.0.5:1234/".into()),
        );

        assert_eq!(config.bind_addr(), "127.0.0.1:9001");
        assert_eq!(config.settings.backend_url, "http://10.0.0.5:1234");
    }

    #[test]
    fn test_no_overrides_keep_file_values() {
        let config = CliConfig::from_file(&FileConfig::default()).with_overrides(None, None, None);
        assert_eq!(config, CliConfig::from_file(&FileConfig::default()));
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_bootstrap_rejects_invalid_backend_url() {
        let config = CliConfig::from_file(&FileConfig::default()).with_overrides(
            None,
            None,
            Some("localhost:1234".into()),
        );
        let Err(err) = bootstrap(config) else {
            panic!("expected invalid settings to fail");
        };
        let cli_err = err.downcast_ref::<CliError>().unwrap();
        assert!(matches!(cli_err, CliError::Config(_)));
        assert_eq!(cli_err.exit_code(), 78);
    }

    #[test]
    fn test_bootstrap_rejects_zero_timeout_from_file() {
        let mut file = FileConfig::default();
        file.lm_studio.timeout = Some(0);

        let Err(err) = bootstrap(CliConfig::from_file(&file)) else {
            panic!("expected zero timeout to fail");
        };
        assert_eq!(err.downcast_ref::<CliError>().map(CliError::exit_code), Some(78));
    }

    #[tokio::test]
    async fn test_bootstrap_wires_live_settings() {
        let ctx = bootstrap(CliConfig::from_file(&FileConfig::default())).unwrap();
        assert_eq!(ctx.backend_url(), "http://localhost:1234");
        assert!(ctx.state.registry.snapshot().refreshed_at().is_none());
    }
}
