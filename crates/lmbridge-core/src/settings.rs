//! Gateway settings, validation, and the live settings store.
//!
//! `GatewaySettings` holds every tunable the core consumes. The store
//! publishes settings as immutable snapshots, so a `POST /config` swaps in
//! a new value without disturbing requests already running with the old one.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Deserializer, Serialize};

/// Default LM Studio server address.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:1234";

/// Default ceiling applied to client `max_tokens`.
pub const DEFAULT_MAX_TOKENS_CEILING: u32 = 2048;

/// Tunable gateway parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Base URL of the backend, without the `/v1` suffix.
    pub backend_url: String,

    /// Ceiling for a whole non-streaming call, and for receiving stream headers.
    pub request_timeout_secs: u64,

    /// Longest gap between two stream chunks before the stream is failed.
    pub stream_idle_timeout_secs: u64,

    /// Bound for health probes. Kept short so probes never wait behind generation.
    pub health_timeout_secs: u64,

    /// Bound for model list polls made by the registry.
    pub models_timeout_secs: u64,

    /// How often the registry re-polls the backend in the background.
    pub model_refresh_interval_secs: u64,

    /// Model preferred when the client's name matches nothing loaded.
    pub default_model: Option<String>,

    /// Upper bound for `max_tokens` forwarded to the backend.
    pub max_tokens_ceiling: u32,

    /// Temperature used when the client sends none.
    pub default_temperature: f64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: 300,
            stream_idle_timeout_secs: 60,
            health_timeout_secs: 5,
            models_timeout_secs: 10,
            model_refresh_interval_secs: 30,
            default_model: None,
            max_tokens_ceiling: DEFAULT_MAX_TOKENS_CEILING,
            default_temperature: 0.7,
        }
    }
}

impl GatewaySettings {
    /// OpenAI-compatible API root of the backend (`<backend_url>/v1`).
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("{}/v1", self.backend_url.trim_end_matches('/'))
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }

    pub const fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub const fn models_timeout(&self) -> Duration {
        Duration::from_secs(self.models_timeout_secs)
    }

    pub const fn model_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.model_refresh_interval_secs)
    }

    /// Merge a partial update, only touching fields that are present.
    pub fn merge(&mut self, update: &SettingsUpdate) {
        if let Some(ref url) = update.backend_url {
            self.backend_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = update.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = update.stream_idle_timeout_secs {
            self.stream_idle_timeout_secs = secs;
        }
        if let Some(secs) = update.health_timeout_secs {
            self.health_timeout_secs = secs;
        }
        if let Some(secs) = update.models_timeout_secs {
            self.models_timeout_secs = secs;
        }
        if let Some(secs) = update.model_refresh_interval_secs {
            self.model_refresh_interval_secs = secs;
        }
        if let Some(ref model) = update.default_model {
            self.default_model.clone_from(model);
        }
        if let Some(ceiling) = update.max_tokens_ceiling {
            self.max_tokens_ceiling = ceiling;
        }
        if let Some(temperature) = update.default_temperature {
            self.default_temperature = temperature;
        }
    }
}

/// Partial settings update.
///
/// `None` leaves a field unchanged. `default_model` is nullable:
/// `Some(None)` (JSON `null`) clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, alias = "lm_studio_url")]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub stream_idle_timeout_secs: Option<u64>,
    #[serde(default)]
    pub health_timeout_secs: Option<u64>,
    #[serde(default)]
    pub models_timeout_secs: Option<u64>,
    #[serde(default)]
    pub model_refresh_interval_secs: Option<u64>,
    #[serde(default, deserialize_with = "double_option")]
    pub default_model: Option<Option<String>>,
    #[serde(default)]
    pub max_tokens_ceiling: Option<u32>,
    #[serde(default)]
    pub default_temperature: Option<f64>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("Backend URL must start with http:// or https://, got '{0}'")]
    InvalidBackendUrl(String),

    #[error("{0} must be at least 1 second")]
    ZeroTimeout(&'static str),

    #[error("max_tokens_ceiling must be at least 1")]
    ZeroTokenCeiling,

    #[error("default_temperature must be a non-negative number, got {0}")]
    InvalidTemperature(f64),

    #[error("default_model cannot be empty")]
    EmptyDefaultModel,
}

/// Validate settings values.
pub fn validate_settings(settings: &GatewaySettings) -> Result<(), SettingsError> {
    let url = settings.backend_url.trim();
    let has_scheme = url.starts_with("http://") || url.starts_with("https://");
    if !has_scheme || url.ends_with("://") {
        return Err(SettingsError::InvalidBackendUrl(settings.backend_url.clone()));
    }

    let timeouts = [
        ("request_timeout_secs", settings.request_timeout_secs),
        ("stream_idle_timeout_secs", settings.stream_idle_timeout_secs),
        ("health_timeout_secs", settings.health_timeout_secs),
        ("models_timeout_secs", settings.models_timeout_secs),
        (
            "model_refresh_interval_secs",
            settings.model_refresh_interval_secs,
        ),
    ];
    if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
        return Err(SettingsError::ZeroTimeout(name));
    }

    if settings.max_tokens_ceiling == 0 {
        return Err(SettingsError::ZeroTokenCeiling);
    }

    if !settings.default_temperature.is_finite() || settings.default_temperature < 0.0 {
        return Err(SettingsError::InvalidTemperature(settings.default_temperature));
    }

    if settings
        .default_model
        .as_ref()
        .is_some_and(|m| m.trim().is_empty())
    {
        return Err(SettingsError::EmptyDefaultModel);
    }

    Ok(())
}

/// Live, atomically swapped gateway settings.
///
/// Readers take a cheap `Arc` snapshot per call and never block; writers
/// validate a merged copy and publish it with compare-and-swap.
#[derive(Debug)]
pub struct SettingsStore {
    current: ArcSwap<GatewaySettings>,
}

impl SettingsStore {
    /// Create a store from validated settings.
    pub fn new(settings: GatewaySettings) -> Result<Self, SettingsError> {
        validate_settings(&settings)?;
        Ok(Self {
            current: ArcSwap::from_pointee(settings),
        })
    }

    /// Create a store holding the default settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            current: ArcSwap::from_pointee(GatewaySettings::default()),
        }
    }

    /// Current settings snapshot.
    pub fn snapshot(&self) -> Arc<GatewaySettings> {
        self.current.load_full()
    }

    /// Apply a partial update. Invalid results leave the store unchanged.
    pub fn apply(&self, update: &SettingsUpdate) -> Result<Arc<GatewaySettings>, SettingsError> {
        loop {
            let current = self.current.load_full();
            let mut next = (*current).clone();
            next.merge(update);
            validate_settings(&next)?;

            let next = Arc::new(next);
            let previous = self.current.compare_and_swap(&current, Arc::clone(&next));
            if Arc::ptr_eq(&previous, &current) {
                return Ok(next);
            }
        }
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}
