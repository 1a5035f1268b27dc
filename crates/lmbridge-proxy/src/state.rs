//! Shared application state.

use std::sync::Arc;

use lmbridge_core::{BackendPort, HealthMonitor, ModelRegistry, SettingsStore, StreamingRelay};

/// Shared application state for the gateway router.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<StreamingRelay>,
    pub registry: Arc<ModelRegistry>,
    pub health: Arc<HealthMonitor>,
    pub settings: Arc<SettingsStore>,
}

impl AppState {
    /// Wire the core services around one backend.
    pub fn new(backend: Arc<dyn BackendPort>, settings: Arc<SettingsStore>) -> Self {
        let registry = Arc::new(ModelRegistry::new(
            Arc::clone(&backend),
            Arc::clone(&settings),
        ));
        let relay = Arc::new(StreamingRelay::new(
            Arc::clone(&backend),
            Arc::clone(&registry),
            Arc::clone(&settings),
        ));
        let health = Arc::new(HealthMonitor::new(backend, Arc::clone(&settings)));

        Self {
            relay,
            registry,
            health,
            settings,
        }
    }
}
