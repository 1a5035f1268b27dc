//! Model registry - process-wide cache of the backend's models.
//!
//! The registry holds an immutable [`ModelSnapshot`] behind an atomic
//! pointer. `refresh` builds a new snapshot and swaps it in; `resolve`
//! reads whatever snapshot is current and never waits on a refresh that is
//! in flight elsewhere.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{ModelDescriptor, ModelSnapshot};
use crate::error::GatewayError;
use crate::ports::BackendPort;
use crate::settings::SettingsStore;

/// Cache of the backend's model list with forgiving name resolution.
pub struct ModelRegistry {
    backend: Arc<dyn BackendPort>,
    settings: Arc<SettingsStore>,
    snapshot: ArcSwap<ModelSnapshot>,
}

impl ModelRegistry {
    /// Create a registry with an empty snapshot. Nothing is polled until
    /// the first `refresh` or `resolve`.
    pub fn new(backend: Arc<dyn BackendPort>, settings: Arc<SettingsStore>) -> Self {
        Self {
            backend,
            settings,
            snapshot: ArcSwap::from_pointee(ModelSnapshot::empty()),
        }
    }

    /// Current snapshot. Cheap; never blocks.
    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.snapshot.load_full()
    }

    /// Poll the backend and replace the snapshot.
    ///
    /// On failure the previous snapshot stays in place and
    /// `BackendUnreachable` is returned; callers decide whether stale data
    /// is good enough.
    pub async fn refresh(&self) -> Result<Arc<ModelSnapshot>, GatewayError> {
        let timeout = self.settings.snapshot().models_timeout();

        match self.backend.list_models(timeout).await {
            Ok(models) => {
                let next = Arc::new(ModelSnapshot::new(models));
                debug!(
                    models = next.models().len(),
                    loaded = next.loaded_count(),
                    "Model snapshot refreshed"
                );
                self.snapshot.store(Arc::clone(&next));
                Ok(next)
            }
            Err(e) => {
                warn!(error = %e, "Model refresh failed, keeping previous snapshot");
                // Any failed poll, an error status included, means the backend is unavailable.
                Err(GatewayError::BackendUnreachable {
                    reason: e.to_string(),
                    timed_out: e.is_timeout(),
                })
            }
        }
    }

    /// Resolve a client-requested model name to a loaded backend model.
    ///
    /// Order: the requested name, then the configured default model, then
    /// the first loaded model. When the current snapshot has nothing loaded,
    /// one refresh is attempted first.
    ///
    /// # Errors
    ///
    /// `NoModelLoaded` if nothing is loaded after the refresh attempt,
    /// whether the backend answered with an empty list or could not be
    /// polled at all.
    pub async fn resolve(&self, requested: Option<&str>) -> Result<ModelDescriptor, GatewayError> {
        let mut snapshot = self.snapshot();

        if snapshot.first_loaded().is_none() {
            if let Ok(fresh) = self.refresh().await {
                snapshot = fresh;
            }
        }

        let default_model = self.settings.snapshot().default_model.clone();
        resolve_in(&snapshot, requested, default_model.as_deref())
            .cloned()
            .ok_or(GatewayError::NoModelLoaded)
    }

    /// Refresh on a fixed schedule until `cancel` fires.
    ///
    /// The interval is re-read from settings before every sleep, so
    /// `POST /config` changes it without restarting the task. Failed ticks
    /// keep the stale snapshot.
    pub fn spawn_refresh_loop(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Model refresh loop started");
            loop {
                let interval = self.settings.snapshot().model_refresh_interval();
                tokio::select! {
                    () = tokio::time::sleep(interval) => {
                        let _ = self.refresh().await;
                    }
                    () = cancel.cancelled() => {
                        debug!("Model refresh loop cancelled");
                        break;
                    }
                }
            }
        })
    }
}

/// Pure resolution rule over one snapshot.
///
/// Returns `None` only when the snapshot has no loaded model.
pub fn resolve_in<'a>(
    snapshot: &'a ModelSnapshot,
    requested: Option<&str>,
    default_model: Option<&str>,
) -> Option<&'a ModelDescriptor> {
    let requested = requested.map(str::trim).filter(|name| !name.is_empty());

    if let Some(model) = requested.and_then(|name| snapshot.find_loaded(name)) {
        return Some(model);
    }

    if let Some(model) = default_model.and_then(|name| snapshot.find_loaded(name)) {
        if let Some(name) = requested {
            debug!(requested = %name, model = %model.id, "Requested model not loaded, using default model");
        }
        return Some(model);
    }

    let fallback = snapshot.first_loaded()?;
    if let Some(name) = requested {
        debug!(requested = %name, model = %fallback.id, "Requested model not loaded, using first loaded model");
    }
    Some(fallback)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockall::Sequence;

    use super::*;
    use crate::ports::{BackendError, MockBackendPort};
    use crate::settings::GatewaySettings;

    fn loaded_models() -> Vec<ModelDescriptor> {
        vec![
            ModelDescriptor::unloaded("llama-3.2-3b-instruct"),
            ModelDescriptor::new("qwen/qwen2.5-coder-14b"),
            ModelDescriptor::new("mistral-nemo-instruct-2407"),
        ]
    }

    fn registry(backend: MockBackendPort, settings: GatewaySettings) -> ModelRegistry {
        ModelRegistry::new(
            Arc::new(backend),
            Arc::new(SettingsStore::new(settings).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_refresh_uses_models_timeout() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_list_models()
            .withf(|timeout| *timeout == Duration::from_secs(10))
            .times(1)
            .returning(|_| Ok(loaded_models()));

        let registry = registry(backend, GatewaySettings::default());
        let snapshot = registry.refresh().await.unwrap();
        assert_eq!(snapshot.models().len(), 3);
        assert!(snapshot.refreshed_at().is_some());
    }

    #[tokio::test]
    async fn test_refresh_error_status_is_unreachable() {
        let mut backend = MockBackendPort::new();
        let mut seq = Sequence::new();
        backend
            .expect_list_models()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(loaded_models()));
        backend
            .expect_list_models()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(BackendError::Status {
                    status: 500,
                    message: "internal error".into(),
                })
            });

        let registry = registry(backend, GatewaySettings::default());
        let before = registry.refresh().await.unwrap();

        let err = registry.refresh().await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::BackendUnreachable { timed_out: false, ref reason } if reason.contains("500")
        ));
        assert!(Arc::ptr_eq(&before, &registry.snapshot()));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let mut backend = MockBackendPort::new();
        let mut seq = Sequence::new();
        backend
            .expect_list_models()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(loaded_models()));
        backend
            .expect_list_models()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BackendError::Timeout(Duration::from_secs(10))));

        let registry = registry(backend, GatewaySettings::default());
        let before = registry.refresh().await.unwrap();

        let err = registry.refresh().await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::BackendUnreachable { timed_out: true, .. }
        ));

        let after = registry.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.loaded_count(), 2);
    }

    #[tokio::test]
    async fn test_resolve_matching_name() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_list_models()
            .times(1)
            .returning(|_| Ok(loaded_models()));

        let registry = registry(backend, GatewaySettings::default());
        let model = registry
            .resolve(Some("mistral-nemo-instruct-2407"))
            .await
            .unwrap();
        assert_eq!(model.id, "mistral-nemo-instruct-2407");

        // Snapshot is warm now; no second poll.
        let model = registry.resolve(Some("MISTRAL-NEMO-INSTRUCT-2407")).await.unwrap();
        assert_eq!(model.id, "mistral-nemo-instruct-2407");
    }

    #[tokio::test]
    async fn test_resolve_unmatched_or_omitted_falls_back_to_first_loaded() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_list_models()
            .times(1)
            .returning(|_| Ok(loaded_models()));

        let registry = registry(backend, GatewaySettings::default());
        let unmatched = registry.resolve(Some("gpt-4")).await.unwrap();
        assert_eq!(unmatched.id, "qwen/qwen2.5-coder-14b");

        let omitted = registry.resolve(None).await.unwrap();
        assert_eq!(omitted.id, "qwen/qwen2.5-coder-14b");

        // An unloaded model is never chosen, even by exact name.
        let unloaded = registry.resolve(Some("llama-3.2-3b-instruct")).await.unwrap();
        assert_eq!(unloaded.id, "qwen/qwen2.5-coder-14b");
    }

    #[tokio::test]
    async fn test_resolve_prefers_default_model() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_list_models()
            .times(1)
            .returning(|_| Ok(loaded_models()));

        let settings = GatewaySettings {
            default_model: Some("mistral-nemo-instruct-2407".to_string()),
            ..GatewaySettings::default()
        };
        let registry = registry(backend, settings);

        let model = registry.resolve(Some("gpt-4")).await.unwrap();
        assert_eq!(model.id, "mistral-nemo-instruct-2407");

        let model = registry.resolve(Some("qwen/qwen2.5-coder-14b")).await.unwrap();
        assert_eq!(model.id, "qwen/qwen2.5-coder-14b");
    }

    #[tokio::test]
    async fn test_resolve_with_nothing_loaded() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_list_models()
            .times(1)
            .returning(|_| Ok(vec![ModelDescriptor::unloaded("llama-3.2-3b-instruct")]));

        let registry = registry(backend, GatewaySettings::default());
        let err = registry.resolve(Some("anything")).await.unwrap_err();
        assert_eq!(err, GatewayError::NoModelLoaded);
    }

    #[tokio::test]
    async fn test_resolve_cold_start_with_backend_down() {
        let mut backend = MockBackendPort::new();
        backend
            .expect_list_models()
            .times(1)
            .returning(|_| Err(BackendError::Unreachable("connection refused".into())));

        let registry = registry(backend, GatewaySettings::default());
        let err = registry.resolve(None).await.unwrap_err();
        assert_eq!(err, GatewayError::NoModelLoaded);
        assert!(registry.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loop_stops_on_cancel() {
        let mut backend = MockBackendPort::new();
        backend.expect_list_models().returning(|_| Ok(loaded_models()));

        let registry = Arc::new(registry(backend, GatewaySettings::default()));
        let cancel = CancellationToken::new();
        let handle = Arc::clone(&registry).spawn_refresh_loop(cancel.clone());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(registry.snapshot().loaded_count(), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn test_resolve_in_ignores_blank_names() {
        let snapshot = ModelSnapshot::new(loaded_models());
        let model = resolve_in(&snapshot, Some("  "), None).unwrap();
        assert_eq!(model.id, "qwen/qwen2.5-coder-14b");
        assert!(resolve_in(&ModelSnapshot::empty(), None, None).is_none());
    }
}
