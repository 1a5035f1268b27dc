//! Backend health probing.
//!
//! `probe` never fails outward: an unreachable backend is a normal
//! `reachable: false` report. `watch` polls on an interval and yields only
//! when reachability changes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_stream::stream;
use futures_util::Stream;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::BackendHealth;
use crate::ports::BackendPort;
use crate::settings::SettingsStore;

/// Probes the backend with a lightweight model-list call.
pub struct HealthMonitor {
    backend: Arc<dyn BackendPort>,
    settings: Arc<SettingsStore>,
}

impl HealthMonitor {
    pub fn new(backend: Arc<dyn BackendPort>, settings: Arc<SettingsStore>) -> Self {
        Self { backend, settings }
    }

    /// Probe the backend once.
    ///
    /// Bounded by `health_timeout_secs`, which is kept well below the
    /// completion timeout so probes never wait behind a generation.
    pub async fn probe(&self) -> BackendHealth {
        let timeout = self.settings.snapshot().health_timeout();
        let started = Instant::now();

        let result = tokio::time::timeout(timeout, self.backend.list_models(timeout)).await;
        let latency = started.elapsed();

        match result {
            Ok(Ok(models)) => {
                let loaded = models.iter().filter(|m| m.loaded).count();
                BackendHealth::reachable(latency, loaded)
            }
            Ok(Err(e)) => BackendHealth::unreachable(latency, e.to_string()),
            Err(_) => BackendHealth::unreachable(
                latency,
                format!("Health check timed out after {timeout:?}"),
            ),
        }
    }

    /// Probe every `check_interval` and yield when reachability changes.
    ///
    /// The first probe is always yielded. Completes when `cancel` fires.
    pub fn watch(
        self: Arc<Self>,
        check_interval: Duration,
        cancel: CancellationToken,
    ) -> impl Stream<Item = BackendHealth> {
        stream! {
            let mut ticker = interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut last_reachable: Option<bool> = None;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let health = self.probe().await;
                        if last_reachable != Some(health.reachable) {
                            debug!(
                                reachable = health.reachable,
                                ?last_reachable,
                                "Backend reachability changed"
                            );
                            last_reachable = Some(health.reachable);
                            yield health;
                        }
                    }
                    () = cancel.cancelled() => {
                        debug!("Health watch cancelled");
                        break;
                    }
                }
            }
        }
    }
}
