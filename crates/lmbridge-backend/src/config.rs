//! Public configuration for the LM Studio client.
//!
//! Only startup-time knobs live here. The backend URL and per-call timeouts
//! come from the live [`SettingsStore`](lmbridge_core::SettingsStore) so
//! they can change without rebuilding the client.

use std::time::Duration;

/// Default bound on concurrent completion calls.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Configuration for [`LmStudioClient`](crate::LmStudioClient).
///
/// # Example
///
/// ```
/// use lmbridge_backend::LmStudioClientConfig;
/// use std::time::Duration;
///
/// let config = LmStudioClientConfig::new()
///     .with_max_concurrent(2)
///     .with_connect_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct LmStudioClientConfig {
    /// Completion calls allowed in flight at once; also the idle pool size.
    pub(crate) max_concurrent: usize,
    /// Bound on establishing a TCP connection.
    pub(crate) connect_timeout: Duration,
    pub(crate) user_agent: String,
}

impl Default for LmStudioClientConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            connect_timeout: Duration::from_secs(5),
            user_agent: concat!("lmbridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LmStudioClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrent completion bound. Values below 1 are raised to 1.
    ///
    /// Defaults to 4. LM Studio serializes generation internally, so a
    /// small number keeps queued requests in the gateway rather than the
    /// backend.
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Set the connect timeout. Defaults to 5 seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
