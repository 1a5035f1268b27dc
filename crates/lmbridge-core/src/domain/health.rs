//! Backend health report.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one health probe against the backend. Recomputed per probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub reachable: bool,
    /// Round-trip time of the probe (or time until it failed).
    #[serde(rename = "latency_ms", with = "duration_millis")]
    pub latency: Duration,
    pub last_checked: DateTime<Utc>,
    /// Number of loaded models the probe saw.
    pub models_loaded: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackendHealth {
    pub fn reachable(latency: Duration, models_loaded: usize) -> Self {
        Self {
            reachable: true,
            latency,
            last_checked: Utc::now(),
            models_loaded,
            error: None,
        }
    }

    pub fn unreachable(latency: Duration, error: impl Into<String>) -> Self {
        Self {
            reachable: false,
            latency,
            last_checked: Utc::now(),
            models_loaded: 0,
            error: Some(error.into()),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
