//! Backend model descriptors and registry snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A model known to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Backend identifier, e.g. `qwen/qwen2.5-coder-14b`.
    pub id: String,
    /// Whether the model is resident and can serve completions.
    pub loaded: bool,
    /// Everything else the backend reported about the model.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ModelDescriptor {
    /// Create a descriptor for a loaded model.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            loaded: true,
            metadata: Map::new(),
        }
    }

    /// Create a descriptor for a model the backend knows but has not loaded.
    pub fn unloaded(id: impl Into<String>) -> Self {
        Self {
            loaded: false,
            ..Self::new(id)
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether this model answers to `name`.
    ///
    /// Exact match first; editors frequently change case, so an ASCII
    /// case-insensitive match is accepted too.
    pub fn matches(&self, name: &str) -> bool {
        self.id == name || self.id.eq_ignore_ascii_case(name)
    }
}

/// Immutable point-in-time view of the backend's models.
///
/// Snapshots are never mutated; a refresh builds a new one and swaps it in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelSnapshot {
    models: Vec<ModelDescriptor>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl ModelSnapshot {
    /// The snapshot held before the first successful poll.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from a fresh poll result, stamped with the current time.
    #[must_use]
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        Self {
            models,
            refreshed_at: Some(Utc::now()),
        }
    }

    /// All models in backend order.
    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    /// Loaded models in backend order.
    pub fn loaded(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter().filter(|m| m.loaded)
    }

    /// Find a loaded model answering to `name`, preferring exact matches.
    pub fn find_loaded(&self, name: &str) -> Option<&ModelDescriptor> {
        self.loaded()
            .find(|m| m.id == name)
            .or_else(|| self.loaded().find(|m| m.matches(name)))
    }

    /// First loaded model, the fallback target for unmatched names.
    pub fn first_loaded(&self) -> Option<&ModelDescriptor> {
        self.loaded().next()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded().count()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// When the poll behind this snapshot completed; `None` if never polled.
    pub const fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }
}
