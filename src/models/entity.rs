//! Entity record for extracted knowledge-graph entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An extracted entity in the knowledge graph.
///
/// Entities share the storage and retrieval path with generic nodes under
/// the `Entity` label; domain attributes such as `entity_type` live in
/// `properties`. `name` falls back to `id` when the extractor did not
/// provide one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name; defaults to `id`.
    pub name: String,
    /// Domain-specific attributes.
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Set on first creation.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write.
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Creates an entity whose name defaults to its id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let now = Utc::now();
        Self {
            name: id.clone(),
            id,
            properties: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the display name, consuming and returning the entity.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a property, consuming and returning the entity.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
