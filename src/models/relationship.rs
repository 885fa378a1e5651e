//! Directed relationship record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::generate_ulid;

/// A directed, typed edge between two nodes.
///
/// Source and target reference node ids; the store checks that both exist
/// at write time but maintains no foreign-key integrity afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier.
    pub id: String,
    /// Edge type (e.g. "CONTAINS", "MENTIONS", "RELATED_TO").
    pub kind: String,
    /// Id of the node the edge leaves.
    pub source_id: String,
    /// Id of the node the edge points to.
    pub target_id: String,
    /// Free-form edge properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Set on first creation.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write.
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    /// Creates a relationship with a generated ULID id, timestamped now.
    pub fn new(
        kind: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_ulid(),
            kind: kind.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            properties: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a property, consuming and returning the relationship.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
