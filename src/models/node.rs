//! Generic node record and traversal direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

/// A generic labeled node in the property graph.
///
/// `id` is unique within a label; writing the same id twice updates in
/// place. Dynamic, caller-defined kinds are allowed - the label is the
/// effective type discriminator in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the node's label.
    pub id: String,
    /// Node label (e.g. "Document", "Chunk", or a user-defined type).
    pub kind: String,
    /// Free-form scalar or nested properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Set on first creation, never overwritten by re-ingestion.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write.
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Creates a node with the given id and kind, timestamped now.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind: kind.into(),
            properties: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a property, consuming and returning the node.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Traversal direction for neighbor queries, relative to the start node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow edges leaving the start node.
    Outgoing,
    /// Follow edges arriving at the start node.
    Incoming,
    /// Follow edges in either direction.
    Both,
}

/// Generates a new ULID string.
pub fn generate_ulid() -> String {
    Ulid::new().to_string()
}
