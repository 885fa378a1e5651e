//! Document and chunk records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A source document stored in the graph.
///
/// Owns its chunks: deleting a document cascades to every chunk linked
/// via `CONTAINS`. Re-ingesting the same id overwrites `content` and
/// `metadata` in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: String,
    /// Full document text.
    pub content: String,
    /// Arbitrary ingestion metadata (source URL, mime type, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Set on first ingestion.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every re-ingestion.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a document timestamped now.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A text fragment of a document.
///
/// `document_id` is a weak back-reference resolved by id lookup - never a
/// live pointer. A chunk can only be written when its parent document
/// already exists; the write links both with a `CONTAINS` edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier.
    pub id: String,
    /// Id of the owning document.
    pub document_id: String,
    /// Fragment text.
    pub text: String,
    /// Fixed-length embedding vector, when one has been computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Set on first creation.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write.
    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    /// Creates a chunk for the given document, timestamped now.
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            document_id: document_id.into(),
            text: text.into(),
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }
}
