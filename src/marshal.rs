//! Bidirectional mapping between typed records and graph primitives.
//!
//! Write path: a record becomes a label plus a flat property map. Labels
//! (and property keys used in filters) are the only text interpolated into
//! query strings - Cypher cannot parameterize them - so they pass through
//! [`escape_identifier`] first. Values always travel as bound parameters.
//!
//! Read path: queries project `labels(n)` / `type(r)` and
//! `properties(..)` explicitly; the functions here resolve the effective
//! record kind, normalize temporal values and partition the property map
//! back into typed fields. A raw result without an `id` is treated as
//! malformed graph data and skipped with a warning, never an error.
//!
//! Neo4j properties hold scalars and homogeneous scalar lists only, so
//! nested objects (and mixed lists) are stored as JSON text and revived on
//! read. See DESIGN.md for the trade-off.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Label for document nodes.
pub const DOCUMENT_LABEL: &str = "Document";
/// Label for chunk nodes.
pub const CHUNK_LABEL: &str = "Chunk";
/// Label for entity nodes.
pub const ENTITY_LABEL: &str = "Entity";
/// Edge kind linking a document to the chunks it owns.
pub const CONTAINS_KIND: &str = "CONTAINS";
/// Fallback kind when no non-internal label qualifies.
pub const GENERIC_KIND: &str = "Node";

// ---------------------------------------------------------------------------
// Identifier escaping
// ---------------------------------------------------------------------------

/// Escapes a label, edge kind or property key for interpolation into
/// query text.
///
/// Backtick-quotes the identifier, doubling embedded backticks, so a
/// hostile name cannot break out of the structural position. This is the
/// only place interpolation is permitted.
pub fn escape_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    let name = if trimmed.is_empty() {
        GENERIC_KIND
    } else {
        trimmed
    };
    format!("`{}`", name.replace('`', "``"))
}

// ---------------------------------------------------------------------------
// Property encoding
// ---------------------------------------------------------------------------

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// Encodes one property value into a form Neo4j can store.
///
/// Objects and heterogeneous lists become JSON text; scalars and lists of
/// scalars (embedding vectors, tag lists) pass through unchanged.
pub fn encode_property(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::String(value.to_string()),
        Value::Array(items) if !items.iter().all(is_scalar) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

/// Reverses [`encode_property`]: strings that parse as JSON objects or
/// arrays are revived into structured values.
pub fn decode_property(value: Value) -> Value {
    if let Value::String(s) = &value {
        let trimmed = s.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(parsed @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str(s) {
                return parsed;
            }
        }
    }
    value
}

fn encode_properties(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), encode_property(v)))
        .collect()
}

fn decode_properties(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| (k, decode_property(v)))
        .collect()
}

// ---------------------------------------------------------------------------
// Write path: record → property map
// ---------------------------------------------------------------------------

use crate::models::{Chunk, Document, Entity, Node, Relationship};

/// Property map for a generic node upsert.
///
/// `id`, `kind` and both timestamps are excluded: the id is the merge key,
/// the kind is the label, and the upsert query sets `created_at` only in
/// its on-create branch and refreshes `updated_at` on every write.
pub fn node_to_props(node: &Node) -> Value {
    Value::Object(encode_properties(&node.properties))
}

/// Property map for an entity upsert. `name` rides along with the free
/// properties.
pub fn entity_to_props(entity: &Entity) -> Value {
    let mut props = encode_properties(&entity.properties);
    props.insert("name".to_string(), Value::String(entity.name.clone()));
    Value::Object(props)
}

/// Property map for a document upsert.
pub fn document_to_props(document: &Document) -> Value {
    let mut props = Map::new();
    props.insert(
        "content".to_string(),
        Value::String(document.content.clone()),
    );
    props.insert(
        "metadata".to_string(),
        encode_property(&Value::Object(document.metadata.clone())),
    );
    Value::Object(props)
}

/// Property map for a chunk upsert. An absent embedding is omitted rather
/// than written as null (`SET n += $props` would erase the property).
pub fn chunk_to_props(chunk: &Chunk) -> Value {
    let mut props = Map::new();
    props.insert("text".to_string(), Value::String(chunk.text.clone()));
    props.insert(
        "document_id".to_string(),
        Value::String(chunk.document_id.clone()),
    );
    if let Some(embedding) = &chunk.embedding {
        props.insert(
            "embedding".to_string(),
            Value::Array(
                embedding
                    .iter()
                    .map(|f| {
                        serde_json::Number::from_f64(f64::from(*f))
                            .map(Value::Number)
                            .unwrap_or(Value::Null)
                    })
                    .collect(),
            ),
        );
    }
    Value::Object(props)
}

/// Property map for a relationship upsert.
pub fn relationship_to_props(relationship: &Relationship) -> Value {
    Value::Object(encode_properties(&relationship.properties))
}

// ---------------------------------------------------------------------------
// Read path: raw parts → record
// ---------------------------------------------------------------------------

/// Resolves the effective kind from a node's label set.
///
/// Internal labels (leading underscore) never qualify; among the rest the
/// first label that is not the generic fallback wins, so a node labeled
/// both specifically and generically reads back as the specific kind.
pub fn resolve_kind(labels: &[String]) -> String {
    let visible: Vec<&String> = labels.iter().filter(|l| !l.starts_with('_')).collect();
    visible
        .iter()
        .find(|l| l.as_str() != GENERIC_KIND)
        .or_else(|| visible.first())
        .map(|l| l.to_string())
        .unwrap_or_else(|| GENERIC_KIND.to_string())
}

/// Normalizes a stored temporal value to `DateTime<Utc>`.
///
/// Accepts RFC 3339 strings (our own writes), naive datetime strings, and
/// numeric epochs (milliseconds above a threshold, otherwise seconds).
/// Anything else falls back to the Unix epoch so a missing timestamp is
/// visible instead of silently becoming "now".
pub fn normalize_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    match value {
        Some(Value::String(s)) => parse_timestamp_str(s).unwrap_or(DateTime::UNIX_EPOCH),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                if i.abs() >= 100_000_000_000 {
                    DateTime::from_timestamp_millis(i).unwrap_or(DateTime::UNIX_EPOCH)
                } else {
                    DateTime::from_timestamp(i, 0).unwrap_or(DateTime::UNIX_EPOCH)
                }
            } else if let Some(f) = n.as_f64() {
                DateTime::from_timestamp_millis((f * 1000.0) as i64).unwrap_or(DateTime::UNIX_EPOCH)
            } else {
                DateTime::UNIX_EPOCH
            }
        }
        _ => DateTime::UNIX_EPOCH,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Neo4j localdatetime() renders without an offset.
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn take_id(props: &mut Map<String, Value>, what: &str) -> Option<String> {
    match props.remove("id") {
        Some(Value::String(id)) => Some(id),
        other => {
            tracing::warn!(kind = what, value = ?other, "skipping graph record without usable id");
            None
        }
    }
}

fn take_timestamps(props: &mut Map<String, Value>) -> (DateTime<Utc>, DateTime<Utc>) {
    let created_at = normalize_timestamp(props.remove("created_at").as_ref());
    let updated_at = normalize_timestamp(props.remove("updated_at").as_ref());
    (created_at, updated_at)
}

fn take_string(props: &mut Map<String, Value>, key: &str) -> Option<String> {
    match props.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Reconstructs a generic node. `None` means the raw row was malformed
/// (no id) and should be skipped.
pub fn node_from_graph(labels: &[String], mut props: Map<String, Value>) -> Option<Node> {
    let id = take_id(&mut props, GENERIC_KIND)?;
    let (created_at, updated_at) = take_timestamps(&mut props);
    Some(Node {
        id,
        kind: resolve_kind(labels),
        properties: decode_properties(props),
        created_at,
        updated_at,
    })
}

/// Reconstructs an entity; `name` defaults to the id when absent.
pub fn entity_from_graph(mut props: Map<String, Value>) -> Option<Entity> {
    let id = take_id(&mut props, ENTITY_LABEL)?;
    let (created_at, updated_at) = take_timestamps(&mut props);
    let name = take_string(&mut props, "name").unwrap_or_else(|| id.clone());
    Some(Entity {
        id,
        name,
        properties: decode_properties(props),
        created_at,
        updated_at,
    })
}

/// Reconstructs a document.
pub fn document_from_graph(mut props: Map<String, Value>) -> Option<Document> {
    let id = take_id(&mut props, DOCUMENT_LABEL)?;
    let (created_at, updated_at) = take_timestamps(&mut props);
    let content = take_string(&mut props, "content").unwrap_or_default();
    let metadata = match props.remove("metadata").map(decode_property) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    Some(Document {
        id,
        content,
        metadata,
        created_at,
        updated_at,
    })
}

/// Reconstructs a chunk.
pub fn chunk_from_graph(mut props: Map<String, Value>) -> Option<Chunk> {
    let id = take_id(&mut props, CHUNK_LABEL)?;
    let (created_at, updated_at) = take_timestamps(&mut props);
    let text = take_string(&mut props, "text").unwrap_or_default();
    let document_id = take_string(&mut props, "document_id").unwrap_or_default();
    let embedding = match props.remove("embedding") {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|v| v.as_f64())
                .map(|f| f as f32)
                .collect(),
        ),
        _ => None,
    };
    Some(Chunk {
        id,
        document_id,
        text,
        embedding,
        created_at,
        updated_at,
    })
}

/// Reconstructs a relationship from its projected parts.
pub fn relationship_from_graph(
    kind: String,
    source_id: String,
    target_id: String,
    mut props: Map<String, Value>,
) -> Option<Relationship> {
    let id = take_id(&mut props, &kind)?;
    let (created_at, updated_at) = take_timestamps(&mut props);
    Some(Relationship {
        id,
        kind,
        source_id,
        target_id,
        properties: decode_properties(props),
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escape_identifier_quotes_and_doubles_backticks() {
        assert_eq!(escape_identifier("Document"), "`Document`");
        assert_eq!(escape_identifier("My`Label"), "`My``Label`");
        assert_eq!(escape_identifier("Has Space"), "`Has Space`");
        assert_eq!(escape_identifier("  "), "`Node`");
    }

    #[test]
    fn hostile_label_cannot_escape_backticks() {
        let escaped = escape_identifier("X` {id: 1}) DETACH DELETE n //");
        // Every embedded backtick is doubled, so the quoted region never closes early.
        assert!(escaped.starts_with('`') && escaped.ends_with('`'));
        assert!(!escaped[1..escaped.len() - 1].replace("``", "").contains('`'));
    }

    #[test]
    fn nested_properties_round_trip() {
        let nested = json!({"source": {"url": "http://e.com", "rank": 2}, "tags": ["a", "b"]});
        let encoded = encode_property(&nested);
        assert!(encoded.is_string());
        assert_eq!(decode_property(encoded), nested);
    }

    #[test]
    fn scalar_lists_are_stored_natively() {
        let embedding = json!([0.1, 0.2, 0.3]);
        assert_eq!(encode_property(&embedding), embedding);
    }

    #[test]
    fn plain_strings_survive_decode() {
        let v = Value::String("just text, not JSON".to_string());
        assert_eq!(decode_property(v.clone()), v);
    }

    #[test]
    fn resolve_kind_prefers_specific_label() {
        let labels = vec!["Node".to_string(), "Person".to_string()];
        assert_eq!(resolve_kind(&labels), "Person");
    }

    #[test]
    fn resolve_kind_skips_internal_labels() {
        let labels = vec!["_Internal".to_string(), "Entity".to_string()];
        assert_eq!(resolve_kind(&labels), "Entity");
    }

    #[test]
    fn resolve_kind_falls_back_to_generic() {
        assert_eq!(resolve_kind(&[]), "Node");
        assert_eq!(resolve_kind(&["_Hidden".to_string()]), "Node");
    }

    #[test]
    fn timestamps_normalize_from_string_and_epoch() {
        let rfc = normalize_timestamp(Some(&json!("2024-05-01T12:00:00Z")));
        assert_eq!(rfc.to_rfc3339(), "2024-05-01T12:00:00+00:00");

        let seconds = normalize_timestamp(Some(&json!(1_714_564_800)));
        assert_eq!(seconds.timestamp(), 1_714_564_800);

        let millis = normalize_timestamp(Some(&json!(1_714_564_800_000i64)));
        assert_eq!(millis.timestamp(), 1_714_564_800);

        let naive = normalize_timestamp(Some(&json!("2024-05-01T12:00:00.250")));
        assert_eq!(naive.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn missing_timestamp_falls_back_to_epoch() {
        assert_eq!(normalize_timestamp(None), DateTime::UNIX_EPOCH);
        assert_eq!(
            normalize_timestamp(Some(&json!("not a date"))),
            DateTime::UNIX_EPOCH
        );
    }

    #[test]
    fn node_round_trips_through_property_map() {
        let node = Node::new("n1", "Concept")
            .with_property("weight", json!(0.8))
            .with_property("origin", json!({"extractor": "v2"}));

        let props = match node_to_props(&node) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let mut stored = props;
        stored.insert("id".to_string(), json!("n1"));
        stored.insert(
            "created_at".to_string(),
            json!(node.created_at.to_rfc3339()),
        );
        stored.insert(
            "updated_at".to_string(),
            json!(node.updated_at.to_rfc3339()),
        );

        let restored = node_from_graph(&["Concept".to_string()], stored).unwrap();
        assert_eq!(restored.id, node.id);
        assert_eq!(restored.kind, node.kind);
        assert_eq!(restored.properties, node.properties);
        assert_eq!(restored.created_at.timestamp(), node.created_at.timestamp());
    }

    #[test]
    fn entity_name_defaults_to_id() {
        let mut props = Map::new();
        props.insert("id".to_string(), json!("alice"));
        let entity = entity_from_graph(props).unwrap();
        assert_eq!(entity.name, "alice");
    }

    #[test]
    fn row_without_id_is_skipped() {
        let mut props = Map::new();
        props.insert("text".to_string(), json!("orphan"));
        assert!(node_from_graph(&["Chunk".to_string()], props.clone()).is_none());
        assert!(chunk_from_graph(props).is_none());
    }

    #[test]
    fn document_metadata_revives_from_json_text() {
        let mut props = Map::new();
        props.insert("id".to_string(), json!("d1"));
        props.insert("content".to_string(), json!("hello"));
        props.insert("metadata".to_string(), json!(r#"{"lang":"en"}"#));
        let doc = document_from_graph(props).unwrap();
        assert_eq!(doc.metadata["lang"], json!("en"));
    }

    #[test]
    fn chunk_embedding_reads_back_as_f32() {
        let mut props = Map::new();
        props.insert("id".to_string(), json!("c1"));
        props.insert("document_id".to_string(), json!("d1"));
        props.insert("text".to_string(), json!("fragment"));
        props.insert("embedding".to_string(), json!([0.25, 0.5]));
        let chunk = chunk_from_graph(props).unwrap();
        assert_eq!(chunk.embedding, Some(vec![0.25, 0.5]));
    }
}
