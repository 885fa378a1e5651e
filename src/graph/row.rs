//! Row and parameter types for query results.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::GraphError;

/// Bound parameters for a Cypher query.
///
/// Values are always sent as bound parameters over the wire - they are
/// never interpolated into the query text.
pub type Params = HashMap<String, JsonValue>;

/// A single result row: column name → JSON value.
///
/// Node and relationship columns arrive pre-projected (queries return
/// `properties(n)` and `labels(n)` / `type(r)` explicitly), so every
/// column is a plain JSON scalar, list or map.
#[derive(Debug, Clone, Default)]
pub struct Row {
    data: HashMap<String, JsonValue>,
}

impl Row {
    pub fn new(data: HashMap<String, JsonValue>) -> Self {
        Self { data }
    }

    /// Typed extraction of a column.
    ///
    /// Errors when the column is absent or does not deserialize.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, GraphError> {
        self.data
            .get(key)
            .ok_or_else(|| GraphError::Internal(format!("column not found: {}", key)))
            .and_then(|v| {
                serde_json::from_value(v.clone()).map_err(|e| {
                    GraphError::Internal(format!("failed to deserialize '{}': {}", key, e))
                })
            })
    }

    /// Like [`get`](Row::get) but absent or null columns become `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, GraphError> {
        match self.data.get(key) {
            Some(v) if v.is_null() => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
                GraphError::Internal(format!("failed to deserialize '{}': {}", key, e))
            }),
            None => Ok(None),
        }
    }

    /// Raw JSON value of a column, if present.
    pub fn get_raw(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_inner(self) -> HashMap<String, JsonValue> {
        self.data
    }
}

impl From<HashMap<String, JsonValue>> for Row {
    fn from(data: HashMap<String, JsonValue>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, JsonValue)]) -> Row {
        Row::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn typed_extraction() {
        let r = row(&[("id", json!("d1")), ("count", json!(3))]);
        assert_eq!(r.get::<String>("id").unwrap(), "d1");
        assert_eq!(r.get::<i64>("count").unwrap(), 3);
    }

    #[test]
    fn missing_column_is_an_error() {
        let r = Row::default();
        assert!(r.get::<String>("nope").is_err());
    }

    #[test]
    fn get_opt_treats_null_and_missing_alike() {
        let r = row(&[("a", JsonValue::Null)]);
        assert_eq!(r.get_opt::<String>("a").unwrap(), None);
        assert_eq!(r.get_opt::<String>("b").unwrap(), None);
    }

    #[test]
    fn nested_values_deserialize() {
        let r = row(&[("props", json!({"lang": "en", "tags": ["a", "b"]}))]);
        let props: serde_json::Map<String, JsonValue> = r.get("props").unwrap();
        assert_eq!(props["lang"], json!("en"));
        assert_eq!(props["tags"], json!(["a", "b"]));
    }
}
