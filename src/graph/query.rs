//! Fluent builder for parameterized Cypher queries.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::GraphError;
use crate::graph::executor::QueryExecutor;
use crate::graph::row::{Params, Row};

/// Builder that accumulates bound parameters and executes against any
/// [`QueryExecutor`].
///
/// ```ignore
/// let rows = client
///     .query("MATCH (n:Entity) WHERE n.id = $id RETURN properties(n) AS props")
///     .param("id", "entity-123")
///     .fetch_all()
///     .await?;
/// ```
pub struct Query<'a, E: QueryExecutor + ?Sized> {
    executor: &'a E,
    cypher: String,
    params: Params,
}

impl<'a, E: QueryExecutor + ?Sized> Query<'a, E> {
    pub fn new(executor: &'a E, cypher: impl Into<String>) -> Self {
        Self {
            executor,
            cypher: cypher.into(),
            params: Params::new(),
        }
    }

    /// Binds a parameter, referenced in Cypher as `$name`.
    ///
    /// # Panics
    ///
    /// Panics if the value cannot be serialized to JSON.
    pub fn param<T: Serialize>(mut self, name: &str, value: T) -> Self {
        let json = serde_json::to_value(value).expect("failed to serialize parameter value");
        self.params.insert(name.to_string(), json);
        self
    }

    /// Binds a parameter that is already a JSON value.
    pub fn param_raw(mut self, name: &str, value: JsonValue) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    /// Executes and collects all rows.
    pub async fn fetch_all(self) -> Result<Vec<Row>, GraphError> {
        self.executor.execute(&self.cypher, self.params).await
    }

    /// Executes and returns the first row, if any.
    pub async fn fetch_one(self) -> Result<Option<Row>, GraphError> {
        let mut rows = self.executor.execute(&self.cypher, self.params).await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.swap_remove(0)))
        }
    }

    /// Executes a mutation without returning rows.
    pub async fn run(self) -> Result<(), GraphError> {
        self.executor.run(&self.cypher, self.params).await
    }
}

/// Extension trait providing `executor.query("...")` on every executor.
pub trait QueryExt: QueryExecutor {
    fn query(&self, cypher: &str) -> Query<'_, Self>
    where
        Self: Sized,
    {
        Query::new(self, cypher)
    }
}

impl<E: QueryExecutor> QueryExt for E {}
