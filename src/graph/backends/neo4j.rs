//! Neo4j (Bolt) backend.
//!
//! [`Neo4jClient`] owns at most one persistent driver handle per instance
//! and falls back to a temporary per-call handle when none has been
//! opened. Connection establishment is retried with a fixed delay on
//! transient faults; query execution is never retried.
//!
//! # Example
//!
//! ```ignore
//! use ragstore::config::GraphConfig;
//! use ragstore::graph::backends::Neo4jClient;
//! use ragstore::graph::{GraphClient, QueryExt};
//!
//! let client = Neo4jClient::new(GraphConfig::default());
//! client.connect().await?;
//!
//! let rows = client
//!     .query("MATCH (n:Document) RETURN n.id AS id")
//!     .fetch_all()
//!     .await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use neo4rs::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType,
    ConfigBuilder,
};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::config::GraphConfig;
use crate::error::{is_transient, GraphError};
use crate::graph::executor::{GraphClient, QueryExecutor};
use crate::graph::row::{Params, Row};

/// Neo4j graph client.
///
/// Holds one optional persistent `neo4rs::Graph` (itself a cheap-to-clone
/// pooled handle). `execute` acquires the persistent handle when present,
/// otherwise opens a temporary one that is dropped when the call returns.
pub struct Neo4jClient {
    config: GraphConfig,
    persistent: Mutex<Option<neo4rs::Graph>>,
}

impl Neo4jClient {
    /// Creates a client without opening any connection.
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            persistent: Mutex::new(None),
        }
    }

    /// Returns the configuration this client was built with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Returns the persistent handle if connected, otherwise a fresh
    /// temporary handle flagged `true` so the caller knows it is
    /// per-call.
    async fn acquire(&self) -> Result<(neo4rs::Graph, bool), GraphError> {
        if let Some(graph) = self.persistent.lock().await.as_ref() {
            return Ok((graph.clone(), false));
        }
        tracing::debug!("no persistent connection, opening temporary handle");
        let graph = self.open_with_retry().await?;
        Ok((graph, true))
    }

    /// Opens a driver handle under the retry policy: bounded attempts,
    /// fixed delay, transient faults only.
    async fn open_with_retry(&self) -> Result<neo4rs::Graph, GraphError> {
        let max_attempts = self.config.max_connection_retries.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match Self::open(&self.config).await {
                Ok(graph) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "connected to Neo4j after retry");
                    }
                    return Ok(graph);
                }
                Err(err) if is_transient(&err) && attempt < max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %err,
                        "transient connection failure, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn open(config: &GraphConfig) -> Result<neo4rs::Graph, neo4rs::Error> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri())
            .user(&config.user)
            .password(&config.password)
            .fetch_size(config.fetch_size);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo_config = builder.build()?;
        neo4rs::Graph::connect(neo_config).await
    }

    /// Runs one query inside an explicit transaction: fetch everything,
    /// commit on success, roll back on failure.
    async fn run_in_txn(
        graph: &neo4rs::Graph,
        cypher: &str,
        params: Params,
    ) -> Result<Vec<Row>, GraphError> {
        let mut txn = graph.start_txn().await?;

        match Self::fetch_rows(&mut txn, cypher, params).await {
            Ok(rows) => {
                txn.commit().await?;
                Ok(rows)
            }
            Err(err) => {
                if let Err(rb) = txn.rollback().await {
                    tracing::warn!(error = %rb, "rollback failed after query error");
                }
                Err(err)
            }
        }
    }

    async fn fetch_rows(
        txn: &mut neo4rs::Txn,
        cypher: &str,
        params: Params,
    ) -> Result<Vec<Row>, GraphError> {
        let query = build_query(cypher, params);
        let mut stream = txn.execute(query).await.map_err(|e| GraphError::Query {
            message: e.to_string(),
            query: cypher.to_string(),
        })?;

        let mut rows = Vec::new();
        while let Some(row) = stream
            .next(txn.handle())
            .await
            .map_err(|e| GraphError::Query {
                message: format!("failed to fetch row: {}", e),
                query: cypher.to_string(),
            })?
        {
            rows.push(decode_row(&row)?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl QueryExecutor for Neo4jClient {
    async fn execute(&self, cypher: &str, params: Params) -> Result<Vec<Row>, GraphError> {
        let (graph, temporary) = self.acquire().await?;
        let result = Self::run_in_txn(&graph, cypher, params).await;
        if temporary {
            // Dropping the handle closes the per-call pool.
            drop(graph);
        }
        result
    }
}

#[async_trait]
impl GraphClient for Neo4jClient {
    async fn connect(&self) -> Result<(), GraphError> {
        let mut guard = self.persistent.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let graph = self.open_with_retry().await?;
        tracing::info!(uri = %self.config.uri(), "connected to Neo4j");
        *guard = Some(graph);
        Ok(())
    }

    async fn close(&self) {
        if self.persistent.lock().await.take().is_some() {
            tracing::info!("closed persistent Neo4j connection");
        }
    }
}

/// Builds a driver query with every value bound as a parameter.
fn build_query(cypher: &str, params: Params) -> neo4rs::Query {
    let mut query = neo4rs::query(cypher);
    for (name, value) in params {
        query = query.param(&name, json_to_bolt(&value));
    }
    query
}

/// JSON → Bolt parameter conversion. Nested maps and lists recurse.
fn json_to_bolt(value: &JsonValue) -> BoltType {
    match value {
        JsonValue::Null => BoltType::Null(BoltNull),
        JsonValue::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoltType::Integer(BoltInteger::new(i))
            } else {
                BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        JsonValue::String(s) => BoltType::String(BoltString::from(s.as_str())),
        JsonValue::Array(items) => {
            let mut list = BoltList::new();
            for item in items {
                list.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        JsonValue::Object(map) => {
            let mut bolt_map = BoltMap::new();
            for (key, item) in map {
                bolt_map.put(BoltString::from(key.as_str()), json_to_bolt(item));
            }
            BoltType::Map(bolt_map)
        }
    }
}

/// Decodes a driver row into the JSON-valued [`Row`].
///
/// Queries project node/relationship columns explicitly (`properties(n)`,
/// `labels(n)`, `type(r)`), so every column deserializes as a plain JSON
/// value.
fn decode_row(row: &neo4rs::Row) -> Result<Row, GraphError> {
    let data: HashMap<String, JsonValue> = row
        .to()
        .map_err(|e| GraphError::Internal(format!("failed to decode row: {}", e)))?;
    Ok(Row::new(data))
}
