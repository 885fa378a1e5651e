//! Core traits for query execution and connection lifecycle.

use async_trait::async_trait;

use crate::error::GraphError;
use crate::graph::row::{Params, Row};

/// Executes one parameterized Cypher query per call.
///
/// Each call is a single transaction: the implementation acquires a
/// connection, runs the query with bound parameters, fetches every row,
/// commits on success and rolls back on failure. Per-call resources
/// (temporary connections, transactions) are released on every path.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes a query and returns all result rows.
    async fn execute(&self, cypher: &str, params: Params) -> Result<Vec<Row>, GraphError>;

    /// Executes a mutation, discarding any rows it returns.
    async fn run(&self, cypher: &str, params: Params) -> Result<(), GraphError> {
        self.execute(cypher, params).await.map(|_| ())
    }
}

/// A graph database client with an explicit connection lifecycle.
///
/// Extends [`QueryExecutor`] with management of the one persistent,
/// reusable connection per client instance. Executing without calling
/// [`connect`](GraphClient::connect) first is allowed - the executor then
/// falls back to a temporary connection per call.
#[async_trait]
pub trait GraphClient: QueryExecutor {
    /// Opens the persistent connection if none exists. Idempotent.
    async fn connect(&self) -> Result<(), GraphError>;

    /// Drops the persistent connection. Safe to call when not connected.
    async fn close(&self);
}
