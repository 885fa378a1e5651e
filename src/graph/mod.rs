//! Graph execution layer: connection lifecycle, single-query transactions
//! and row decoding.
//!
//! The layer is built on two traits:
//!
//! - [`QueryExecutor`] - run one parameterized Cypher query as one
//!   transaction (fetch-all, commit on success, rollback on failure)
//! - [`GraphClient`] - adds the persistent-connection lifecycle
//!   (`connect`/`close`) on top of execution
//!
//! [`Query`] and [`QueryExt`] provide the fluent builder used by the
//! repository:
//!
//! ```ignore
//! use ragstore::graph::QueryExt;
//!
//! let rows = client
//!     .query("MATCH (n:Document) RETURN n.id AS id")
//!     .fetch_all()
//!     .await?;
//! ```
//!
//! The Neo4j backend lives in [`backends::neo4j`]; unit tests substitute a
//! mock executor since both traits are object-safe seams.

mod executor;
mod query;
mod row;

pub mod backends;

pub use executor::{GraphClient, QueryExecutor};
pub use query::{Query, QueryExt};
pub use row::{Params, Row};
