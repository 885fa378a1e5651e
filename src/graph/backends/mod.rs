//! Database backends implementing the graph execution traits.
//!
//! Only Neo4j (Bolt) is implemented. The trait seam keeps the repository
//! testable without a running database and leaves room for other
//! Cypher-speaking stores.

pub mod neo4j;

pub use neo4j::Neo4jClient;
