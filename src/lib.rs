//! Graph repository layer for retrieval pipelines backed by Neo4j.
//!
//! Stores documents, their chunks, extracted entities and typed
//! relationships in a property graph and exposes idempotent upserts, id
//! lookups, neighbor traversal, property search and cascading deletion on
//! top of a single-query-per-transaction execution layer.
//!
//! ```ignore
//! use ragstore::config::Config;
//! use ragstore::graph::backends::Neo4jClient;
//! use ragstore::models::{Chunk, Document};
//! use ragstore::repository::GraphRepository;
//!
//! let config = Config::load()?;
//! let repo = GraphRepository::new(Neo4jClient::new(config.graph));
//! repo.connect().await?;
//!
//! repo.add_document(&Document::new("d1", "full text")).await?;
//! repo.add_chunk(&Chunk::new("c1", "d1", "first fragment")).await?;
//!
//! let chunks = repo.get_chunks_by_document_id("d1").await?;
//! assert_eq!(chunks.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod marshal;
pub mod models;
pub mod repository;

pub use error::GraphError;
pub use repository::GraphRepository;
