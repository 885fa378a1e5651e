//! Typed domain records stored in the property graph.

mod document;
mod entity;
mod node;
mod relationship;

pub use document::{Chunk, Document};
pub use entity::Entity;
pub use node::{generate_ulid, Direction, Node};
pub use relationship::Relationship;
