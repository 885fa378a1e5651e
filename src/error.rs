//! Error types for the graph repository layer.

use thiserror::Error;

/// Errors produced by the graph repository layer.
///
/// Infrastructure failures (driver, query) propagate to the caller after
/// cleanup; domain precondition failures get their own variants so callers
/// can tell bad input apart from a broken database. Not-found lookups are
/// never errors - they surface as `None`, empty collections or `false`.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Error raised by the Neo4j driver (connection or protocol level).
    #[error("Neo4j driver error: {0}")]
    Driver(#[from] neo4rs::Error),

    /// A query failed during execution or fetch. The transaction has
    /// already been rolled back when this is returned.
    #[error("query failed: {message}")]
    Query { message: String, query: String },

    /// `add_chunk` was called for a document that does not exist.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// `add_relationship` referenced a source or target node that does
    /// not exist.
    #[error("relationship {kind} endpoint missing: {source_id} -> {target_id}")]
    EndpointNotFound {
        kind: String,
        source_id: String,
        target_id: String,
    },

    /// Configuration could not be loaded or was malformed.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Row decoding or other internal invariant failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Whether a driver error is worth retrying during connection establishment.
///
/// Only connection-level faults qualify: refused/broken connections and
/// I/O errors. Authentication and configuration failures are permanent and
/// propagate immediately. Query execution errors are never retried at all.
pub fn is_transient(err: &neo4rs::Error) -> bool {
    matches!(
        err,
        neo4rs::Error::ConnectionError | neo4rs::Error::IOError { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_transient() {
        assert!(is_transient(&neo4rs::Error::ConnectionError));
    }

    #[test]
    fn auth_errors_are_permanent() {
        assert!(!is_transient(&neo4rs::Error::AuthenticationError(
            "bad credentials".to_string()
        )));
    }

    #[test]
    fn endpoint_not_found_formats_both_ids() {
        let err = GraphError::EndpointNotFound {
            kind: "MENTIONS".to_string(),
            source_id: "c1".to_string(),
            target_id: "e1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("c1"));
        assert!(msg.contains("e1"));
        assert!(msg.contains("MENTIONS"));
    }
}
