//! High-level repository over the graph execution layer.
//!
//! [`GraphRepository`] exposes the operations callers actually use:
//! upserts for documents, chunks, entities, generic nodes and
//! relationships, id lookups, neighbor traversal, property search and
//! cascading document deletion. Every write is an idempotent merge on id:
//! the first write creates the record and stamps `created_at`, later
//! writes overwrite the payload and refresh `updated_at` only.
//!
//! Labels and edge kinds are interpolated after escaping; all values are
//! bound parameters. Missing lookups come back as `None`, empty vectors
//! or `false` - only precondition violations (`add_chunk` without its
//! parent, `add_relationship` with a missing endpoint) and infrastructure
//! failures are errors.

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::error::GraphError;
use crate::graph::{GraphClient, QueryExt, Row};
use crate::marshal;
use crate::models::{generate_ulid, Chunk, Direction, Document, Entity, Node, Relationship};

/// Repository facade bound to one graph client.
///
/// Generic over [`GraphClient`] so unit tests can substitute a mock
/// executor and assert on the exact queries issued.
pub struct GraphRepository<C: GraphClient> {
    client: C,
}

impl<C: GraphClient> GraphRepository<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// The underlying client, e.g. for ad-hoc queries.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Opens the persistent connection. Safe to call more than once.
    pub async fn connect(&self) -> Result<(), GraphError> {
        self.client.connect().await
    }

    /// Closes the persistent connection, if any.
    pub async fn close(&self) {
        self.client.close().await;
    }

    // -- writes -------------------------------------------------------------

    /// Upserts a document by id.
    pub async fn add_document(&self, document: &Document) -> Result<(), GraphError> {
        self.client
            .query(&upsert_node_cypher(marshal::DOCUMENT_LABEL))
            .param("id", &document.id)
            .param_raw("props", marshal::document_to_props(document))
            .param("now", now_rfc3339())
            .run()
            .await
    }

    /// Upserts a chunk and links it to its parent document with a
    /// `CONTAINS` edge.
    ///
    /// The parent must already exist; otherwise nothing is written and
    /// [`GraphError::DocumentNotFound`] is returned. A chunk has exactly
    /// one owner: re-ingesting an id under a different document moves it
    /// there, dropping any `CONTAINS` edge from a previous parent in the
    /// same statement.
    pub async fn add_chunk(&self, chunk: &Chunk) -> Result<(), GraphError> {
        let cypher = format!(
            "MATCH (d:{doc} {{id: $document_id}})\n\
             MERGE (c:{chunk} {{id: $id}})\n\
             ON CREATE SET c.created_at = $now\n\
             SET c += $props, c.updated_at = $now\n\
             MERGE (d)-[r:{contains}]->(c)\n\
             ON CREATE SET r.id = $edge_id, r.created_at = $now\n\
             SET r.updated_at = $now\n\
             WITH d, c\n\
             OPTIONAL MATCH (other:{doc})-[stale:{contains}]->(c)\n\
             WHERE other.id <> d.id\n\
             DELETE stale\n\
             RETURN DISTINCT c.id AS id",
            doc = marshal::escape_identifier(marshal::DOCUMENT_LABEL),
            chunk = marshal::escape_identifier(marshal::CHUNK_LABEL),
            contains = marshal::escape_identifier(marshal::CONTAINS_KIND),
        );

        let row = self
            .client
            .query(&cypher)
            .param("id", &chunk.id)
            .param("document_id", &chunk.document_id)
            .param_raw("props", marshal::chunk_to_props(chunk))
            .param("edge_id", generate_ulid())
            .param("now", now_rfc3339())
            .fetch_one()
            .await?;

        match row {
            Some(_) => Ok(()),
            None => Err(GraphError::DocumentNotFound(chunk.document_id.clone())),
        }
    }

    /// Upserts an entity by id.
    pub async fn add_entity(&self, entity: &Entity) -> Result<(), GraphError> {
        self.client
            .query(&upsert_node_cypher(marshal::ENTITY_LABEL))
            .param("id", &entity.id)
            .param_raw("props", marshal::entity_to_props(entity))
            .param("now", now_rfc3339())
            .run()
            .await
    }

    /// Upserts a generic node under its own kind as label.
    pub async fn add_node(&self, node: &Node) -> Result<(), GraphError> {
        self.client
            .query(&upsert_node_cypher(&node.kind))
            .param("id", &node.id)
            .param_raw("props", marshal::node_to_props(node))
            .param("now", now_rfc3339())
            .run()
            .await
    }

    /// Bulk-upserts nodes, one `UNWIND` batch per kind.
    ///
    /// Labels cannot be parameterized, so mixed-kind input is grouped by
    /// kind (first-seen order) and written as one batch per group. Returns
    /// the total number of nodes written.
    pub async fn add_nodes(&self, nodes: &[Node]) -> Result<usize, GraphError> {
        if nodes.is_empty() {
            return Ok(0);
        }

        let mut groups: Vec<(&str, Vec<Value>)> = Vec::new();
        for node in nodes {
            let row = json!({ "id": node.id, "props": marshal::node_to_props(node) });
            match groups.iter_mut().find(|(kind, _)| *kind == node.kind) {
                Some((_, rows)) => rows.push(row),
                None => groups.push((&node.kind, vec![row])),
            }
        }

        let now = now_rfc3339();
        let mut total = 0usize;
        for (kind, rows) in groups {
            let cypher = format!(
                "UNWIND $rows AS row\n\
                 MERGE (n:{label} {{id: row.id}})\n\
                 ON CREATE SET n.created_at = $now\n\
                 SET n += row.props, n.updated_at = $now\n\
                 RETURN count(n) AS upserted",
                label = marshal::escape_identifier(kind),
            );
            let batch = rows.len();
            let row = self
                .client
                .query(&cypher)
                .param_raw("rows", Value::Array(rows))
                .param("now", now.clone())
                .fetch_one()
                .await?;
            let upserted = match row {
                Some(row) => row.get::<i64>("upserted")?.max(0) as usize,
                None => batch,
            };
            tracing::debug!(kind, upserted, "bulk node upsert");
            total += upserted;
        }
        Ok(total)
    }

    /// Upserts a directed relationship by id between two existing nodes.
    ///
    /// Returns [`GraphError::EndpointNotFound`] when either endpoint is
    /// missing; nothing is written in that case.
    pub async fn add_relationship(&self, relationship: &Relationship) -> Result<(), GraphError> {
        let cypher = format!(
            "MATCH (a {{id: $source_id}})\n\
             MATCH (b {{id: $target_id}})\n\
             MERGE (a)-[r:{kind} {{id: $id}}]->(b)\n\
             ON CREATE SET r.created_at = $now\n\
             SET r += $props, r.updated_at = $now\n\
             RETURN r.id AS id",
            kind = marshal::escape_identifier(&relationship.kind),
        );

        let row = self
            .client
            .query(&cypher)
            .param("id", &relationship.id)
            .param("source_id", &relationship.source_id)
            .param("target_id", &relationship.target_id)
            .param_raw("props", marshal::relationship_to_props(relationship))
            .param("now", now_rfc3339())
            .fetch_one()
            .await?;

        match row {
            Some(_) => Ok(()),
            None => Err(GraphError::EndpointNotFound {
                kind: relationship.kind.clone(),
                source_id: relationship.source_id.clone(),
                target_id: relationship.target_id.clone(),
            }),
        }
    }

    // -- lookups ------------------------------------------------------------

    /// Looks a node up by id across all labels.
    pub async fn get_node_by_id(&self, id: &str) -> Result<Option<Node>, GraphError> {
        let row = self
            .client
            .query(
                "MATCH (n {id: $id})\n\
                 RETURN labels(n) AS labels, properties(n) AS props\n\
                 LIMIT 1",
            )
            .param("id", id)
            .fetch_one()
            .await?;
        match row {
            Some(row) => decode_node(&row),
            None => Ok(None),
        }
    }

    /// Looks an entity up by id.
    pub async fn get_entity_by_id(&self, id: &str) -> Result<Option<Entity>, GraphError> {
        let cypher = format!(
            "MATCH (n:{label} {{id: $id}})\n\
             RETURN properties(n) AS props\n\
             LIMIT 1",
            label = marshal::escape_identifier(marshal::ENTITY_LABEL),
        );
        let row = self.client.query(&cypher).param("id", id).fetch_one().await?;
        match row {
            Some(row) => Ok(marshal::entity_from_graph(row.get("props")?)),
            None => Ok(None),
        }
    }

    /// Looks a document up by id.
    pub async fn get_document_by_id(&self, id: &str) -> Result<Option<Document>, GraphError> {
        let cypher = format!(
            "MATCH (d:{label} {{id: $id}})\n\
             RETURN properties(d) AS props\n\
             LIMIT 1",
            label = marshal::escape_identifier(marshal::DOCUMENT_LABEL),
        );
        let row = self.client.query(&cypher).param("id", id).fetch_one().await?;
        match row {
            Some(row) => Ok(marshal::document_from_graph(row.get("props")?)),
            None => Ok(None),
        }
    }

    /// Looks a chunk up by id.
    pub async fn get_chunk_by_id(&self, id: &str) -> Result<Option<Chunk>, GraphError> {
        let cypher = format!(
            "MATCH (c:{label} {{id: $id}})\n\
             RETURN properties(c) AS props\n\
             LIMIT 1",
            label = marshal::escape_identifier(marshal::CHUNK_LABEL),
        );
        let row = self.client.query(&cypher).param("id", id).fetch_one().await?;
        match row {
            Some(row) => Ok(marshal::chunk_from_graph(row.get("props")?)),
            None => Ok(None),
        }
    }

    /// All chunks owned by a document, ordered by chunk id. Empty when
    /// the document does not exist or has no chunks.
    pub async fn get_chunks_by_document_id(&self, id: &str) -> Result<Vec<Chunk>, GraphError> {
        let cypher = format!(
            "MATCH (d:{doc} {{id: $id}})-[:{contains}]->(c:{chunk})\n\
             RETURN properties(c) AS props\n\
             ORDER BY c.id",
            doc = marshal::escape_identifier(marshal::DOCUMENT_LABEL),
            contains = marshal::escape_identifier(marshal::CONTAINS_KIND),
            chunk = marshal::escape_identifier(marshal::CHUNK_LABEL),
        );
        let rows = self.client.query(&cypher).param("id", id).fetch_all().await?;

        let mut chunks = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(chunk) = marshal::chunk_from_graph(row.get("props")?) {
                chunks.push(chunk);
            }
        }
        Ok(chunks)
    }

    // -- traversal ----------------------------------------------------------

    /// One-hop neighbors of a node, optionally filtered by edge kind.
    ///
    /// Returns the deduplicated neighbor nodes and the deduplicated edges
    /// that connect them, both keyed by id. Edge direction in the result
    /// always reflects stored direction, regardless of traversal
    /// direction. An unknown start id yields empty vectors.
    pub async fn get_neighbors(
        &self,
        id: &str,
        kinds: Option<&[&str]>,
        direction: Direction,
    ) -> Result<(Vec<Node>, Vec<Relationship>), GraphError> {
        let pattern = match direction {
            Direction::Outgoing => "-[r]->",
            Direction::Incoming => "<-[r]-",
            Direction::Both => "-[r]-",
        };
        let filter = if kinds.is_some() {
            "\nWHERE type(r) IN $kinds"
        } else {
            ""
        };
        let cypher = format!(
            "MATCH (n {{id: $id}}){pattern}(m){filter}\n\
             RETURN labels(m) AS labels, properties(m) AS props,\n\
                    type(r) AS rel_kind, properties(r) AS rel_props,\n\
                    startNode(r).id AS rel_source_id, endNode(r).id AS rel_target_id",
        );

        let mut query = self.client.query(&cypher).param("id", id);
        if let Some(kinds) = kinds {
            query = query.param("kinds", kinds);
        }
        let rows = query.fetch_all().await?;

        let mut nodes: Vec<Node> = Vec::new();
        let mut edges: Vec<Relationship> = Vec::new();
        for row in rows {
            if let Some(node) = decode_node(&row)? {
                if !nodes.iter().any(|n| n.id == node.id) {
                    nodes.push(node);
                }
            }
            if let Some(edge) = decode_relationship(&row)? {
                if !edges.iter().any(|e| e.id == edge.id) {
                    edges.push(edge);
                }
            }
        }
        Ok((nodes, edges))
    }

    // -- search -------------------------------------------------------------

    /// Equality search over node properties.
    ///
    /// Every filter entry must match exactly; `kind` restricts the label
    /// when given. An empty filter matches all nodes of the kind;
    /// `limit: None` returns every match.
    pub async fn search_nodes_by_properties(
        &self,
        kind: Option<&str>,
        filter: &Map<String, Value>,
        limit: Option<usize>,
    ) -> Result<Vec<Node>, GraphError> {
        let rows = self.search_rows(kind, filter, limit).await?;
        let mut nodes = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(node) = decode_node(&row)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Equality search restricted to entities.
    pub async fn search_entities_by_properties(
        &self,
        filter: &Map<String, Value>,
        limit: Option<usize>,
    ) -> Result<Vec<Entity>, GraphError> {
        let rows = self
            .search_rows(Some(marshal::ENTITY_LABEL), filter, limit)
            .await?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(entity) = marshal::entity_from_graph(row.get("props")?) {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    async fn search_rows(
        &self,
        kind: Option<&str>,
        filter: &Map<String, Value>,
        limit: Option<usize>,
    ) -> Result<Vec<Row>, GraphError> {
        let target = match kind {
            Some(kind) => format!("(n:{})", marshal::escape_identifier(kind)),
            None => "(n)".to_string(),
        };

        // Keys are interpolated (escaped), values stay bound parameters
        // encoded the same way they were stored.
        let mut conditions = Vec::with_capacity(filter.len());
        let mut bound = Vec::with_capacity(filter.len());
        for (i, (key, value)) in filter.iter().enumerate() {
            conditions.push(format!(
                "n.{} = $p{}",
                marshal::escape_identifier(key),
                i
            ));
            bound.push(marshal::encode_property(value));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("\nWHERE {}", conditions.join(" AND "))
        };

        let limit_clause = if limit.is_some() { "\nLIMIT $limit" } else { "" };
        let cypher = format!(
            "MATCH {target}{where_clause}\n\
             RETURN labels(n) AS labels, properties(n) AS props{limit_clause}",
        );

        let mut query = self.client.query(&cypher);
        if let Some(limit) = limit {
            query = query.param("limit", limit as i64);
        }
        for (i, value) in bound.into_iter().enumerate() {
            query = query.param_raw(&format!("p{}", i), value);
        }
        query.fetch_all().await
    }

    // -- deletion and counting ----------------------------------------------

    /// Deletes a document and every chunk it contains, detaching all
    /// their edges. Returns whether the document existed.
    pub async fn delete_document(&self, id: &str) -> Result<bool, GraphError> {
        let cypher = format!(
            "MATCH (d:{doc} {{id: $id}})\n\
             OPTIONAL MATCH (d)-[:{contains}]->(c:{chunk})\n\
             DETACH DELETE d, c\n\
             RETURN count(DISTINCT d) AS deleted",
            doc = marshal::escape_identifier(marshal::DOCUMENT_LABEL),
            contains = marshal::escape_identifier(marshal::CONTAINS_KIND),
            chunk = marshal::escape_identifier(marshal::CHUNK_LABEL),
        );
        let row = self.client.query(&cypher).param("id", id).fetch_one().await?;
        let deleted = match row {
            Some(row) => row.get::<i64>("deleted")? > 0,
            None => false,
        };
        tracing::debug!(id, deleted, "delete document");
        Ok(deleted)
    }

    /// Counts nodes, optionally restricted to one kind.
    pub async fn count_nodes(&self, kind: Option<&str>) -> Result<u64, GraphError> {
        let target = match kind {
            Some(kind) => format!("(n:{})", marshal::escape_identifier(kind)),
            None => "(n)".to_string(),
        };
        let cypher = format!("MATCH {target} RETURN count(n) AS count");
        let row = self.client.query(&cypher).fetch_one().await?;
        match row {
            Some(row) => Ok(row.get::<i64>("count")?.max(0) as u64),
            None => Ok(0),
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn upsert_node_cypher(label: &str) -> String {
    format!(
        "MERGE (n:{label} {{id: $id}})\n\
         ON CREATE SET n.created_at = $now\n\
         SET n += $props, n.updated_at = $now\n\
         RETURN n.id AS id",
        label = marshal::escape_identifier(label),
    )
}

fn decode_node(row: &Row) -> Result<Option<Node>, GraphError> {
    let labels: Vec<String> = row.get("labels")?;
    let props: Map<String, Value> = row.get("props")?;
    Ok(marshal::node_from_graph(&labels, props))
}

fn decode_relationship(row: &Row) -> Result<Option<Relationship>, GraphError> {
    let kind: String = row.get("rel_kind")?;
    let props: Map<String, Value> = row.get("rel_props")?;
    let source_id: Option<String> = row.get_opt("rel_source_id")?;
    let target_id: Option<String> = row.get_opt("rel_target_id")?;
    match (source_id, target_id) {
        (Some(source_id), Some(target_id)) => {
            Ok(marshal::relationship_from_graph(kind, source_id, target_id, props))
        }
        _ => {
            tracing::warn!(kind, "skipping relationship with unidentified endpoint");
            Ok(None)
        }
    }
}
