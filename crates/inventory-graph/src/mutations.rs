//! Write operations for the inventory graph.
//!
//! Entity nodes are created with MERGE on their path plus a creation token, so
//! a second writer for the same path learns that it lost instead of silently
//! overwriting. Structured-data trees are written in one statement.

use std::collections::HashMap;

use neo4rs::query;
use tracing::info;

use inventory_core::{EntityKind, StructuredData};

use crate::client::{column, GraphClient, GraphError};
use crate::cypher::{create_tree, CypherQuery, Param, CHILD, DATA, ENTITY, RELATES};

/// Constraints and indexes the backend relies on.
const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT entity_path IF NOT EXISTS FOR (n:Entity) REQUIRE n.path IS UNIQUE",
    "CREATE INDEX entity_id IF NOT EXISTS FOR (n:Entity) ON (n.id)",
    "CREATE INDEX entity_kind IF NOT EXISTS FOR (n:Entity) ON (n.kind)",
];

impl GraphClient {
    // ── Schema ───────────────────────────────────────────────────

    /// Create constraints and indexes. Safe to run repeatedly.
    pub async fn ensure_schema(&self) -> Result<(), GraphError> {
        for statement in SCHEMA_STATEMENTS {
            self.run(query(statement)).await?;
        }
        info!(statements = SCHEMA_STATEMENTS.len(), "Neo4j schema ensured");
        Ok(())
    }

    // ── Entity Nodes ─────────────────────────────────────────────

    /// Create the entity node for `record["path"]` unless one exists.
    ///
    /// Returns the node's element id and whether this call created it.
    pub async fn merge_entity(
        &self,
        kind: EntityKind,
        record: HashMap<String, String>,
    ) -> Result<(String, bool), GraphError> {
        let path = record.get("path").cloned().unwrap_or_default();
        let token = record.get("token").cloned().unwrap_or_default();
        let statement = CypherQuery::new(format!(
            "MERGE (n:{ENTITY} {{path: $path}})
             ON CREATE SET n = $record, n:{}
             RETURN elementId(n) AS eid, n.token = $token AS created",
            kind.label()
        ))
        .param("path", Param::Text(path.clone()))
        .param("token", Param::Text(token))
        .param("record", Param::Map(record));

        let rows = self.fetch(statement).await?;
        let row = rows.first().ok_or_else(|| GraphError::NotFound {
            what: "merged entity".to_string(),
            element_id: path,
        })?;
        Ok((column(row, "eid")?, column(row, "created")?))
    }

    /// Overwrite every stored attribute of an entity node. False if it does not exist.
    pub async fn replace_entity(
        &self,
        element_id: &str,
        record: HashMap<String, String>,
    ) -> Result<bool, GraphError> {
        let statement = CypherQuery::new(format!(
            "MATCH (n:{ENTITY}) WHERE elementId(n) = $eid
             SET n = $record
             RETURN elementId(n) AS eid"
        ))
        .param("eid", Param::Text(element_id.to_string()))
        .param("record", Param::Map(record));

        Ok(!self.fetch(statement).await?.is_empty())
    }

    // ── Structured Data ──────────────────────────────────────────

    /// Store a whole data tree and return the element id of its root.
    pub async fn store_tree(&self, value: &StructuredData) -> Result<String, GraphError> {
        let rows = self.fetch(create_tree(value)).await?;
        let row = rows.first().ok_or_else(|| {
            GraphError::Serialization("data tree creation returned no root".to_string())
        })?;
        column(row, "eid")
    }

    /// Delete a data node and everything below it. Returns the number of nodes removed.
    pub async fn delete_tree(&self, element_id: &str) -> Result<i64, GraphError> {
        let statement = CypherQuery::new(format!(
            "MATCH (root:{DATA}) WHERE elementId(root) = $eid
             MATCH (root)-[:`{CHILD}`*0..]->(d:{DATA})
             DETACH DELETE d
             RETURN count(d) AS cnt"
        ))
        .param("eid", Param::Text(element_id.to_string()));

        match self.fetch(statement).await?.first() {
            Some(row) => Ok(column::<i64>(row, "cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }

    // ── Edges ────────────────────────────────────────────────────

    /// Create a labelled edge. `None` if either end does not exist.
    pub async fn create_edge(
        &self,
        source: &str,
        target: &str,
        id: &str,
        label: &str,
        properties: String,
    ) -> Result<Option<String>, GraphError> {
        let statement = CypherQuery::new(format!(
            "MATCH (a) WHERE elementId(a) = $source
             MATCH (b) WHERE elementId(b) = $target
             CREATE (a)-[r:{RELATES} {{id: $id, label: $label, props: $props}}]->(b)
             RETURN elementId(r) AS eid"
        ))
        .param("source", Param::Text(source.to_string()))
        .param("target", Param::Text(target.to_string()))
        .param("id", Param::Text(id.to_string()))
        .param("label", Param::Text(label.to_string()))
        .param("props", Param::Text(properties));

        match self.fetch(statement).await?.first() {
            Some(row) => Ok(Some(column(row, "eid")?)),
            None => Ok(None),
        }
    }

    pub async fn delete_edge(&self, element_id: &str) -> Result<i64, GraphError> {
        let statement = CypherQuery::new(
            "MATCH ()-[r]->() WHERE elementId(r) = $eid
             DELETE r
             RETURN count(r) AS cnt",
        )
        .param("eid", Param::Text(element_id.to_string()));

        match self.fetch(statement).await?.first() {
            Some(row) => Ok(column::<i64>(row, "cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Delete an entity node with all its incident edges.
    pub async fn delete_entity(&self, element_id: &str) -> Result<i64, GraphError> {
        let statement = CypherQuery::new(format!(
            "MATCH (n:{ENTITY}) WHERE elementId(n) = $eid
             DETACH DELETE n
             RETURN count(n) AS cnt"
        ))
        .param("eid", Param::Text(element_id.to_string()));

        match self.fetch(statement).await?.first() {
            Some(row) => Ok(column::<i64>(row, "cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }
}
