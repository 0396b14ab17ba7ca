//! Read operations against the inventory graph.

use inventory_core::{DataView, Direction, Shape, WellKnown};
use inventory_engine::Filter;

use crate::client::{column, GraphClient, GraphError};
use crate::cypher::{compile_filters, CypherQuery, Param, CHILD, DATA, ENTITY, RELATES};
use crate::records::DataRow;

/// An edge with both of its ends.
#[derive(Debug, Clone)]
pub struct EdgeRow {
    pub id: String,
    pub label: String,
    pub properties: Option<String>,
    pub source: String,
    pub source_is_entity: bool,
    pub target: String,
    pub target_is_entity: bool,
}

/// Position of a child below a structured-data node.
#[derive(Debug, Clone, Copy)]
pub enum ChildSlot<'a> {
    Key(&'a str),
    Index(usize),
}

impl GraphClient {
    // ── Resolution ───────────────────────────────────────────────

    /// Element ids of the entities one AND-sequence reaches from `start`
    /// (every entity when `None`).
    pub async fn resolve_filters(
        &self,
        start: Option<&[String]>,
        filters: &[Filter],
    ) -> Result<Vec<String>, GraphError> {
        let rows = self.fetch(compile_filters(start, filters)).await?;
        rows.iter().map(|row| column::<String>(row, "eid")).collect()
    }

    // ── Entity Lookups ───────────────────────────────────────────

    /// The stored JSON body of an entity node.
    pub async fn entity_body(&self, element_id: &str) -> Result<Option<String>, GraphError> {
        self.entity_column(element_id, "body").await
    }

    pub async fn entity_path(&self, element_id: &str) -> Result<Option<String>, GraphError> {
        self.entity_column(element_id, "path").await
    }

    async fn entity_column(
        &self,
        element_id: &str,
        name: &str,
    ) -> Result<Option<String>, GraphError> {
        let statement = CypherQuery::new(format!(
            "MATCH (n:{ENTITY}) WHERE elementId(n) = $eid
             RETURN n.{name} AS value"
        ))
        .param("eid", Param::Text(element_id.to_string()));

        match self.fetch(statement).await?.first() {
            Some(row) => Ok(Some(column(row, "value")?)),
            None => Ok(None),
        }
    }

    // ── Edges ────────────────────────────────────────────────────

    pub async fn edge_row(&self, element_id: &str) -> Result<Option<EdgeRow>, GraphError> {
        let statement = CypherQuery::new(format!(
            "MATCH (a)-[r:{RELATES}]->(b) WHERE elementId(r) = $eid
             RETURN r.id AS id, r.label AS label, r.props AS props,
                    elementId(a) AS source, a:{ENTITY} AS source_entity,
                    elementId(b) AS target, b:{ENTITY} AS target_entity"
        ))
        .param("eid", Param::Text(element_id.to_string()));

        let rows = self.fetch(statement).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        Ok(Some(EdgeRow {
            id: column(row, "id")?,
            label: column(row, "label")?,
            properties: column(row, "props")?,
            source: column(row, "source")?,
            source_is_entity: column(row, "source_entity")?,
            target: column(row, "target")?,
            target_is_entity: column(row, "target_entity")?,
        }))
    }

    /// Edges incident to a node. Without a label only entity-to-entity edges qualify.
    pub async fn incident_edges(
        &self,
        element_id: &str,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<String>, GraphError> {
        let pattern = match direction {
            Direction::Outgoing => format!("(a)-[r:{RELATES}]->(b)"),
            Direction::Incoming => format!("(a)<-[r:{RELATES}]-(b)"),
            Direction::Both => format!("(a)-[r:{RELATES}]-(b)"),
        };
        let mut statement = CypherQuery::new(format!(
            "MATCH {pattern} WHERE elementId(a) = $eid{}
             RETURN DISTINCT elementId(r) AS eid, r.id AS id ORDER BY id",
            match label {
                Some(_) => " AND r.label = $label".to_string(),
                None => format!(" AND a:{ENTITY} AND b:{ENTITY}"),
            }
        ))
        .param("eid", Param::Text(element_id.to_string()));
        if let Some(label) = label {
            statement = statement.param("label", Param::Text(label.to_string()));
        }

        let rows = self.fetch(statement).await?;
        rows.iter().map(|row| column::<String>(row, "eid")).collect()
    }

    // ── Structured Data ──────────────────────────────────────────

    /// Root of the data tree hanging off a data entity's `hasData` edge.
    pub async fn has_data_root(&self, element_id: &str) -> Result<Option<String>, GraphError> {
        let statement = CypherQuery::new(format!(
            "MATCH (e:{ENTITY})-[:{RELATES} {{label: $label}}]->(d:{DATA})
             WHERE elementId(e) = $eid
             RETURN elementId(d) AS eid LIMIT 1"
        ))
        .param("eid", Param::Text(element_id.to_string()))
        .param("label", Param::Text(WellKnown::HasData.name().to_string()));

        match self.fetch(statement).await?.first() {
            Some(row) => Ok(Some(column(row, "eid")?)),
            None => Ok(None),
        }
    }

    /// The child of a data node at `slot`, if the node is a container of the matching shape.
    pub async fn data_child(
        &self,
        element_id: &str,
        slot: ChildSlot<'_>,
    ) -> Result<Option<String>, GraphError> {
        let (shape, condition, value) = match slot {
            ChildSlot::Key(key) => (Shape::Map, "c.key = $slot", Param::Text(key.to_string())),
            ChildSlot::Index(index) => (Shape::List, "c.idx = $slot", Param::Integer(index as i64)),
        };
        let statement = CypherQuery::new(format!(
            "MATCH (p:{DATA})-[c:`{CHILD}`]->(d:{DATA})
             WHERE elementId(p) = $eid AND p.shape = $shape AND {condition}
             RETURN elementId(d) AS eid LIMIT 1"
        ))
        .param("eid", Param::Text(element_id.to_string()))
        .param("shape", Param::Text(shape.name().to_string()))
        .param("slot", value);

        match self.fetch(statement).await?.first() {
            Some(row) => Ok(Some(column(row, "eid")?)),
            None => Ok(None),
        }
    }

    /// Rows for the tree below a data node: everything for a deep view,
    /// the node and its direct children for a shallow one.
    pub async fn data_rows(
        &self,
        element_id: &str,
        view: DataView,
    ) -> Result<Vec<DataRow>, GraphError> {
        let depth = match view {
            DataView::Deep => "",
            DataView::Shallow => "1",
        };
        let statement = CypherQuery::new(format!(
            "MATCH (root:{DATA}) WHERE elementId(root) = $eid
             MATCH (root)-[:`{CHILD}`*0..{depth}]->(d:{DATA})
             OPTIONAL MATCH (parent:{DATA})-[c:`{CHILD}`]->(d)
             RETURN elementId(d) AS eid, d.shape AS shape, d.value AS value,
                    elementId(parent) AS parent, c.key AS key, c.idx AS idx"
        ))
        .param("eid", Param::Text(element_id.to_string()));

        let rows = self.fetch(statement).await?;
        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            let shape: String = column(row, "shape")?;
            result.push(DataRow {
                element_id: column(row, "eid")?,
                shape: shape
                    .parse::<Shape>()
                    .map_err(|e| GraphError::Serialization(e.to_string()))?,
                value: column::<Option<String>>(row, "value")?.unwrap_or_default(),
                parent: column(row, "parent")?,
                key: column(row, "key")?,
                idx: column::<Option<i64>>(row, "idx")?.unwrap_or(-1),
            });
        }
        Ok(result)
    }
}
