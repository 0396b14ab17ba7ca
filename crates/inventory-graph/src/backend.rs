//! The engine's [`Backend`] contract over Neo4j.

use std::collections::HashSet;

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use inventory_core::{
    CanonicalPath, DataView, Direction, Entity, EntityKind, InventoryError, Properties,
    RelativePath, RelativeSegment, Relationship, Result, StructuredData,
};
use inventory_engine::{Backend, FilterPath};

use crate::client::{GraphClient, GraphConfig};
use crate::queries::ChildSlot;
use crate::records::{assemble, decode_entity, decode_properties, entity_record, GraphElement};

pub(crate) const NAME: &str = "neo4j";

fn not_a(expected: &str, element: &GraphElement) -> InventoryError {
    InventoryError::Conversion {
        expected: expected.to_string(),
        actual: format!("{element:?}"),
    }
}

fn missing(what: &str, element_id: &str) -> InventoryError {
    InventoryError::backend(NAME, anyhow!("{what} {element_id} does not exist"))
}

/// Stores the inventory in Neo4j.
#[derive(Clone)]
pub struct Neo4jBackend {
    client: GraphClient,
}

impl Neo4jBackend {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Connect and make sure the schema is in place.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let client = GraphClient::connect(config).await?;
        client.ensure_schema().await?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }

    /// Decode an entity node, filling a data entity's value from its tree.
    async fn load(&self, element_id: &str) -> Result<Entity> {
        let body = self
            .client
            .entity_body(element_id)
            .await?
            .ok_or_else(|| missing("entity", element_id))?;
        let mut entity = decode_entity(&body)?;

        if let Entity::DataEntity(data) = &mut entity {
            if let Some(root) = self.client.has_data_root(element_id).await? {
                data.value = self.read_tree(&root, DataView::Deep).await?;
            }
        }
        Ok(entity)
    }

    async fn read_tree(&self, root: &str, view: DataView) -> Result<StructuredData> {
        let rows = self.client.data_rows(root, view).await?;
        assemble(root, &rows, view)
    }

    fn entity_id<'a>(&self, element: &'a GraphElement) -> Result<&'a str> {
        match element {
            GraphElement::Entity(id) => Ok(id),
            other => Err(not_a("entity", other)),
        }
    }
}

#[async_trait]
impl Backend for Neo4jBackend {
    type Element = GraphElement;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn resolve(&self, path: &FilterPath) -> Result<Vec<GraphElement>> {
        let mut current: Option<Vec<String>> = None;

        for step in path.steps() {
            if current.as_ref().is_some_and(Vec::is_empty) {
                return Ok(Vec::new());
            }
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for alternative in step.alternatives() {
                for eid in self
                    .client
                    .resolve_filters(current.as_deref(), alternative)
                    .await?
                {
                    if seen.insert(eid.clone()) {
                        next.push(eid);
                    }
                }
            }
            current = Some(next);
        }

        let reached = match current {
            Some(reached) => reached,
            None => self.client.resolve_filters(None, &[]).await?,
        };
        Ok(reached.into_iter().map(GraphElement::Entity).collect())
    }

    async fn convert(&self, element: &GraphElement, kind: EntityKind) -> Result<Entity> {
        let GraphElement::Entity(id) = element else {
            return Err(not_a(kind.label(), element));
        };
        let entity = self.load(id).await?;
        if entity.kind() != kind {
            return Err(InventoryError::Conversion {
                expected: kind.to_string(),
                actual: entity.kind().to_string(),
            });
        }
        Ok(entity)
    }

    async fn convert_relationship(&self, edge: &GraphElement) -> Result<Relationship> {
        let GraphElement::Edge(id) = edge else {
            return Err(not_a("relationship", edge));
        };
        let row = self
            .client
            .edge_row(id)
            .await?
            .ok_or_else(|| missing("edge", id))?;
        if !row.source_is_entity || !row.target_is_entity {
            return Err(InventoryError::Conversion {
                expected: "relationship between entities".to_string(),
                actual: row.label,
            });
        }

        Ok(Relationship {
            source: self.load(&row.source).await?,
            target: self.load(&row.target).await?,
            properties: decode_properties(row.properties.as_deref())?,
            id: row.id,
            label: row.label,
        })
    }

    async fn convert_data(&self, node: &GraphElement, view: DataView) -> Result<StructuredData> {
        match node {
            GraphElement::Data(id) => self.read_tree(id, view).await,
            other => Err(not_a("structured data", other)),
        }
    }

    async fn persist(&self, entity: &Entity) -> Result<GraphElement> {
        let token = Uuid::new_v4().to_string();
        let record = entity_record(entity, &token)?;
        let (eid, created) = self.client.merge_entity(entity.kind(), record).await?;
        if !created {
            return Err(InventoryError::EntityAlreadyExists {
                kind: entity.kind(),
                path: entity.path().to_string(),
            });
        }
        debug!(path = %entity.path(), "Entity node stored");
        Ok(GraphElement::Entity(eid))
    }

    async fn persist_data(&self, value: &StructuredData) -> Result<GraphElement> {
        Ok(GraphElement::Data(self.client.store_tree(value).await?))
    }

    async fn update(&self, element: &GraphElement, entity: &Entity) -> Result<()> {
        let id = self.entity_id(element)?;
        let current = self
            .client
            .entity_path(id)
            .await?
            .ok_or_else(|| missing("entity", id))?;
        if current != entity.path().to_string() {
            return Err(InventoryError::IllegalArgument(format!(
                "cannot move {current} to {}",
                entity.path()
            )));
        }

        let record = entity_record(entity, &Uuid::new_v4().to_string())?;
        if !self.client.replace_entity(id, record).await? {
            return Err(missing("entity", id));
        }
        Ok(())
    }

    async fn relate(
        &self,
        source: &GraphElement,
        target: &GraphElement,
        label: &str,
        properties: &Properties,
    ) -> Result<GraphElement> {
        for end in [source, target] {
            if matches!(end, GraphElement::Edge(_)) {
                return Err(not_a("node", end));
            }
        }
        let edge = self
            .client
            .create_edge(
                source.element_id(),
                target.element_id(),
                &Uuid::new_v4().to_string(),
                label,
                serde_json::to_string(properties)?,
            )
            .await?
            .ok_or_else(|| {
                InventoryError::backend(
                    NAME,
                    anyhow!("cannot relate {source:?} to {target:?}: no such node"),
                )
            })?;
        Ok(GraphElement::Edge(edge))
    }

    async fn delete(&self, element: &GraphElement) -> Result<()> {
        let removed = match element {
            GraphElement::Entity(id) => self.client.delete_entity(id).await?,
            GraphElement::Data(id) => self.client.delete_tree(id).await?,
            GraphElement::Edge(id) => self.client.delete_edge(id).await?,
        };
        if removed == 0 {
            return Err(missing("element", element.element_id()));
        }
        Ok(())
    }

    async fn get_relationships(
        &self,
        node: &GraphElement,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<GraphElement>> {
        if matches!(node, GraphElement::Edge(_)) {
            return Err(not_a("node", node));
        }
        let edges = self
            .client
            .incident_edges(node.element_id(), direction, label)
            .await?;
        Ok(edges.into_iter().map(GraphElement::Edge).collect())
    }

    async fn get_relationship_source(&self, edge: &GraphElement) -> Result<GraphElement> {
        let GraphElement::Edge(id) = edge else {
            return Err(not_a("relationship", edge));
        };
        let row = self
            .client
            .edge_row(id)
            .await?
            .ok_or_else(|| missing("edge", id))?;
        Ok(GraphElement::node(row.source, row.source_is_entity))
    }

    async fn get_relationship_target(&self, edge: &GraphElement) -> Result<GraphElement> {
        let GraphElement::Edge(id) = edge else {
            return Err(not_a("relationship", edge));
        };
        let row = self
            .client
            .edge_row(id)
            .await?
            .ok_or_else(|| missing("edge", id))?;
        Ok(GraphElement::node(row.target, row.target_is_entity))
    }

    async fn delete_structured_data(&self, root: &GraphElement) -> Result<()> {
        match root {
            GraphElement::Data(id) => {
                self.client.delete_tree(id).await?;
                Ok(())
            }
            other => Err(not_a("structured data", other)),
        }
    }

    async fn descend_to_data(
        &self,
        data_entity: &GraphElement,
        path: &RelativePath,
    ) -> Result<Option<GraphElement>> {
        let id = self.entity_id(data_entity)?;
        let Some(mut current) = self.client.has_data_root(id).await? else {
            return Ok(None);
        };

        for segment in path.segments() {
            let slot = match segment {
                RelativeSegment::Key(key) => ChildSlot::Key(key),
                RelativeSegment::Index(index) => ChildSlot::Index(*index),
                other => {
                    return Err(InventoryError::InvalidPath(format!(
                        "'{other}' cannot be used inside structured data"
                    )))
                }
            };
            match self.client.data_child(&current, slot).await? {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(GraphElement::Data(current)))
    }

    async fn extract_canonical_path(&self, element: &GraphElement) -> Result<CanonicalPath> {
        let id = self.entity_id(element)?;
        let raw = self
            .client
            .entity_path(id)
            .await?
            .ok_or_else(|| missing("entity", id))?;
        raw.parse()
    }
}
