//! In-process reference backend.
//!
//! Entities, structured-data nodes and edges live in one arena guarded by a
//! `tokio::sync::RwLock`. Every contract call takes the lock exactly once, so
//! each call is atomic with respect to every other.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use inventory_core::{
    CanonicalPath, DataView, Direction, Entity, EntityKind, InventoryError, Properties,
    RelativePath, RelativeSegment, Relationship, Result, StructuredData, WellKnown,
};

use crate::backend::Backend;
use crate::filter::{Filter, FilterPath};

const NAME: &str = "memory";

/// Handle to something stored in a [`MemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryElement {
    Entity(u64),
    Data(u64),
    Edge(u64),
}

enum DataNode {
    Scalar(StructuredData),
    List(Vec<u64>),
    Map(BTreeMap<String, u64>),
}

struct EdgeRecord {
    id: String,
    label: String,
    source: MemoryElement,
    target: MemoryElement,
    properties: Properties,
}

impl EdgeRecord {
    /// The far end of this edge seen from `from`, if the edge leaves `from` in `direction`.
    fn other_end(&self, from: MemoryElement, direction: Direction) -> Option<MemoryElement> {
        match direction {
            Direction::Outgoing if self.source == from => Some(self.target),
            Direction::Incoming if self.target == from => Some(self.source),
            Direction::Both if self.source == from => Some(self.target),
            Direction::Both if self.target == from => Some(self.source),
            _ => None,
        }
    }

    fn links_entities(&self) -> bool {
        matches!(self.source, MemoryElement::Entity(_))
            && matches!(self.target, MemoryElement::Entity(_))
    }
}

fn missing(what: &str, id: u64) -> InventoryError {
    InventoryError::backend(NAME, anyhow!("{what} {id} does not exist"))
}

fn not_a(expected: &str, element: MemoryElement) -> InventoryError {
    InventoryError::Conversion {
        expected: expected.to_string(),
        actual: format!("{element:?}"),
    }
}

#[derive(Default)]
struct Graph {
    next_id: u64,
    entities: BTreeMap<u64, Entity>,
    data: HashMap<u64, DataNode>,
    edges: BTreeMap<u64, EdgeRecord>,
    paths: HashMap<CanonicalPath, u64>,
}

impl Graph {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn entity(&self, id: u64) -> Result<&Entity> {
        self.entities.get(&id).ok_or_else(|| missing("entity", id))
    }

    fn edge(&self, element: MemoryElement) -> Result<&EdgeRecord> {
        match element {
            MemoryElement::Edge(id) => self.edges.get(&id).ok_or_else(|| missing("edge", id)),
            other => Err(not_a("relationship", other)),
        }
    }

    fn exists(&self, element: MemoryElement) -> bool {
        match element {
            MemoryElement::Entity(id) => self.entities.contains_key(&id),
            MemoryElement::Data(id) => self.data.contains_key(&id),
            MemoryElement::Edge(id) => self.edges.contains_key(&id),
        }
    }

    fn incident(
        &self,
        node: MemoryElement,
        direction: Direction,
        label: Option<&str>,
    ) -> Vec<MemoryElement> {
        self.edges
            .iter()
            .filter(|(_, edge)| edge.other_end(node, direction).is_some())
            .filter(|(_, edge)| match label {
                Some(label) => edge.label == label,
                None => edge.links_entities(),
            })
            .map(|(id, _)| MemoryElement::Edge(*id))
            .collect()
    }

    fn has_data_root(&self, node: MemoryElement) -> Option<u64> {
        self.edges.values().find_map(|edge| {
            if edge.source == node && edge.label == WellKnown::HasData.name() {
                match edge.target {
                    MemoryElement::Data(root) => Some(root),
                    _ => None,
                }
            } else {
                None
            }
        })
    }

    // ── Resolution ──────────────────────────────────────────────

    fn resolve(&self, path: &FilterPath) -> Vec<MemoryElement> {
        let mut current: Vec<MemoryElement> =
            self.entities.keys().map(|id| MemoryElement::Entity(*id)).collect();

        for step in path.steps() {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for alternative in step.alternatives() {
                for element in self.apply(&current, alternative) {
                    if seen.insert(element) {
                        next.push(element);
                    }
                }
            }
            current = next;
        }
        current
    }

    fn apply(&self, start: &[MemoryElement], filters: &[Filter]) -> Vec<MemoryElement> {
        let mut current = start.to_vec();
        for filter in filters {
            current = match filter {
                Filter::Related { label, direction } => self.hop(&current, *direction, |edge| {
                    label.as_deref().map_or(true, |l| edge.label == l)
                }),
                Filter::RelatedWithId {
                    edge_id,
                    label,
                    direction,
                } => self.hop(&current, *direction, |edge| {
                    edge.id == *edge_id && label.as_deref().map_or(true, |l| edge.label == l)
                }),
                Filter::RelatedWith {
                    path,
                    label,
                    direction,
                } => {
                    let anchor = self.paths.get(path).map(|id| MemoryElement::Entity(*id));
                    current
                        .into_iter()
                        .filter(|element| {
                            anchor.map_or(false, |anchor| {
                                self.edges.values().any(|edge| {
                                    edge.label == *label
                                        && edge.other_end(*element, *direction) == Some(anchor)
                                })
                            })
                        })
                        .collect()
                }
                _ => current
                    .into_iter()
                    .filter(|element| self.accepts(*element, filter))
                    .collect(),
            };
        }
        current
    }

    fn hop<F>(&self, from: &[MemoryElement], direction: Direction, accept: F) -> Vec<MemoryElement>
    where
        F: Fn(&EdgeRecord) -> bool,
    {
        let mut seen = HashSet::new();
        let mut reached = Vec::new();
        for element in from {
            for edge in self.edges.values().filter(|edge| accept(edge)) {
                if let Some(end @ MemoryElement::Entity(_)) = edge.other_end(*element, direction) {
                    if seen.insert(end) {
                        reached.push(end);
                    }
                }
            }
        }
        reached
    }

    fn accepts(&self, element: MemoryElement, filter: &Filter) -> bool {
        let MemoryElement::Entity(id) = element else {
            return false;
        };
        let Some(entity) = self.entities.get(&id) else {
            return false;
        };
        match filter {
            Filter::WithId(expected) => entity.id() == expected,
            Filter::WithIds(ids) => ids.iter().any(|i| i == entity.id()),
            Filter::WithType(kind) => entity.kind() == *kind,
            Filter::WithProperty { name, values } => entity
                .properties()
                .get(name)
                .map_or(false, |value| values.contains(value)),
            Filter::Related { .. } | Filter::RelatedWithId { .. } | Filter::RelatedWith { .. } => {
                true
            }
        }
    }

    // ── Structured data ─────────────────────────────────────────

    fn insert_data(&mut self, value: &StructuredData) -> u64 {
        let node = match value {
            StructuredData::List(items) => {
                DataNode::List(items.iter().map(|item| self.insert_data(item)).collect())
            }
            StructuredData::Map(entries) => DataNode::Map(
                entries
                    .iter()
                    .map(|(key, item)| (key.clone(), self.insert_data(item)))
                    .collect(),
            ),
            scalar => DataNode::Scalar(scalar.clone()),
        };
        let id = self.allocate();
        self.data.insert(id, node);
        id
    }

    fn assemble(&self, id: u64, view: DataView) -> Result<StructuredData> {
        let node = self.data.get(&id).ok_or_else(|| missing("data node", id))?;
        let child = |child: u64| -> Result<StructuredData> {
            match view {
                DataView::Deep => self.assemble(child, DataView::Deep),
                DataView::Shallow => self.marker(child),
            }
        };
        Ok(match node {
            DataNode::Scalar(value) => value.clone(),
            DataNode::List(items) => StructuredData::List(
                items.iter().map(|i| child(*i)).collect::<Result<Vec<_>>>()?,
            ),
            DataNode::Map(entries) => StructuredData::Map(
                entries
                    .iter()
                    .map(|(k, i)| Ok((k.clone(), child(*i)?)))
                    .collect::<Result<BTreeMap<_, _>>>()?,
            ),
        })
    }

    /// A child as seen by a shallow read: scalars as they are, containers empty.
    fn marker(&self, id: u64) -> Result<StructuredData> {
        let node = self.data.get(&id).ok_or_else(|| missing("data node", id))?;
        Ok(match node {
            DataNode::Scalar(value) => value.clone(),
            DataNode::List(_) => StructuredData::List(Vec::new()),
            DataNode::Map(_) => StructuredData::Map(BTreeMap::new()),
        })
    }

    fn remove_data(&mut self, id: u64) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            match self.data.remove(&id) {
                Some(DataNode::List(items)) => pending.extend(items),
                Some(DataNode::Map(entries)) => pending.extend(entries.into_values()),
                Some(DataNode::Scalar(_)) | None => {}
            }
        }
    }

    fn descend(&self, root: u64, path: &RelativePath) -> Result<Option<u64>> {
        let mut current = root;
        for segment in path.segments() {
            let Some(node) = self.data.get(&current) else {
                return Ok(None);
            };
            let next = match (segment, node) {
                (RelativeSegment::Key(key), DataNode::Map(entries)) => entries.get(key).copied(),
                (RelativeSegment::Index(index), DataNode::List(items)) => items.get(*index).copied(),
                (RelativeSegment::Key(_) | RelativeSegment::Index(_), _) => None,
                (other, _) => {
                    return Err(InventoryError::InvalidPath(format!(
                        "'{other}' cannot be used inside structured data"
                    )))
                }
            };
            match next {
                Some(id) => current = id,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    // ── Conversion ──────────────────────────────────────────────

    fn materialize(&self, element: MemoryElement, kind: EntityKind) -> Result<Entity> {
        let MemoryElement::Entity(id) = element else {
            return Err(not_a(kind.label(), element));
        };
        let entity = self.entity(id)?;
        if entity.kind() != kind {
            return Err(InventoryError::Conversion {
                expected: kind.to_string(),
                actual: entity.kind().to_string(),
            });
        }

        let mut entity = entity.clone();
        if let Entity::DataEntity(data) = &mut entity {
            if let Some(root) = self.has_data_root(element) {
                data.value = self.assemble(root, DataView::Deep)?;
            }
        }
        Ok(entity)
    }

    fn kind_of(&self, element: MemoryElement) -> Result<EntityKind> {
        match element {
            MemoryElement::Entity(id) => Ok(self.entity(id)?.kind()),
            other => Err(not_a("entity", other)),
        }
    }
}

/// Keeps the whole inventory in process memory.
#[derive(Default)]
pub struct MemoryBackend {
    graph: RwLock<Graph>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entity nodes stored.
    pub async fn entity_count(&self) -> usize {
        self.graph.read().await.entities.len()
    }

    /// Number of structured-data nodes stored.
    pub async fn data_node_count(&self) -> usize {
        self.graph.read().await.data.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.graph.read().await.edges.len()
    }
}

/// Data values live in their own nodes, never inside the entity record.
fn stored(entity: &Entity) -> Entity {
    let mut entity = entity.clone();
    if let Entity::DataEntity(data) = &mut entity {
        data.value = StructuredData::Undefined;
    }
    entity
}

#[async_trait]
impl Backend for MemoryBackend {
    type Element = MemoryElement;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn resolve(&self, path: &FilterPath) -> Result<Vec<MemoryElement>> {
        Ok(self.graph.read().await.resolve(path))
    }

    async fn convert(&self, element: &MemoryElement, kind: EntityKind) -> Result<Entity> {
        self.graph.read().await.materialize(*element, kind)
    }

    async fn convert_relationship(&self, edge: &MemoryElement) -> Result<Relationship> {
        let graph = self.graph.read().await;
        let record = graph.edge(*edge)?;
        let source_kind = graph.kind_of(record.source)?;
        let target_kind = graph.kind_of(record.target)?;
        Ok(Relationship {
            id: record.id.clone(),
            label: record.label.clone(),
            source: graph.materialize(record.source, source_kind)?,
            target: graph.materialize(record.target, target_kind)?,
            properties: record.properties.clone(),
        })
    }

    async fn convert_data(&self, node: &MemoryElement, view: DataView) -> Result<StructuredData> {
        match node {
            MemoryElement::Data(id) => self.graph.read().await.assemble(*id, view),
            other => Err(not_a("structured data", *other)),
        }
    }

    async fn persist(&self, entity: &Entity) -> Result<MemoryElement> {
        let mut graph = self.graph.write().await;
        if graph.paths.contains_key(entity.path()) {
            return Err(InventoryError::EntityAlreadyExists {
                kind: entity.kind(),
                path: entity.path().to_string(),
            });
        }
        let id = graph.allocate();
        graph.paths.insert(entity.path().clone(), id);
        graph.entities.insert(id, stored(entity));
        debug!(path = %entity.path(), "Entity node stored");
        Ok(MemoryElement::Entity(id))
    }

    async fn persist_data(&self, value: &StructuredData) -> Result<MemoryElement> {
        Ok(MemoryElement::Data(self.graph.write().await.insert_data(value)))
    }

    async fn update(&self, element: &MemoryElement, entity: &Entity) -> Result<()> {
        let MemoryElement::Entity(id) = *element else {
            return Err(not_a("entity", *element));
        };
        let mut graph = self.graph.write().await;
        let current = graph.entity(id)?;
        if current.path() != entity.path() {
            return Err(InventoryError::IllegalArgument(format!(
                "cannot move {} to {}",
                current.path(),
                entity.path()
            )));
        }
        graph.entities.insert(id, stored(entity));
        Ok(())
    }

    async fn relate(
        &self,
        source: &MemoryElement,
        target: &MemoryElement,
        label: &str,
        properties: &Properties,
    ) -> Result<MemoryElement> {
        let mut graph = self.graph.write().await;
        for end in [source, target] {
            if matches!(end, MemoryElement::Edge(_)) || !graph.exists(*end) {
                return Err(InventoryError::backend(
                    NAME,
                    anyhow!("cannot relate {end:?}: no such node"),
                ));
            }
        }
        let id = graph.allocate();
        graph.edges.insert(
            id,
            EdgeRecord {
                id: Uuid::new_v4().to_string(),
                label: label.to_string(),
                source: *source,
                target: *target,
                properties: properties.clone(),
            },
        );
        Ok(MemoryElement::Edge(id))
    }

    async fn delete(&self, element: &MemoryElement) -> Result<()> {
        let mut graph = self.graph.write().await;
        match *element {
            MemoryElement::Entity(id) => {
                let entity = graph.entities.remove(&id).ok_or_else(|| missing("entity", id))?;
                graph.paths.remove(entity.path());
                graph
                    .edges
                    .retain(|_, edge| edge.source != *element && edge.target != *element);
            }
            MemoryElement::Data(id) => graph.remove_data(id),
            MemoryElement::Edge(id) => {
                graph.edges.remove(&id).ok_or_else(|| missing("edge", id))?;
            }
        }
        Ok(())
    }

    async fn get_relationships(
        &self,
        node: &MemoryElement,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<MemoryElement>> {
        Ok(self.graph.read().await.incident(*node, direction, label))
    }

    async fn get_relationship_source(&self, edge: &MemoryElement) -> Result<MemoryElement> {
        Ok(self.graph.read().await.edge(*edge)?.source)
    }

    async fn get_relationship_target(&self, edge: &MemoryElement) -> Result<MemoryElement> {
        Ok(self.graph.read().await.edge(*edge)?.target)
    }

    async fn delete_structured_data(&self, root: &MemoryElement) -> Result<()> {
        match root {
            MemoryElement::Data(id) => {
                self.graph.write().await.remove_data(*id);
                Ok(())
            }
            other => Err(not_a("structured data", *other)),
        }
    }

    async fn descend_to_data(
        &self,
        data_entity: &MemoryElement,
        path: &RelativePath,
    ) -> Result<Option<MemoryElement>> {
        let graph = self.graph.read().await;
        let Some(root) = graph.has_data_root(*data_entity) else {
            return Ok(None);
        };
        Ok(graph.descend(root, path)?.map(MemoryElement::Data))
    }

    async fn extract_canonical_path(&self, element: &MemoryElement) -> Result<CanonicalPath> {
        match element {
            MemoryElement::Entity(id) => Ok(self.graph.read().await.entity(*id)?.path().clone()),
            other => Err(not_a("entity", *other)),
        }
    }
}
