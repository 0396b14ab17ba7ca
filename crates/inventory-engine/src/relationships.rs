//! Browsing the relationships of a traversal position.
//!
//! From any entity view you can pivot onto its edges, and from an edge onto the
//! entity at its other end, typed by kind, without restating the path from a
//! tenant. `hasData` edges belong to the data layout and are never listed.

use std::collections::HashSet;

use tracing::info;

use inventory_core::{
    CanonicalPath, Direction, EntityKind, EventPayload, InventoryEntity, InventoryError,
    InventoryEvent, Page, Pager, Properties, Relationship, Result, WellKnown,
};

use crate::backend::Backend;
use crate::context::TraversalContext;
use crate::fetch::{effective_pager, resolve_one, Multiple, Single};
use crate::filter::{Filter, Step};
use crate::kinds::{
    Data, EntityStrategy, Environments, Feeds, MetricTypes, Metrics, ResourceTypes, Resources,
    Tenants,
};
use crate::mutate::Read;

fn unsupported(operation: &str) -> InventoryError {
    InventoryError::Unsupported(format!("relationship {operation} is not supported"))
}

fn relationship_field(relationship: &Relationship, field: &str) -> Option<serde_json::Value> {
    match field {
        "id" => Some(serde_json::Value::String(relationship.id.clone())),
        "label" => Some(serde_json::Value::String(relationship.label.clone())),
        name => relationship.properties.get(name).cloned(),
    }
}

/// Shared state of the relationship views: the entities whose edges are browsed.
struct EdgeScope<B: Backend> {
    ctx: TraversalContext<B>,
    source_kind: EntityKind,
    direction: Direction,
    label: Option<String>,
}

impl<B: Backend> Clone for EdgeScope<B> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            source_kind: self.source_kind,
            direction: self.direction,
            label: self.label.clone(),
        }
    }
}

impl<B: Backend> EdgeScope<B> {
    async fn edges(&self) -> Result<Vec<B::Element>> {
        if self.label.as_deref() == Some(WellKnown::HasData.name()) {
            return Ok(Vec::new());
        }

        let backend = self.ctx.backend();
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for source in backend.resolve(self.ctx.path()).await? {
            for edge in backend
                .get_relationships(&source, self.direction, self.label.as_deref())
                .await?
            {
                if seen.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }
        Ok(edges)
    }

    async fn relationships(&self) -> Result<Vec<Relationship>> {
        let backend = self.ctx.backend();
        let mut relationships = Vec::new();
        for edge in self.edges().await? {
            relationships.push(backend.convert_relationship(&edge).await?);
        }
        Ok(relationships)
    }

    fn cross<S: EntityStrategy<B>>(&self, alternatives: Vec<Vec<Filter>>) -> Read<B, S> {
        let kind = <S::Entity as InventoryEntity>::KIND;
        let alternatives = alternatives
            .into_iter()
            .map(|mut hop| {
                hop.push(Filter::of_type(kind));
                hop
            })
            .collect();
        Read::new(self.ctx.hop(Step::any_of(alternatives), kind))
    }
}

/// Relationships of the entities at a position, in one direction.
pub struct Relationships<B: Backend> {
    scope: EdgeScope<B>,
}

impl<B: Backend> Clone for Relationships<B> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope.clone(),
        }
    }
}

impl<B: Backend> Relationships<B> {
    pub(crate) fn new(ctx: TraversalContext<B>, source_kind: EntityKind, direction: Direction) -> Self {
        Self {
            scope: EdgeScope {
                ctx,
                source_kind,
                direction,
                label: None,
            },
        }
    }

    /// Only edges carrying `label`.
    pub fn named(&self, label: impl Into<String>) -> Self {
        let mut scope = self.scope.clone();
        scope.label = Some(label.into());
        Self { scope }
    }

    pub fn get(&self, id: impl Into<String>) -> SingleRelationship<B> {
        SingleRelationship {
            scope: self.scope.clone(),
            id: id.into(),
        }
    }

    /// Relationships passing every filter. Only id filters apply to
    /// relationships; anything else is rejected here, before any lookup.
    pub fn get_all(&self, filters: Vec<Filter>) -> Result<MultipleRelationships<B>> {
        let offending: Vec<String> = filters
            .iter()
            .filter(|f| !f.is_id_filter())
            .map(ToString::to_string)
            .collect();
        if !offending.is_empty() {
            return Err(InventoryError::IllegalArgument(format!(
                "only id filters can be applied to relationships, got: {}",
                offending.join(", ")
            )));
        }
        Ok(MultipleRelationships {
            scope: self.scope.clone(),
            filters,
        })
    }

    pub fn create(
        &self,
        _label: &str,
        _target: &CanonicalPath,
        _properties: Properties,
    ) -> Result<Relationship> {
        Err(unsupported("creation"))
    }

    pub fn update(&self, _id: &str, _properties: Properties) -> Result<()> {
        Err(unsupported("update"))
    }

    pub fn delete(&self, _id: &str) -> Result<()> {
        Err(unsupported("deletion"))
    }
}

/// One relationship, looked up by id among the position's edges.
pub struct SingleRelationship<B: Backend> {
    scope: EdgeScope<B>,
    id: String,
}

impl<B: Backend> SingleRelationship<B> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn entity(&self) -> Result<Relationship> {
        self.scope
            .relationships()
            .await?
            .into_iter()
            .find(|r| r.id == self.id)
            .ok_or_else(|| InventoryError::RelationNotFound {
                source_kind: self.scope.source_kind,
                id: self.id.clone(),
                filters: self.scope.ctx.path().to_string(),
            })
    }

    pub async fn exists(&self) -> Result<bool> {
        match self.entity().await {
            Ok(_) => Ok(true),
            Err(InventoryError::RelationNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn other_end<S: EntityStrategy<B>>(&self) -> Read<B, S> {
        self.scope.cross(vec![vec![Filter::by_relationship_id(
            self.id.clone(),
            self.scope.label.clone(),
            self.scope.direction,
        )]])
    }

    pub fn tenants(&self) -> Read<B, Tenants> {
        self.other_end()
    }

    pub fn environments(&self) -> Read<B, Environments> {
        self.other_end()
    }

    pub fn feeds(&self) -> Read<B, Feeds> {
        self.other_end()
    }

    pub fn resource_types(&self) -> Read<B, ResourceTypes> {
        self.other_end()
    }

    pub fn metric_types(&self) -> Read<B, MetricTypes> {
        self.other_end()
    }

    pub fn resources(&self) -> Read<B, Resources> {
        self.other_end()
    }

    pub fn metrics(&self) -> Read<B, Metrics> {
        self.other_end()
    }

    pub fn data(&self) -> Read<B, Data> {
        self.other_end()
    }
}

/// The relationships of a position matching a set of id filters.
pub struct MultipleRelationships<B: Backend> {
    scope: EdgeScope<B>,
    filters: Vec<Filter>,
}

impl<B: Backend> MultipleRelationships<B> {
    pub async fn entities(&self, pager: &Pager) -> Result<Page<Relationship>> {
        let mut relationships: Vec<Relationship> = self
            .scope
            .relationships()
            .await?
            .into_iter()
            .filter(|r| self.filters.iter().all(|f| f.accepts_id(&r.id)))
            .collect();

        let pager = effective_pager(&self.scope.ctx, pager);
        pager.sort(&mut relationships, relationship_field);
        Ok(pager.slice(relationships))
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.entities(&Pager::unlimited()).await?.total)
    }

    /// The edge ids the filters pin down, `None` when unfiltered.
    fn pinned_ids(&self) -> Option<Vec<String>> {
        let mut filters = self.filters.iter();
        let first = filters.next()?;
        let candidates = match first {
            Filter::WithId(id) => vec![id.clone()],
            Filter::WithIds(ids) => ids.clone(),
            _ => Vec::new(),
        };
        Some(
            candidates
                .into_iter()
                .filter(|id| filters.clone().all(|f| f.accepts_id(id)))
                .collect(),
        )
    }

    fn other_end<S: EntityStrategy<B>>(&self) -> Read<B, S> {
        let direction = self.scope.direction;
        let label = &self.scope.label;
        let alternatives = match self.pinned_ids() {
            None => vec![vec![Filter::Related {
                label: label.clone(),
                direction,
            }]],
            Some(ids) => ids
                .into_iter()
                .map(|id| vec![Filter::by_relationship_id(id, label.clone(), direction)])
                .collect(),
        };
        self.scope.cross(alternatives)
    }

    pub fn tenants(&self) -> Read<B, Tenants> {
        self.other_end()
    }

    pub fn environments(&self) -> Read<B, Environments> {
        self.other_end()
    }

    pub fn feeds(&self) -> Read<B, Feeds> {
        self.other_end()
    }

    pub fn resource_types(&self) -> Read<B, ResourceTypes> {
        self.other_end()
    }

    pub fn metric_types(&self) -> Read<B, MetricTypes> {
        self.other_end()
    }

    pub fn resources(&self) -> Read<B, Resources> {
        self.other_end()
    }

    pub fn metrics(&self) -> Read<B, Metrics> {
        self.other_end()
    }

    pub fn data(&self) -> Read<B, Data> {
        self.other_end()
    }
}

// ── Associations ─────────────────────────────────────────────────

/// The metrics a resource owns, with the means to change that set.
pub struct Associations<B: Backend> {
    resource: Single<B, Resources>,
}

impl<B: Backend> Associations<B> {
    pub(crate) fn new(resource: Single<B, Resources>) -> Self {
        Self { resource }
    }

    fn owned(&self) -> Read<B, Metrics> {
        Read::new(self.resource.context().proceed_over(
            WellKnown::Owns.name(),
            Direction::Outgoing,
            EntityKind::Metric,
        ))
    }

    pub fn get(&self, id: impl Into<String>) -> Single<B, Metrics> {
        self.owned().get(id)
    }

    pub fn get_all(&self) -> Multiple<B, Metrics> {
        self.owned().get_all()
    }

    /// Make the resource own the metric at `metric`. Both must live in the same tenant.
    pub async fn associate(&self, metric: &CanonicalPath) -> Result<Relationship> {
        if metric.kind() != EntityKind::Metric {
            return Err(InventoryError::IllegalArgument(format!(
                "only metrics can be associated with a resource, got {metric}"
            )));
        }

        let ctx = self.resource.context();
        let backend = ctx.backend();
        let resource = self.resource.element().await?;
        let resource_path = backend.extract_canonical_path(&resource).await?;
        if resource_path.tenant_id() != metric.tenant_id() {
            return Err(InventoryError::IllegalArgument(format!(
                "{metric} is not in the tenant of {resource_path}"
            )));
        }

        let target = resolve_one(&ctx.replace_path(metric), EntityKind::Metric).await?;
        let edge = ctx
            .relate(&resource, &target, WellKnown::Owns.name(), &Properties::new())
            .await?;
        let relationship = backend.convert_relationship(&edge).await?;

        info!(resource = %resource_path, metric = %metric, "Metric associated");
        ctx.publish(vec![InventoryEvent::new(EventPayload::RelationshipCreated {
            relationship: relationship.clone(),
        })]);
        Ok(relationship)
    }

    /// Remove the `owns` edge between the resource and the metric at `metric`.
    pub async fn disassociate(&self, metric: &CanonicalPath) -> Result<Relationship> {
        let ctx = self.resource.context();
        let backend = ctx.backend();
        let resource = self.resource.element().await?;

        let edges = backend
            .get_relationships(&resource, Direction::Outgoing, Some(WellKnown::Owns.name()))
            .await?;
        for edge in edges {
            let target = backend.get_relationship_target(&edge).await?;
            if backend.extract_canonical_path(&target).await? != *metric {
                continue;
            }

            let relationship = backend.convert_relationship(&edge).await?;
            backend.delete(&edge).await?;
            info!(metric = %metric, "Metric disassociated");
            ctx.publish(vec![InventoryEvent::new(EventPayload::RelationshipDeleted {
                relationship: relationship.clone(),
            })]);
            return Ok(relationship);
        }

        Err(InventoryError::RelationNotFound {
            source_kind: EntityKind::Resource,
            id: format!("{}:{metric}", WellKnown::Owns),
            filters: ctx.path().to_string(),
        })
    }
}
