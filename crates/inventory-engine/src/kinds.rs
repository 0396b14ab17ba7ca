//! Per-kind strategies plugged into the generic fetchers and mutators.
//!
//! Each entity kind is represented by a zero-sized value (`Tenants`,
//! `Resources`, ...). The value decides how a blueprint becomes an id, which
//! implicit edges a new entity needs, how updates are stored, and what has to be
//! removed before the entity's node is deleted.

use async_trait::async_trait;
use tracing::{debug, warn};

use inventory_core::{
    CanonicalPath, DataEntity, Direction, EntityKind, Environment, Feed, InventoryEntity,
    InventoryError, InventoryEvent, Metric, MetricType, Resource, ResourceType, Result, Tenant,
    WellKnown,
};

use crate::backend::Backend;
use crate::context::{ImplicitRelationship, TraversalContext};
use crate::filter::FilterPath;

pub type BlueprintOf<S, B> = <<S as EntityStrategy<B>>::Entity as InventoryEntity>::Blueprint;
pub type UpdateOf<S, B> = <<S as EntityStrategy<B>>::Entity as InventoryEntity>::Update;

/// What wiring up a new entity produced.
pub struct WiredUp<B: Backend, E> {
    pub element: B::Element,
    pub entity: E,
    /// Published only once the entity is reachable.
    pub events: Vec<InventoryEvent>,
}

/// Removes kind-specific dependent state before an entity's node is deleted.
#[async_trait]
pub trait Cleanup<B: Backend>: Send + Sync + 'static {
    async fn cleanup(
        &self,
        ctx: &TraversalContext<B>,
        element: &B::Element,
        path: &CanonicalPath,
    ) -> Result<()>;
}

#[async_trait]
pub trait EntityStrategy<B: Backend>: Cleanup<B> + Copy + Default {
    type Entity: InventoryEntity;

    fn proposed_id(&self, blueprint: &BlueprintOf<Self, B>) -> String;

    fn validate(&self, _blueprint: &BlueprintOf<Self, B>) -> Result<()> {
        Ok(())
    }

    /// Persist the new entity's node and any implicit edges it needs.
    ///
    /// The `contains` edge from the parent is not created here: until it exists
    /// the new entity cannot be reached from any tenant.
    async fn wire_up_new_entity(
        &self,
        ctx: &TraversalContext<B>,
        _parent: Option<&B::Element>,
        path: CanonicalPath,
        blueprint: &BlueprintOf<Self, B>,
    ) -> Result<WiredUp<B, Self::Entity>> {
        persist_new::<B, Self::Entity>(ctx, path, blueprint).await
    }

    /// The filters under which a freshly created entity is visible.
    fn init_new_entity(&self, path: &CanonicalPath) -> FilterPath {
        FilterPath::to(path)
    }

    async fn apply_update(
        &self,
        ctx: &TraversalContext<B>,
        element: &B::Element,
        entity: &mut Self::Entity,
        update: &UpdateOf<Self, B>,
    ) -> Result<()> {
        entity.apply_update(update);
        ctx.backend()
            .update(element, &entity.clone().into_entity())
            .await
    }
}

async fn persist_new<B: Backend, E: InventoryEntity>(
    ctx: &TraversalContext<B>,
    path: CanonicalPath,
    blueprint: &E::Blueprint,
) -> Result<WiredUp<B, E>> {
    let entity = E::from_blueprint(path, blueprint);
    let element = ctx.backend().persist(&entity.clone().into_entity()).await?;
    Ok(WiredUp {
        element,
        events: vec![InventoryEvent::entity_created(entity.clone().into_entity())],
        entity,
    })
}

/// Find the one entity at `path`, failing with `EntityNotFound` otherwise.
async fn require_entity<B: Backend>(
    ctx: &TraversalContext<B>,
    path: &CanonicalPath,
) -> Result<B::Element> {
    let filters = FilterPath::to(path);
    ctx.backend()
        .resolve(&filters)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| InventoryError::EntityNotFound {
            kind: path.kind(),
            filters: filters.to_string(),
        })
}

fn require_kind(path: &CanonicalPath, expected: EntityKind, field: &str) -> Result<()> {
    if path.kind() != expected {
        return Err(InventoryError::IllegalArgument(format!(
            "{field} must point to a {expected}, got {path}"
        )));
    }
    Ok(())
}

/// Persist the new node, then link it from the type that defines it.
async fn wire_up_defined<B: Backend, E: InventoryEntity>(
    ctx: &TraversalContext<B>,
    path: CanonicalPath,
    blueprint: &E::Blueprint,
    type_path: &CanonicalPath,
) -> Result<WiredUp<B, E>> {
    let definer = require_entity(ctx, type_path).await?;
    let wired = persist_new::<B, E>(ctx, path, blueprint).await?;
    ctx.relate_internal(&definer, &wired.element, ImplicitRelationship::Defines)
        .await?;
    Ok(wired)
}

macro_rules! no_cleanup {
    ($($strategy:ty),* $(,)?) => {
        $(
            #[async_trait]
            impl<B: Backend> Cleanup<B> for $strategy {
                async fn cleanup(
                    &self,
                    _ctx: &TraversalContext<B>,
                    _element: &B::Element,
                    _path: &CanonicalPath,
                ) -> Result<()> {
                    Ok(())
                }
            }
        )*
    };
}

// ── Strategies ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct Tenants;

#[derive(Debug, Clone, Copy, Default)]
pub struct Environments;

#[derive(Debug, Clone, Copy, Default)]
pub struct Feeds;

#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceTypes;

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricTypes;

#[derive(Debug, Clone, Copy, Default)]
pub struct Resources;

#[derive(Debug, Clone, Copy, Default)]
pub struct Metrics;

/// Strategy for data entities. The role name is the id, so an owner has at
/// most one data entity per role.
#[derive(Debug, Clone, Copy, Default)]
pub struct Data;

no_cleanup!(
    Tenants,
    Environments,
    Feeds,
    ResourceTypes,
    MetricTypes,
    Resources,
    Metrics
);

#[async_trait]
impl<B: Backend> EntityStrategy<B> for Tenants {
    type Entity = Tenant;

    fn proposed_id(&self, blueprint: &BlueprintOf<Self, B>) -> String {
        blueprint.id.clone()
    }
}

#[async_trait]
impl<B: Backend> EntityStrategy<B> for Environments {
    type Entity = Environment;

    fn proposed_id(&self, blueprint: &BlueprintOf<Self, B>) -> String {
        blueprint.id.clone()
    }
}

#[async_trait]
impl<B: Backend> EntityStrategy<B> for Feeds {
    type Entity = Feed;

    fn proposed_id(&self, blueprint: &BlueprintOf<Self, B>) -> String {
        blueprint.id.clone()
    }
}

#[async_trait]
impl<B: Backend> EntityStrategy<B> for ResourceTypes {
    type Entity = ResourceType;

    fn proposed_id(&self, blueprint: &BlueprintOf<Self, B>) -> String {
        blueprint.id.clone()
    }
}

#[async_trait]
impl<B: Backend> EntityStrategy<B> for MetricTypes {
    type Entity = MetricType;

    fn proposed_id(&self, blueprint: &BlueprintOf<Self, B>) -> String {
        blueprint.id.clone()
    }

    fn validate(&self, blueprint: &BlueprintOf<Self, B>) -> Result<()> {
        if blueprint.unit.trim().is_empty() {
            return Err(InventoryError::IllegalArgument(format!(
                "metric type '{}' needs a unit",
                blueprint.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<B: Backend> EntityStrategy<B> for Resources {
    type Entity = Resource;

    fn proposed_id(&self, blueprint: &BlueprintOf<Self, B>) -> String {
        blueprint.id.clone()
    }

    fn validate(&self, blueprint: &BlueprintOf<Self, B>) -> Result<()> {
        require_kind(
            &blueprint.resource_type,
            EntityKind::ResourceType,
            "resource_type",
        )
    }

    async fn wire_up_new_entity(
        &self,
        ctx: &TraversalContext<B>,
        _parent: Option<&B::Element>,
        path: CanonicalPath,
        blueprint: &BlueprintOf<Self, B>,
    ) -> Result<WiredUp<B, Resource>> {
        wire_up_defined::<B, Resource>(ctx, path, blueprint, &blueprint.resource_type).await
    }
}

#[async_trait]
impl<B: Backend> EntityStrategy<B> for Metrics {
    type Entity = Metric;

    fn proposed_id(&self, blueprint: &BlueprintOf<Self, B>) -> String {
        blueprint.id.clone()
    }

    fn validate(&self, blueprint: &BlueprintOf<Self, B>) -> Result<()> {
        require_kind(&blueprint.metric_type, EntityKind::MetricType, "metric_type")
    }

    async fn wire_up_new_entity(
        &self,
        ctx: &TraversalContext<B>,
        _parent: Option<&B::Element>,
        path: CanonicalPath,
        blueprint: &BlueprintOf<Self, B>,
    ) -> Result<WiredUp<B, Metric>> {
        wire_up_defined::<B, Metric>(ctx, path, blueprint, &blueprint.metric_type).await
    }
}

#[async_trait]
impl<B: Backend> EntityStrategy<B> for Data {
    type Entity = DataEntity;

    fn proposed_id(&self, blueprint: &BlueprintOf<Self, B>) -> String {
        blueprint.role.name().to_string()
    }

    async fn wire_up_new_entity(
        &self,
        ctx: &TraversalContext<B>,
        _parent: Option<&B::Element>,
        path: CanonicalPath,
        blueprint: &BlueprintOf<Self, B>,
    ) -> Result<WiredUp<B, DataEntity>> {
        let wired = persist_new::<B, DataEntity>(ctx, path, blueprint).await?;
        let root = ctx.backend().persist_data(&blueprint.value).await?;
        ctx.relate_internal(&wired.element, &root, ImplicitRelationship::HasData)
            .await?;
        Ok(wired)
    }

    async fn apply_update(
        &self,
        ctx: &TraversalContext<B>,
        element: &B::Element,
        entity: &mut DataEntity,
        update: &UpdateOf<Self, B>,
    ) -> Result<()> {
        // Swap the whole tree: drop the old data, then attach the new one.
        Cleanup::<B>::cleanup(self, ctx, element, &entity.path).await?;
        let root = ctx.backend().persist_data(&update.value).await?;
        ctx.relate_internal(element, &root, ImplicitRelationship::HasData)
            .await?;

        entity.apply_update(update);
        ctx.backend()
            .update(element, &entity.clone().into_entity())
            .await
    }
}

#[async_trait]
impl<B: Backend> Cleanup<B> for Data {
    async fn cleanup(
        &self,
        ctx: &TraversalContext<B>,
        element: &B::Element,
        path: &CanonicalPath,
    ) -> Result<()> {
        let backend = ctx.backend();
        let edges = backend
            .get_relationships(element, Direction::Outgoing, Some(WellKnown::HasData.name()))
            .await?;

        if edges.is_empty() {
            warn!(
                path = %path,
                "Data entity has no hasData relationship, no structured data to remove"
            );
            return Ok(());
        }

        for edge in edges {
            let root = backend.get_relationship_target(&edge).await?;
            backend.delete_structured_data(&root).await?;
            backend.delete(&edge).await?;
            debug!(path = %path, "Removed structured data");
        }
        Ok(())
    }
}
