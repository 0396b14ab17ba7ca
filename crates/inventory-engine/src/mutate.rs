//! Read and read-write access to the entities of one kind at a position.
//!
//! `ReadWrite` runs the generic mutation template; the kind strategy `S`
//! supplies the parts that differ between kinds.

use std::marker::PhantomData;

use tracing::{debug, info};

use inventory_core::{
    CanonicalPath, Direction, EntityKind, InventoryEntity, InventoryError, InventoryEvent, Result,
    WellKnown,
};

use crate::backend::Backend;
use crate::context::{ImplicitRelationship, TraversalContext};
use crate::fetch::{resolve_one, Multiple, Single};
use crate::filter::Filter;
use crate::kinds::{BlueprintOf, EntityStrategy, UpdateOf};

/// Lookup of entities of kind `S` at the current position.
pub struct Read<B: Backend, S> {
    ctx: TraversalContext<B>,
    _strategy: PhantomData<S>,
}

impl<B: Backend, S> Clone for Read<B, S> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            _strategy: PhantomData,
        }
    }
}

impl<B: Backend, S: EntityStrategy<B>> Read<B, S> {
    pub(crate) fn new(ctx: TraversalContext<B>) -> Self {
        Self {
            ctx,
            _strategy: PhantomData,
        }
    }

    pub fn context(&self) -> &TraversalContext<B> {
        &self.ctx
    }

    pub fn get(&self, id: impl Into<String>) -> Single<B, S> {
        Single::new(self.ctx.where_filters(vec![Filter::id(id)]))
    }

    pub fn get_all(&self) -> Multiple<B, S> {
        Multiple::new(self.ctx.clone())
    }

    /// Entities matching any of the given AND-sequences, duplicates removed.
    pub fn get_all_where(&self, filters: Vec<Vec<Filter>>) -> Multiple<B, S> {
        Multiple::new(self.ctx.where_all(filters))
    }
}

/// Lookup plus create, update and delete of entities of kind `S` contained in
/// the current position.
pub struct ReadWrite<B: Backend, S> {
    read: Read<B, S>,
    strategy: S,
}

impl<B: Backend, S: Clone> Clone for ReadWrite<B, S> {
    fn clone(&self) -> Self {
        Self {
            read: self.read.clone(),
            strategy: self.strategy.clone(),
        }
    }
}

impl<B: Backend, S: EntityStrategy<B>> ReadWrite<B, S> {
    pub(crate) fn new(ctx: TraversalContext<B>) -> Self {
        Self {
            read: Read::new(ctx),
            strategy: S::default(),
        }
    }

    pub fn context(&self) -> &TraversalContext<B> {
        self.read.context()
    }

    pub fn get(&self, id: impl Into<String>) -> Single<B, S> {
        self.read.get(id)
    }

    pub fn get_all(&self) -> Multiple<B, S> {
        self.read.get_all()
    }

    pub fn get_all_where(&self, filters: Vec<Vec<Filter>>) -> Multiple<B, S> {
        self.read.get_all_where(filters)
    }

    /// Drop the write half.
    pub fn read_only(&self) -> Read<B, S> {
        self.read.clone()
    }

    /// Create a new entity under the single entity this position hangs off.
    pub async fn create(&self, blueprint: &BlueprintOf<S, B>) -> Result<Single<B, S>> {
        let ctx = self.context();
        let kind = kind_of::<B, S>();

        self.strategy.validate(blueprint)?;
        let id = self.strategy.proposed_id(blueprint);

        let parent = match ctx.origin() {
            Some(origin) if !origin.path().is_empty() => {
                let parent_kind = origin.kind().ok_or_else(|| {
                    InventoryError::IllegalArgument(format!("cannot create {kind} here"))
                })?;
                let element = resolve_one(origin, parent_kind).await?;
                let path = ctx.backend().extract_canonical_path(&element).await?;
                Some((element, path))
            }
            _ => None,
        };

        let path = match &parent {
            Some((_, parent_path)) => parent_path.extend(kind, &id)?,
            None => CanonicalPath::root(kind, &id)?,
        };

        let existing = ctx
            .backend()
            .resolve(&ctx.path().with_filters(vec![Filter::id(&id)]))
            .await?;
        if !existing.is_empty() {
            return Err(InventoryError::EntityAlreadyExists {
                kind,
                path: path.to_string(),
            });
        }

        debug!(path = %path, "Wiring up new entity");
        let parent_element = parent.as_ref().map(|(element, _)| element);
        let wired = self
            .strategy
            .wire_up_new_entity(ctx, parent_element, path.clone(), blueprint)
            .await?;

        if let Some(parent_element) = parent_element {
            ctx.relate_internal(parent_element, &wired.element, ImplicitRelationship::Contains)
                .await?;
        }

        info!(path = %path, kind = %kind, "Entity created");
        ctx.publish(wired.events);

        let visible = self.strategy.init_new_entity(&path);
        Ok(Single::new(ctx.replace_path_with(&path, visible)))
    }

    /// Apply `update` to the entity with the given id.
    pub async fn update(&self, id: &str, update: &UpdateOf<S, B>) -> Result<()> {
        let ctx = self.context();
        let kind = kind_of::<B, S>();
        let located = ctx.where_filters(vec![Filter::id(id)]);
        let element = resolve_one(&located, kind).await?;

        let old = ctx.backend().convert(&element, kind).await?;
        let mut entity = S::Entity::from_entity(old.clone())?;
        self.strategy
            .apply_update(ctx, &element, &mut entity, update)
            .await?;

        info!(path = %old.path(), "Entity updated");
        ctx.publish(vec![InventoryEvent::entity_updated(
            old,
            entity.into_entity(),
        )]);
        Ok(())
    }

    /// Delete the entity with the given id and everything it contains.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let ctx = self.context();
        let kind = kind_of::<B, S>();
        let located = ctx.where_filters(vec![Filter::id(id)]);
        let element = resolve_one(&located, kind).await?;
        delete_cascade(ctx, element).await
    }
}

fn kind_of<B: Backend, S: EntityStrategy<B>>() -> EntityKind {
    <S::Entity as InventoryEntity>::KIND
}

/// Delete an entity and, depth first, everything it contains.
///
/// Each entity's kind cleanup runs before its node is deleted. One `Deleted`
/// event is published per removed entity, innermost first.
pub(crate) async fn delete_cascade<B: Backend>(
    ctx: &TraversalContext<B>,
    root: B::Element,
) -> Result<()> {
    let backend = ctx.backend();

    // Pre-order walk; reversed, every entity comes after all of its descendants.
    let mut order = Vec::new();
    let mut stack = vec![root];
    while let Some(element) = stack.pop() {
        let edges = backend
            .get_relationships(&element, Direction::Outgoing, Some(WellKnown::Contains.name()))
            .await?;
        for edge in &edges {
            stack.push(backend.get_relationship_target(edge).await?);
        }
        order.push(element);
    }

    let mut events = Vec::with_capacity(order.len());
    for element in order.into_iter().rev() {
        let path = backend.extract_canonical_path(&element).await?;
        let snapshot = backend.convert(&element, path.kind()).await?;

        ctx.registry()
            .cleanup_for(path.kind())?
            .cleanup(ctx, &element, &path)
            .await?;
        backend.delete(&element).await?;

        debug!(path = %path, "Entity deleted");
        events.push(InventoryEvent::entity_deleted(snapshot));
    }

    info!(removed = events.len(), "Delete completed");
    ctx.publish(events);
    Ok(())
}
