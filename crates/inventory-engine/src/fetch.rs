//! Single and multiple entity fetchers.
//!
//! Fetchers are lazy: building one never touches the backend. Resolution
//! happens in the terminal `async` calls (`entity`, `entities`, `count`, ...).

use std::marker::PhantomData;

use inventory_core::{
    Direction, Entity, EntityKind, InventoryEntity, InventoryError, Page, Pager, Result,
};

use crate::backend::Backend;
use crate::context::TraversalContext;
use crate::filter::FilterPath;
use crate::kinds::EntityStrategy;
use crate::relationships::Relationships;

/// Resolve a context that must denote exactly one entity.
///
/// Zero matches fail with `EntityNotFound`, more than one with `AmbiguousResult`.
pub(crate) async fn resolve_one<B: Backend>(
    ctx: &TraversalContext<B>,
    kind: EntityKind,
) -> Result<B::Element> {
    let mut found = ctx.backend().resolve(ctx.path()).await?;
    match found.len() {
        0 => Err(InventoryError::EntityNotFound {
            kind,
            filters: ctx.path().to_string(),
        }),
        1 => Ok(found.remove(0)),
        count => Err(InventoryError::AmbiguousResult {
            kind,
            count,
            filters: ctx.path().to_string(),
        }),
    }
}

/// Value of an ordering field: `id`, `path`, or a property name.
pub(crate) fn entity_field(entity: &Entity, field: &str) -> Option<serde_json::Value> {
    match field {
        "id" => Some(serde_json::Value::String(entity.id().to_string())),
        "path" => Some(serde_json::Value::String(entity.path().to_string())),
        name => entity.properties().get(name).cloned(),
    }
}

/// Apply the context's default page size when the caller asked for everything.
pub(crate) fn effective_pager<B: Backend>(ctx: &TraversalContext<B>, pager: &Pager) -> Pager {
    let mut pager = pager.clone();
    if pager.limit.is_none() {
        pager.limit = ctx.page_limit();
    }
    pager
}

/// A view that resolves to exactly one entity.
pub struct Single<B: Backend, S> {
    ctx: TraversalContext<B>,
    _strategy: PhantomData<S>,
}

impl<B: Backend, S> Clone for Single<B, S> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            _strategy: PhantomData,
        }
    }
}

impl<B: Backend, S: EntityStrategy<B>> Single<B, S> {
    pub(crate) fn new(ctx: TraversalContext<B>) -> Self {
        Self {
            ctx,
            _strategy: PhantomData,
        }
    }

    pub fn context(&self) -> &TraversalContext<B> {
        &self.ctx
    }

    pub fn path_filters(&self) -> &FilterPath {
        self.ctx.path()
    }

    pub async fn entity(&self) -> Result<S::Entity> {
        let element = self.element().await?;
        let entity = self.ctx.backend().convert(&element, Self::kind()).await?;
        S::Entity::from_entity(entity)
    }

    pub async fn exists(&self) -> Result<bool> {
        match self.element().await {
            Ok(_) => Ok(true),
            Err(InventoryError::EntityNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Outgoing relationships of this entity.
    pub fn relationships(&self) -> Relationships<B> {
        self.relationships_with(Direction::Outgoing)
    }

    pub fn relationships_with(&self, direction: Direction) -> Relationships<B> {
        Relationships::new(self.ctx.clone(), Self::kind(), direction)
    }

    pub(crate) async fn element(&self) -> Result<B::Element> {
        resolve_one(&self.ctx, Self::kind()).await
    }

    pub(crate) fn kind() -> EntityKind {
        <S::Entity as InventoryEntity>::KIND
    }
}

/// A view over zero or more entities. An empty result is not an error.
pub struct Multiple<B: Backend, S> {
    ctx: TraversalContext<B>,
    _strategy: PhantomData<S>,
}

impl<B: Backend, S> Clone for Multiple<B, S> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            _strategy: PhantomData,
        }
    }
}

impl<B: Backend, S: EntityStrategy<B>> Multiple<B, S> {
    pub(crate) fn new(ctx: TraversalContext<B>) -> Self {
        Self {
            ctx,
            _strategy: PhantomData,
        }
    }

    pub fn context(&self) -> &TraversalContext<B> {
        &self.ctx
    }

    pub fn path_filters(&self) -> &FilterPath {
        self.ctx.path()
    }

    /// One page of the matching entities, in resolution order unless the pager
    /// asks for an ordering.
    pub async fn entities(&self, pager: &Pager) -> Result<Page<S::Entity>> {
        self.fetch(effective_pager(&self.ctx, pager)).await
    }

    /// Every matching entity, ignoring the default page size.
    pub async fn all(&self) -> Result<Vec<S::Entity>> {
        Ok(self.fetch(Pager::unlimited()).await?.items)
    }

    async fn fetch(&self, pager: Pager) -> Result<Page<S::Entity>> {
        let kind = <S::Entity as InventoryEntity>::KIND;
        let backend = self.ctx.backend();
        let elements = backend.resolve(self.ctx.path()).await?;

        let mut entities = Vec::with_capacity(elements.len());
        for element in &elements {
            entities.push(backend.convert(element, kind).await?);
        }

        pager.sort(&mut entities, entity_field);
        let page = pager.slice(entities);

        let mut typed = Vec::with_capacity(page.items.len());
        for entity in page.items {
            typed.push(S::Entity::from_entity(entity)?);
        }
        Ok(Page {
            items: typed,
            total: page.total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.ctx.backend().resolve(self.ctx.path()).await?.len())
    }

    pub fn relationships(&self) -> Relationships<B> {
        self.relationships_with(Direction::Outgoing)
    }

    pub fn relationships_with(&self, direction: Direction) -> Relationships<B> {
        Relationships::new(
            self.ctx.clone(),
            <S::Entity as InventoryEntity>::KIND,
            direction,
        )
    }
}
