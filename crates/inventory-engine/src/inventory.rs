//! Entry point of the traversal engine.

use std::sync::Arc;

use tracing::info;

use inventory_core::{
    CanonicalPath, Direction, Entity, EntityKind, InventoryEntity, InventoryError, Result,
};

use crate::backend::Backend;
use crate::context::TraversalContext;
use crate::fetch::{resolve_one, Single};
use crate::filter::Filter;
use crate::kinds::{EntityStrategy, Tenants};
use crate::mutate::{delete_cascade, ReadWrite};
use crate::notify::{NoopSink, NotificationSink};
use crate::registry::KindRegistry;
use crate::relationships::Relationships;

/// A backend together with the kind registry and notification sink the engine
/// works with.
///
/// Cloning is cheap: all clones share the same backend.
pub struct Inventory<B: Backend> {
    backend: Arc<B>,
    registry: Arc<KindRegistry<B>>,
    sink: Arc<dyn NotificationSink>,
    page_limit: Option<usize>,
}

impl<B: Backend> Clone for Inventory<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            registry: Arc::clone(&self.registry),
            sink: Arc::clone(&self.sink),
            page_limit: self.page_limit,
        }
    }
}

impl<B: Backend> Inventory<B> {
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<B>) -> Self {
        info!(backend = backend.name(), "Inventory initialized");
        Self {
            backend,
            registry: Arc::new(KindRegistry::standard()),
            sink: Arc::new(NoopSink),
            page_limit: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_registry(mut self, registry: KindRegistry<B>) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Page size used when callers ask for an unlimited page.
    pub fn with_page_limit(mut self, limit: Option<usize>) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn root(&self) -> TraversalContext<B> {
        TraversalContext::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.registry),
            Arc::clone(&self.sink),
        )
        .with_page_limit(self.page_limit)
    }

    pub fn tenants(&self) -> ReadWrite<B, Tenants> {
        ReadWrite::new(self.root().proceed_to(EntityKind::Tenant))
    }

    /// A typed view of the entity at `path`.
    pub fn inspect<S: EntityStrategy<B>>(&self, path: &CanonicalPath) -> Result<Single<B, S>> {
        let expected = <S::Entity as InventoryEntity>::KIND;
        if path.kind() != expected {
            return Err(InventoryError::IllegalArgument(format!(
                "{path} is a {}, not a {expected}",
                path.kind()
            )));
        }
        Ok(Single::new(self.root().replace_path(path)))
    }

    /// The entity at `path`, whatever its kind.
    pub async fn entity_at(&self, path: &CanonicalPath) -> Result<Entity> {
        let ctx = self.root().replace_path(path);
        let element = resolve_one(&ctx, path.kind()).await?;
        self.backend.convert(&element, path.kind()).await
    }

    /// Entities directly contained in the entity at `path`.
    pub async fn children_of(&self, path: &CanonicalPath) -> Result<Vec<Entity>> {
        let ctx = self.root().replace_path(path);
        resolve_one(&ctx, path.kind()).await?;

        let children = ctx.path().with_filters(vec![Filter::contains()]);
        let mut entities = Vec::new();
        for element in self.backend.resolve(&children).await? {
            let child = self.backend.extract_canonical_path(&element).await?;
            entities.push(self.backend.convert(&element, child.kind()).await?);
        }
        Ok(entities)
    }

    /// Delete the entity at `path` and everything it contains.
    pub async fn delete_at(&self, path: &CanonicalPath) -> Result<()> {
        let ctx = self.root().replace_path(path);
        let element = resolve_one(&ctx, path.kind()).await?;
        delete_cascade(&ctx, element).await
    }

    pub fn relationships_of(&self, path: &CanonicalPath, direction: Direction) -> Relationships<B> {
        Relationships::new(self.root().replace_path(path), path.kind(), direction)
    }
}
