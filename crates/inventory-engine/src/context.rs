//! Immutable traversal state shared by fetchers, mutators and relationship views.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use inventory_core::{
    CanonicalPath, Direction, EntityKind, InventoryError, InventoryEvent, Properties, Result,
    WellKnown,
};

use crate::backend::Backend;
use crate::filter::{Filter, FilterPath, Step};
use crate::notify::NotificationSink;
use crate::registry::KindRegistry;

/// Edges the engine creates on its own as part of the entity structure.
///
/// These never pass through relationship policy and callers cannot create them
/// through [`TraversalContext::relate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplicitRelationship {
    Contains,
    Defines,
    HasData,
}

impl ImplicitRelationship {
    pub const ALL: [ImplicitRelationship; 3] = [
        ImplicitRelationship::Contains,
        ImplicitRelationship::Defines,
        ImplicitRelationship::HasData,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ImplicitRelationship::Contains => WellKnown::Contains.name(),
            ImplicitRelationship::Defines => WellKnown::Defines.name(),
            ImplicitRelationship::HasData => WellKnown::HasData.name(),
        }
    }

    pub fn is_reserved(label: &str) -> bool {
        Self::ALL.iter().any(|r| r.label() == label)
    }
}

/// Where a traversal currently stands, plus the handles needed to act there.
///
/// Every operation returns a new context; nothing here is ever mutated.
pub struct TraversalContext<B: Backend> {
    backend: Arc<B>,
    registry: Arc<KindRegistry<B>>,
    sink: Arc<dyn NotificationSink>,
    page_limit: Option<usize>,
    path: FilterPath,
    kind: Option<EntityKind>,
    /// The position this one was reached from by a hop.
    origin: Option<Arc<TraversalContext<B>>>,
}

impl<B: Backend> Clone for TraversalContext<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            registry: Arc::clone(&self.registry),
            sink: Arc::clone(&self.sink),
            page_limit: self.page_limit,
            path: self.path.clone(),
            kind: self.kind,
            origin: self.origin.clone(),
        }
    }
}

impl<B: Backend> fmt::Debug for TraversalContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalContext")
            .field("backend", &self.backend.name())
            .field("path", &self.path.to_string())
            .field("kind", &self.kind)
            .finish()
    }
}

impl<B: Backend> TraversalContext<B> {
    /// A context positioned before the first step: the whole graph.
    pub fn new(
        backend: Arc<B>,
        registry: Arc<KindRegistry<B>>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            backend,
            registry,
            sink,
            page_limit: None,
            path: FilterPath::new(),
            kind: None,
            origin: None,
        }
    }

    pub fn with_page_limit(mut self, limit: Option<usize>) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &KindRegistry<B> {
        &self.registry
    }

    pub fn sink(&self) -> &dyn NotificationSink {
        self.sink.as_ref()
    }

    pub fn page_limit(&self) -> Option<usize> {
        self.page_limit
    }

    pub fn path(&self) -> &FilterPath {
        &self.path
    }

    /// Kind of the entities at this position, `None` before the first step.
    pub fn kind(&self) -> Option<EntityKind> {
        self.kind
    }

    /// The context this position was reached from.
    pub fn origin(&self) -> Option<&TraversalContext<B>> {
        self.origin.as_deref()
    }

    pub fn parent_path(&self) -> Option<&FilterPath> {
        self.origin().map(TraversalContext::path)
    }

    /// Move to the entities of `kind` contained in the current position.
    /// From the root this selects every entity of `kind`.
    pub fn proceed_to(&self, kind: EntityKind) -> Self {
        let filters = if self.path.is_empty() {
            vec![Filter::of_type(kind)]
        } else {
            vec![Filter::contains(), Filter::of_type(kind)]
        };
        self.hop(Step::single(filters), kind)
    }

    /// Move across `label` edges to entities of `kind`.
    pub fn proceed_over(&self, label: &str, direction: Direction, kind: EntityKind) -> Self {
        self.hop(
            Step::single(vec![
                Filter::related_by_in(label, direction),
                Filter::of_type(kind),
            ]),
            kind,
        )
    }

    /// Move by an arbitrary step that lands on entities of `kind`.
    pub fn hop(&self, step: Step, kind: EntityKind) -> Self {
        let mut next = self.clone();
        next.path = self.path.with_step(step);
        next.kind = Some(kind);
        next.origin = Some(Arc::new(self.clone()));
        next
    }

    /// Narrow the current position by one AND-sequence.
    pub fn where_filters(&self, filters: Vec<Filter>) -> Self {
        self.where_all(vec![filters])
    }

    /// Narrow the current position by the union of several AND-sequences.
    pub fn where_all(&self, alternatives: Vec<Vec<Filter>>) -> Self {
        let mut next = self.clone();
        next.path = self.path.with_step(Step::any_of(alternatives));
        next
    }

    /// A context positioned exactly at the entity with the given path.
    pub fn replace_path(&self, path: &CanonicalPath) -> Self {
        let origin = path.parent().map(|parent| Arc::new(self.replace_path(&parent)));
        let mut next = self.clone();
        next.path = FilterPath::to(path);
        next.kind = Some(path.kind());
        next.origin = origin;
        next
    }

    /// Like [`Self::replace_path`], with the position itself selected by `filters`.
    pub fn replace_path_with(&self, path: &CanonicalPath, filters: FilterPath) -> Self {
        let mut next = self.replace_path(path);
        next.path = filters;
        next
    }

    /// Create a structural edge without any policy check.
    pub(crate) async fn relate_internal(
        &self,
        source: &B::Element,
        target: &B::Element,
        relationship: ImplicitRelationship,
    ) -> Result<B::Element> {
        debug!(label = relationship.label(), "Creating implicit relationship");
        self.backend
            .relate(source, target, relationship.label(), &Properties::new())
            .await
    }

    /// Create a caller-requested edge.
    ///
    /// Structural labels are rejected, as is a second edge with the same label
    /// between the same two entities.
    pub async fn relate(
        &self,
        source: &B::Element,
        target: &B::Element,
        label: &str,
        properties: &Properties,
    ) -> Result<B::Element> {
        if label.is_empty() {
            return Err(InventoryError::IllegalArgument(
                "relationship label must not be empty".to_string(),
            ));
        }
        if ImplicitRelationship::is_reserved(label) {
            return Err(InventoryError::IllegalArgument(format!(
                "'{label}' relationships are managed by the inventory and cannot be created directly"
            )));
        }

        let existing = self
            .backend
            .get_relationships(source, Direction::Outgoing, Some(label))
            .await?;
        for edge in &existing {
            if self.backend.get_relationship_target(edge).await? == *target {
                let from = self.backend.extract_canonical_path(source).await?;
                let to = self.backend.extract_canonical_path(target).await?;
                return Err(InventoryError::RelationAlreadyExists {
                    label: label.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        }

        debug!(label, "Creating relationship");
        self.backend.relate(source, target, label, properties).await
    }

    /// Hand committed events to the notification sink.
    pub(crate) fn publish(&self, events: Vec<InventoryEvent>) {
        if !events.is_empty() {
            self.sink.publish(events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::notify::NoopSink;
    use inventory_core::{Entity, Tenant};

    fn context(backend: Arc<MemoryBackend>) -> TraversalContext<MemoryBackend> {
        TraversalContext::new(
            backend,
            Arc::new(KindRegistry::standard()),
            Arc::new(NoopSink),
        )
    }

    fn tenant(id: &str) -> Entity {
        Entity::Tenant(Tenant {
            path: CanonicalPath::tenant(id).unwrap(),
            properties: Properties::new(),
        })
    }

    #[test]
    fn proceed_to_from_root_selects_by_type_only() {
        let ctx = context(Arc::new(MemoryBackend::new()));
        let tenants = ctx.proceed_to(EntityKind::Tenant);
        assert_eq!(tenants.path().to_string(), "[WithType(Tenant)]");
        assert!(tenants.origin().unwrap().path().is_empty());

        let narrowed = tenants.where_filters(vec![Filter::id("acme")]);
        assert_eq!(narrowed.kind(), Some(EntityKind::Tenant));
        assert!(narrowed.parent_path().unwrap().is_empty());
    }

    #[test]
    fn replace_path_rebuilds_origins() {
        let ctx = context(Arc::new(MemoryBackend::new()));
        let path: CanonicalPath = "/t;acme/e;prod/r;host1".parse().unwrap();
        let at = ctx.replace_path(&path);

        assert_eq!(at.kind(), Some(EntityKind::Resource));
        let env = at.origin().unwrap();
        assert_eq!(env.kind(), Some(EntityKind::Environment));
        assert_eq!(env.origin().unwrap().kind(), Some(EntityKind::Tenant));
        assert!(env.origin().unwrap().origin().is_none());
    }

    #[tokio::test]
    async fn relate_enforces_label_policy() {
        let backend = Arc::new(MemoryBackend::new());
        let ctx = context(backend.clone());
        let a = backend.persist(&tenant("a")).await.unwrap();
        let b = backend.persist(&tenant("b")).await.unwrap();
        let none = Properties::new();

        for label in ["", "contains", "defines", "hasData"] {
            let err = ctx.relate(&a, &b, label, &none).await.unwrap_err();
            assert!(matches!(err, InventoryError::IllegalArgument(_)), "{label}");
        }

        ctx.relate(&a, &b, "likes", &none).await.unwrap();
        let err = ctx.relate(&a, &b, "likes", &none).await.unwrap_err();
        match err {
            InventoryError::RelationAlreadyExists { label, from, to } => {
                assert_eq!(label, "likes");
                assert_eq!(from, "/t;a");
                assert_eq!(to, "/t;b");
            }
            other => panic!("unexpected error {other}"),
        }

        // Reverse direction is a distinct edge.
        ctx.relate(&b, &a, "likes", &none).await.unwrap();
    }
}
