//! Kind table used to dispatch per-kind cleanup when deletes cascade.

use std::collections::HashMap;
use std::sync::Arc;

use inventory_core::{EntityKind, InventoryEntity, InventoryError, Result};

use crate::backend::Backend;
use crate::kinds::{
    Cleanup, Data, EntityStrategy, Environments, Feeds, MetricTypes, Metrics, ResourceTypes,
    Resources, Tenants,
};

/// Maps each entity kind to the cleanup of its strategy.
///
/// Built once when an [`crate::Inventory`] is constructed and only read afterwards.
pub struct KindRegistry<B: Backend> {
    cleanups: HashMap<EntityKind, Arc<dyn Cleanup<B>>>,
}

impl<B: Backend> Default for KindRegistry<B> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<B: Backend> KindRegistry<B> {
    pub fn empty() -> Self {
        Self {
            cleanups: HashMap::new(),
        }
    }

    /// Every built-in kind with its built-in strategy.
    pub fn standard() -> Self {
        Self::empty()
            .register(Tenants)
            .register(Environments)
            .register(Feeds)
            .register(ResourceTypes)
            .register(MetricTypes)
            .register(Resources)
            .register(Metrics)
            .register(Data)
    }

    pub fn register<S: EntityStrategy<B>>(self, strategy: S) -> Self {
        self.register_cleanup(<S::Entity as InventoryEntity>::KIND, Arc::new(strategy))
    }

    /// Replace the cleanup for one kind.
    pub fn register_cleanup(mut self, kind: EntityKind, cleanup: Arc<dyn Cleanup<B>>) -> Self {
        self.cleanups.insert(kind, cleanup);
        self
    }

    pub fn cleanup_for(&self, kind: EntityKind) -> Result<Arc<dyn Cleanup<B>>> {
        self.cleanups.get(&kind).cloned().ok_or_else(|| {
            InventoryError::Unsupported(format!("no strategy registered for {kind}"))
        })
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        self.cleanups.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.cleanups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cleanups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[test]
    fn standard_registry_covers_every_kind() {
        let registry = KindRegistry::<MemoryBackend>::standard();
        assert_eq!(registry.len(), EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            assert!(registry.contains(kind), "{kind} missing");
        }
    }

    #[test]
    fn unregistered_kind_is_unsupported() {
        let registry = KindRegistry::<MemoryBackend>::empty().register(Tenants);
        assert!(registry.cleanup_for(EntityKind::Tenant).is_ok());
        assert!(matches!(
            registry.cleanup_for(EntityKind::Feed),
            Err(InventoryError::Unsupported(_))
        ));
    }
}
