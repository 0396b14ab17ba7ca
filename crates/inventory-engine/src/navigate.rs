//! Kind-specific navigation from entity views.
//!
//! From a single entity, contained kinds come back read-write: new entities can
//! be created under it. From multiple entities they are read-only.

use inventory_core::{Direction, EntityKind, InventoryEntity, WellKnown};

use crate::backend::Backend;
use crate::fetch::{Multiple, Single};
use crate::kinds::{
    Data, EntityStrategy, Environments, Feeds, MetricTypes, Metrics, ResourceTypes, Resources,
    Tenants,
};
use crate::mutate::{Read, ReadWrite};
use crate::relationships::Associations;

fn kind<B: Backend, S: EntityStrategy<B>>() -> EntityKind {
    <S::Entity as InventoryEntity>::KIND
}

impl<B: Backend, P: EntityStrategy<B>> Single<B, P> {
    fn contained<S: EntityStrategy<B>>(&self) -> ReadWrite<B, S> {
        ReadWrite::new(self.context().proceed_to(kind::<B, S>()))
    }

    fn over<S: EntityStrategy<B>>(&self, label: WellKnown, direction: Direction) -> Read<B, S> {
        Read::new(
            self.context()
                .proceed_over(label.name(), direction, kind::<B, S>()),
        )
    }
}

impl<B: Backend, P: EntityStrategy<B>> Multiple<B, P> {
    fn contained<S: EntityStrategy<B>>(&self) -> Read<B, S> {
        Read::new(self.context().proceed_to(kind::<B, S>()))
    }

    fn over<S: EntityStrategy<B>>(&self, label: WellKnown, direction: Direction) -> Read<B, S> {
        Read::new(
            self.context()
                .proceed_over(label.name(), direction, kind::<B, S>()),
        )
    }
}

// ── Single ───────────────────────────────────────────────────────

impl<B: Backend> Single<B, Tenants> {
    pub fn environments(&self) -> ReadWrite<B, Environments> {
        self.contained()
    }

    pub fn resource_types(&self) -> ReadWrite<B, ResourceTypes> {
        self.contained()
    }

    pub fn metric_types(&self) -> ReadWrite<B, MetricTypes> {
        self.contained()
    }
}

impl<B: Backend> Single<B, Environments> {
    pub fn feeds(&self) -> ReadWrite<B, Feeds> {
        self.contained()
    }

    pub fn resources(&self) -> ReadWrite<B, Resources> {
        self.contained()
    }

    pub fn metrics(&self) -> ReadWrite<B, Metrics> {
        self.contained()
    }
}

impl<B: Backend> Single<B, Feeds> {
    pub fn resources(&self) -> ReadWrite<B, Resources> {
        self.contained()
    }

    pub fn metrics(&self) -> ReadWrite<B, Metrics> {
        self.contained()
    }
}

impl<B: Backend> Single<B, ResourceTypes> {
    pub fn data(&self) -> ReadWrite<B, Data> {
        self.contained()
    }

    /// Resources of this type, wherever they live.
    pub fn resources(&self) -> Read<B, Resources> {
        self.over(WellKnown::Defines, Direction::Outgoing)
    }
}

impl<B: Backend> Single<B, MetricTypes> {
    /// Metrics of this type, wherever they live.
    pub fn metrics(&self) -> Read<B, Metrics> {
        self.over(WellKnown::Defines, Direction::Outgoing)
    }
}

impl<B: Backend> Single<B, Resources> {
    pub fn data(&self) -> ReadWrite<B, Data> {
        self.contained()
    }

    /// Metrics this resource owns.
    pub fn metrics(&self) -> Associations<B> {
        Associations::new(self.clone())
    }

    pub fn resource_type(&self) -> Single<B, ResourceTypes> {
        Single::new(self.context().proceed_over(
            WellKnown::Defines.name(),
            Direction::Incoming,
            EntityKind::ResourceType,
        ))
    }
}

impl<B: Backend> Single<B, Metrics> {
    pub fn metric_type(&self) -> Single<B, MetricTypes> {
        Single::new(self.context().proceed_over(
            WellKnown::Defines.name(),
            Direction::Incoming,
            EntityKind::MetricType,
        ))
    }
}

// ── Multiple ─────────────────────────────────────────────────────

impl<B: Backend> Multiple<B, Tenants> {
    pub fn environments(&self) -> Read<B, Environments> {
        self.contained()
    }

    pub fn resource_types(&self) -> Read<B, ResourceTypes> {
        self.contained()
    }

    pub fn metric_types(&self) -> Read<B, MetricTypes> {
        self.contained()
    }
}

impl<B: Backend> Multiple<B, Environments> {
    pub fn feeds(&self) -> Read<B, Feeds> {
        self.contained()
    }

    pub fn resources(&self) -> Read<B, Resources> {
        self.contained()
    }

    pub fn metrics(&self) -> Read<B, Metrics> {
        self.contained()
    }
}

impl<B: Backend> Multiple<B, Feeds> {
    pub fn resources(&self) -> Read<B, Resources> {
        self.contained()
    }

    pub fn metrics(&self) -> Read<B, Metrics> {
        self.contained()
    }
}

impl<B: Backend> Multiple<B, ResourceTypes> {
    pub fn data(&self) -> Read<B, Data> {
        self.contained()
    }

    pub fn resources(&self) -> Read<B, Resources> {
        self.over(WellKnown::Defines, Direction::Outgoing)
    }
}

impl<B: Backend> Multiple<B, MetricTypes> {
    pub fn metrics(&self) -> Read<B, Metrics> {
        self.over(WellKnown::Defines, Direction::Outgoing)
    }
}

impl<B: Backend> Multiple<B, Resources> {
    pub fn data(&self) -> Read<B, Data> {
        self.contained()
    }

    pub fn metrics(&self) -> Read<B, Metrics> {
        self.over(WellKnown::Owns, Direction::Outgoing)
    }
}
