//! Domain events emitted after a mutation completes.
//!
//! The engine only produces these; fanning them out to subscribers is the job of
//! whatever notification sink the caller plugs in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Entity, Relationship};

/// Unique identifier for an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

/// An event describing one committed change to the inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEvent {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl InventoryEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn entity_created(entity: Entity) -> Self {
        Self::new(EventPayload::EntityCreated { entity })
    }

    pub fn entity_updated(old: Entity, new: Entity) -> Self {
        Self::new(EventPayload::EntityUpdated { old, new })
    }

    pub fn entity_deleted(entity: Entity) -> Self {
        Self::new(EventPayload::EntityDeleted { entity })
    }

    pub fn action(&self) -> Action {
        self.payload.action()
    }
}

/// The event payload, tagged by type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EventPayload {
    EntityCreated { entity: Entity },
    EntityUpdated { old: Entity, new: Entity },
    EntityDeleted { entity: Entity },
    RelationshipCreated { relationship: Relationship },
    RelationshipDeleted { relationship: Relationship },
}

impl EventPayload {
    pub fn action(&self) -> Action {
        match self {
            EventPayload::EntityCreated { .. } | EventPayload::RelationshipCreated { .. } => {
                Action::Created
            }
            EventPayload::EntityUpdated { .. } => Action::Updated,
            EventPayload::EntityDeleted { .. } | EventPayload::RelationshipDeleted { .. } => {
                Action::Deleted
            }
        }
    }
}
