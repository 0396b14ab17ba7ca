//! inventory-core: Shared model types, addressing, and error handling for the inventory graph.
//!
//! This crate provides the foundational types used by the traversal engine and its backends:
//! - Entity kinds (Tenant, Environment, Resource, etc.) and their containment rules
//! - Canonical and relative paths, the only identity an entity has outside a backend
//! - Entity, blueprint, and update types plus relationships between entities
//! - Structured data payloads attached to entities
//! - Paging, domain events, configuration management
//! - The common error taxonomy

pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod kind;
pub mod model;
pub mod paging;
pub mod path;

pub use data::{DataRole, DataView, Shape, StructuredData};
pub use error::{InventoryError, Result};
pub use events::{Action, EventPayload, InventoryEvent};
pub use kind::EntityKind;
pub use model::{
    BasicBlueprint, DataEntity, DataEntityBlueprint, DataEntityUpdate, Direction, Entity, EntityUpdate,
    Environment, EnvironmentBlueprint, Feed, FeedBlueprint, InventoryEntity, Metric,
    MetricBlueprint, MetricType, MetricTypeBlueprint, Properties, Relationship, Resource,
    ResourceBlueprint, ResourceType, ResourceTypeBlueprint, Tenant, TenantBlueprint, WellKnown,
};
pub use paging::{Order, Page, Pager, SortDirection};
pub use path::{CanonicalPath, RelativePath, RelativeSegment, Segment};
