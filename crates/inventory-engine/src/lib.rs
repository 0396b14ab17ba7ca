//! inventory-engine: path-and-filter traversal over the inventory graph.
//!
//! A fluent query such as
//! `inventory.tenants().get("acme").environments().get("prod").resources().get_all()`
//! accumulates a [`FilterPath`] without touching storage. The terminal `async`
//! call hands that path to a [`Backend`], which walks its graph and returns
//! element handles the engine converts into typed entities.
//!
//! Mutations follow one template for every kind; per-kind behaviour (id
//! derivation, implicit edges, dependent cleanup) comes from the strategy
//! values in [`kinds`].

pub mod backend;
pub mod context;
pub mod data;
pub mod fetch;
pub mod filter;
pub mod inventory;
pub mod kinds;
pub mod memory;
pub mod mutate;
pub mod navigate;
pub mod notify;
pub mod registry;
pub mod relationships;

pub use backend::Backend;
pub use context::{ImplicitRelationship, TraversalContext};
pub use fetch::{Multiple, Single};
pub use filter::{Accumulator, Filter, FilterPath, Step};
pub use inventory::Inventory;
pub use kinds::{
    Cleanup, Data, EntityStrategy, Environments, Feeds, MetricTypes, Metrics, ResourceTypes,
    Resources, Tenants, WiredUp,
};
pub use memory::{MemoryBackend, MemoryElement};
pub use mutate::{Read, ReadWrite};
pub use notify::{BroadcastSink, CollectingSink, NoopSink, NotificationSink};
pub use registry::KindRegistry;
pub use relationships::{Associations, MultipleRelationships, Relationships, SingleRelationship};
