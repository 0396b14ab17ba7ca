//! inventory-graph: Neo4j storage for the inventory traversal engine.
//!
//! Entities are stored as `:Entity:<Kind>` nodes keyed by their canonical path,
//! structured data as trees of `:StructuredData` nodes, and every relationship
//! between them as a `RELATES` edge carrying its label. [`Neo4jBackend`] is the
//! engine-facing [`inventory_engine::Backend`]; [`GraphClient`] is the pooled
//! connection it runs on.

pub mod backend;
pub mod client;
pub mod cypher;
pub mod mutations;
pub mod queries;
pub mod records;

pub use backend::Neo4jBackend;
pub use client::{GraphClient, GraphConfig, GraphError};
pub use records::GraphElement;
