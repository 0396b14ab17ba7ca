//! The narrow contract the traversal engine requires from a graph store.
//!
//! Element handles (`Backend::Element`) identify nodes and edges inside one
//! backend. They never leave the engine: everything returned to callers is
//! addressed by canonical path.

use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;

use inventory_core::{
    CanonicalPath, DataView, Direction, Entity, EntityKind, Properties, RelativePath, Relationship,
    Result, StructuredData,
};

use crate::filter::FilterPath;

/// Storage operations consumed by the engine.
///
/// Every call is awaited to completion before the engine issues the next one,
/// and a backend must let a caller read its own writes within one sequence of
/// calls. Backend failures are reported as [`inventory_core::InventoryError::Backend`].
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Handle to a node or an edge.
    type Element: Clone + Debug + Eq + Hash + Send + Sync + 'static;

    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Execute a filter path, starting from every entity node.
    ///
    /// Results are de-duplicated and keep first-seen order. Structured-data
    /// nodes are never returned.
    async fn resolve(&self, path: &FilterPath) -> Result<Vec<Self::Element>>;

    /// Materialize an entity node. Fails with `Conversion` if the node is not an
    /// entity of `kind`. Data entities come back with their full value.
    async fn convert(&self, element: &Self::Element, kind: EntityKind) -> Result<Entity>;

    /// Materialize an edge between two entities.
    async fn convert_relationship(&self, edge: &Self::Element) -> Result<Relationship>;

    /// Materialize a structured-data node.
    async fn convert_data(&self, node: &Self::Element, view: DataView) -> Result<StructuredData>;

    /// Store a new entity node. Fails with `EntityAlreadyExists` if its path is
    /// already taken; the check and the insert are atomic.
    async fn persist(&self, entity: &Entity) -> Result<Self::Element>;

    /// Store a structured-data tree and return its root node.
    async fn persist_data(&self, value: &StructuredData) -> Result<Self::Element>;

    /// Replace the stored attributes of an entity node. The path must not change.
    async fn update(&self, element: &Self::Element, entity: &Entity) -> Result<()>;

    /// Create a directed edge. No policy is applied here.
    async fn relate(
        &self,
        source: &Self::Element,
        target: &Self::Element,
        label: &str,
        properties: &Properties,
    ) -> Result<Self::Element>;

    /// Delete a node (with its incident edges) or an edge.
    async fn delete(&self, element: &Self::Element) -> Result<()>;

    /// Edges incident to `node` in `direction`, optionally only those labelled `label`.
    ///
    /// Without a label only edges between two entities are returned; edges into
    /// structured data are reached by naming their label.
    async fn get_relationships(
        &self,
        node: &Self::Element,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<Self::Element>>;

    async fn get_relationship_source(&self, edge: &Self::Element) -> Result<Self::Element>;

    async fn get_relationship_target(&self, edge: &Self::Element) -> Result<Self::Element>;

    /// Delete a structured-data tree given its root node.
    async fn delete_structured_data(&self, root: &Self::Element) -> Result<()>;

    /// From a data entity node, follow its `hasData` edge and walk the
    /// key/index segments of `path`. `None` if any step is missing.
    async fn descend_to_data(
        &self,
        data_entity: &Self::Element,
        path: &RelativePath,
    ) -> Result<Option<Self::Element>>;

    async fn extract_canonical_path(&self, element: &Self::Element) -> Result<CanonicalPath>;
}
