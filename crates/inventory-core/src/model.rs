//! Entity types for the inventory graph.
//!
//! Every entity carries its [`CanonicalPath`] (the only identity it has outside a
//! backend) and a free-form property map. Kind-specific attributes live on the
//! individual structs; [`Entity`] wraps them all.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{DataRole, StructuredData};
use crate::error::{InventoryError, Result};
use crate::kind::EntityKind;
use crate::path::CanonicalPath;

pub type Properties = BTreeMap<String, serde_json::Value>;

// ── Entities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub path: CanonicalPath,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub path: CanonicalPath,
    #[serde(default)]
    pub properties: Properties,
}

/// An agent feeding resources and metrics into an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub path: CanonicalPath,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
    pub path: CanonicalPath,
    pub version: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricType {
    pub path: CanonicalPath,
    pub unit: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub path: CanonicalPath,
    pub resource_type: CanonicalPath,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub path: CanonicalPath,
    pub metric_type: CanonicalPath,
    #[serde(default)]
    pub properties: Properties,
}

/// A role-named structured data payload owned by another entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntity {
    pub path: CanonicalPath,
    pub role: DataRole,
    #[serde(default)]
    pub value: StructuredData,
    #[serde(default)]
    pub properties: Properties,
}

impl DataEntity {
    /// Path of the entity that owns this data.
    pub fn owner(&self) -> Option<CanonicalPath> {
        self.path.parent()
    }
}

/// Enum wrapper for all entity types in the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Entity {
    Tenant(Tenant),
    Environment(Environment),
    Feed(Feed),
    ResourceType(ResourceType),
    MetricType(MetricType),
    Resource(Resource),
    Metric(Metric),
    DataEntity(DataEntity),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Tenant(_) => EntityKind::Tenant,
            Entity::Environment(_) => EntityKind::Environment,
            Entity::Feed(_) => EntityKind::Feed,
            Entity::ResourceType(_) => EntityKind::ResourceType,
            Entity::MetricType(_) => EntityKind::MetricType,
            Entity::Resource(_) => EntityKind::Resource,
            Entity::Metric(_) => EntityKind::Metric,
            Entity::DataEntity(_) => EntityKind::DataEntity,
        }
    }

    pub fn path(&self) -> &CanonicalPath {
        match self {
            Entity::Tenant(e) => &e.path,
            Entity::Environment(e) => &e.path,
            Entity::Feed(e) => &e.path,
            Entity::ResourceType(e) => &e.path,
            Entity::MetricType(e) => &e.path,
            Entity::Resource(e) => &e.path,
            Entity::Metric(e) => &e.path,
            Entity::DataEntity(e) => &e.path,
        }
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Entity::Tenant(e) => &e.properties,
            Entity::Environment(e) => &e.properties,
            Entity::Feed(e) => &e.properties,
            Entity::ResourceType(e) => &e.properties,
            Entity::MetricType(e) => &e.properties,
            Entity::Resource(e) => &e.properties,
            Entity::Metric(e) => &e.properties,
            Entity::DataEntity(e) => &e.properties,
        }
    }

    pub fn id(&self) -> &str {
        self.path().id()
    }

    /// Convert into a concrete entity type, failing if the kinds differ.
    pub fn into_typed<E: InventoryEntity>(self) -> Result<E> {
        E::from_entity(self)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind(), self.path())
    }
}

fn mismatch(expected: EntityKind, actual: &Entity) -> InventoryError {
    InventoryError::Conversion {
        expected: expected.to_string(),
        actual: actual.kind().to_string(),
    }
}

// ── Blueprints & Updates ─────────────────────────────────────────

/// Blueprint for entities without kind-specific attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicBlueprint {
    pub id: String,
    #[serde(default)]
    pub properties: Properties,
}

impl BasicBlueprint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

pub type TenantBlueprint = BasicBlueprint;
pub type EnvironmentBlueprint = BasicBlueprint;
pub type FeedBlueprint = BasicBlueprint;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTypeBlueprint {
    pub id: String,
    pub version: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

impl ResourceTypeBlueprint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTypeBlueprint {
    pub id: String,
    pub unit: String,
    #[serde(default)]
    pub properties: Properties,
}

impl MetricTypeBlueprint {
    pub fn new(id: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            unit: unit.into(),
            properties: Properties::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBlueprint {
    pub id: String,
    pub resource_type: CanonicalPath,
    #[serde(default)]
    pub properties: Properties,
}

impl ResourceBlueprint {
    pub fn new(id: impl Into<String>, resource_type: CanonicalPath) -> Self {
        Self {
            id: id.into(),
            resource_type,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBlueprint {
    pub id: String,
    pub metric_type: CanonicalPath,
    #[serde(default)]
    pub properties: Properties,
}

impl MetricBlueprint {
    pub fn new(id: impl Into<String>, metric_type: CanonicalPath) -> Self {
        Self {
            id: id.into(),
            metric_type,
            properties: Properties::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntityBlueprint {
    pub role: DataRole,
    pub value: StructuredData,
}

impl DataEntityBlueprint {
    pub fn new(role: DataRole, value: impl Into<StructuredData>) -> Self {
        Self {
            role,
            value: value.into(),
        }
    }
}

/// Property replacement for non-data entities. `None` leaves properties untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub properties: Option<Properties>,
}

impl EntityUpdate {
    pub fn properties(properties: Properties) -> Self {
        Self {
            properties: Some(properties),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntityUpdate {
    pub value: StructuredData,
}

// ── Typed Entity Contract ────────────────────────────────────────

/// Ties an entity struct to its kind, blueprint, and update types.
pub trait InventoryEntity: Clone + fmt::Debug + Send + Sync + 'static {
    const KIND: EntityKind;
    type Blueprint: Clone + fmt::Debug + Send + Sync + 'static;
    type Update: Clone + fmt::Debug + Send + Sync + 'static;

    fn path(&self) -> &CanonicalPath;
    fn properties(&self) -> &Properties;
    fn from_entity(entity: Entity) -> Result<Self>;
    fn into_entity(self) -> Entity;

    /// Build the entity a blueprint describes, once its path is known.
    fn from_blueprint(path: CanonicalPath, blueprint: &Self::Blueprint) -> Self;

    fn apply_update(&mut self, update: &Self::Update);

    fn id(&self) -> &str {
        self.path().id()
    }
}

fn replace_properties(target: &mut Properties, update: &EntityUpdate) {
    if let Some(properties) = &update.properties {
        target.clone_from(properties);
    }
}

impl InventoryEntity for Tenant {
    const KIND: EntityKind = EntityKind::Tenant;
    type Blueprint = TenantBlueprint;
    type Update = EntityUpdate;

    fn path(&self) -> &CanonicalPath {
        &self.path
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::Tenant(e) => Ok(e),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn into_entity(self) -> Entity {
        Entity::Tenant(self)
    }

    fn from_blueprint(path: CanonicalPath, blueprint: &Self::Blueprint) -> Self {
        Self {
            path,
            properties: blueprint.properties.clone(),
        }
    }

    fn apply_update(&mut self, update: &Self::Update) {
        replace_properties(&mut self.properties, update);
    }
}

impl InventoryEntity for Environment {
    const KIND: EntityKind = EntityKind::Environment;
    type Blueprint = EnvironmentBlueprint;
    type Update = EntityUpdate;

    fn path(&self) -> &CanonicalPath {
        &self.path
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::Environment(e) => Ok(e),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn into_entity(self) -> Entity {
        Entity::Environment(self)
    }

    fn from_blueprint(path: CanonicalPath, blueprint: &Self::Blueprint) -> Self {
        Self {
            path,
            properties: blueprint.properties.clone(),
        }
    }

    fn apply_update(&mut self, update: &Self::Update) {
        replace_properties(&mut self.properties, update);
    }
}

impl InventoryEntity for Feed {
    const KIND: EntityKind = EntityKind::Feed;
    type Blueprint = FeedBlueprint;
    type Update = EntityUpdate;

    fn path(&self) -> &CanonicalPath {
        &self.path
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::Feed(e) => Ok(e),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn into_entity(self) -> Entity {
        Entity::Feed(self)
    }

    fn from_blueprint(path: CanonicalPath, blueprint: &Self::Blueprint) -> Self {
        Self {
            path,
            properties: blueprint.properties.clone(),
        }
    }

    fn apply_update(&mut self, update: &Self::Update) {
        replace_properties(&mut self.properties, update);
    }
}

impl InventoryEntity for ResourceType {
    const KIND: EntityKind = EntityKind::ResourceType;
    type Blueprint = ResourceTypeBlueprint;
    type Update = EntityUpdate;

    fn path(&self) -> &CanonicalPath {
        &self.path
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::ResourceType(e) => Ok(e),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn into_entity(self) -> Entity {
        Entity::ResourceType(self)
    }

    fn from_blueprint(path: CanonicalPath, blueprint: &Self::Blueprint) -> Self {
        Self {
            path,
            version: blueprint.version.clone(),
            properties: blueprint.properties.clone(),
        }
    }

    fn apply_update(&mut self, update: &Self::Update) {
        replace_properties(&mut self.properties, update);
    }
}

impl InventoryEntity for MetricType {
    const KIND: EntityKind = EntityKind::MetricType;
    type Blueprint = MetricTypeBlueprint;
    type Update = EntityUpdate;

    fn path(&self) -> &CanonicalPath {
        &self.path
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::MetricType(e) => Ok(e),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn into_entity(self) -> Entity {
        Entity::MetricType(self)
    }

    fn from_blueprint(path: CanonicalPath, blueprint: &Self::Blueprint) -> Self {
        Self {
            path,
            unit: blueprint.unit.clone(),
            properties: blueprint.properties.clone(),
        }
    }

    fn apply_update(&mut self, update: &Self::Update) {
        replace_properties(&mut self.properties, update);
    }
}

impl InventoryEntity for Resource {
    const KIND: EntityKind = EntityKind::Resource;
    type Blueprint = ResourceBlueprint;
    type Update = EntityUpdate;

    fn path(&self) -> &CanonicalPath {
        &self.path
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::Resource(e) => Ok(e),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn into_entity(self) -> Entity {
        Entity::Resource(self)
    }

    fn from_blueprint(path: CanonicalPath, blueprint: &Self::Blueprint) -> Self {
        Self {
            path,
            resource_type: blueprint.resource_type.clone(),
            properties: blueprint.properties.clone(),
        }
    }

    fn apply_update(&mut self, update: &Self::Update) {
        replace_properties(&mut self.properties, update);
    }
}

impl InventoryEntity for Metric {
    const KIND: EntityKind = EntityKind::Metric;
    type Blueprint = MetricBlueprint;
    type Update = EntityUpdate;

    fn path(&self) -> &CanonicalPath {
        &self.path
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::Metric(e) => Ok(e),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn into_entity(self) -> Entity {
        Entity::Metric(self)
    }

    fn from_blueprint(path: CanonicalPath, blueprint: &Self::Blueprint) -> Self {
        Self {
            path,
            metric_type: blueprint.metric_type.clone(),
            properties: blueprint.properties.clone(),
        }
    }

    fn apply_update(&mut self, update: &Self::Update) {
        replace_properties(&mut self.properties, update);
    }
}

impl InventoryEntity for DataEntity {
    const KIND: EntityKind = EntityKind::DataEntity;
    type Blueprint = DataEntityBlueprint;
    type Update = DataEntityUpdate;

    fn path(&self) -> &CanonicalPath {
        &self.path
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        match entity {
            Entity::DataEntity(e) => Ok(e),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }

    fn into_entity(self) -> Entity {
        Entity::DataEntity(self)
    }

    fn from_blueprint(path: CanonicalPath, blueprint: &Self::Blueprint) -> Self {
        Self {
            path,
            role: blueprint.role,
            value: blueprint.value.clone(),
            properties: Properties::new(),
        }
    }

    fn apply_update(&mut self, update: &Self::Update) {
        self.value = update.value.clone();
    }
}

// ── Relationships ────────────────────────────────────────────────

/// Relationship labels the inventory itself understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum WellKnown {
    Contains,
    Defines,
    Owns,
    Incorporates,
    IsParentOf,
    HasData,
}

impl WellKnown {
    pub fn name(&self) -> &'static str {
        match self {
            WellKnown::Contains => "contains",
            WellKnown::Defines => "defines",
            WellKnown::Owns => "owns",
            WellKnown::Incorporates => "incorporates",
            WellKnown::IsParentOf => "isParentOf",
            WellKnown::HasData => "hasData",
        }
    }
}

impl fmt::Display for WellKnown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Edges are directed; traversals must say which way to look.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

impl std::str::FromStr for Direction {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "outgoing" | "out" => Ok(Direction::Outgoing),
            "incoming" | "in" => Ok(Direction::Incoming),
            "both" => Ok(Direction::Both),
            _ => Err(InventoryError::IllegalArgument(format!(
                "invalid direction '{s}'. Choose: outgoing, incoming, both"
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outgoing => f.write_str("outgoing"),
            Direction::Incoming => f.write_str("incoming"),
            Direction::Both => f.write_str("both"),
        }
    }
}

/// A directed, labelled edge between two entities with its own identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub label: String,
    pub source: Entity,
    pub target: Entity,
    #[serde(default)]
    pub properties: Properties,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> CanonicalPath {
        CanonicalPath::tenant("acme").unwrap()
    }

    #[test]
    fn entity_serialization_roundtrip() {
        let rt = tenant().extend(EntityKind::ResourceType, "linux").unwrap();
        let resource = Resource {
            path: tenant()
                .extend(EntityKind::Environment, "prod")
                .unwrap()
                .extend(EntityKind::Resource, "host1")
                .unwrap(),
            resource_type: rt,
            properties: Properties::from([("ip".to_string(), serde_json::json!("10.0.0.1"))]),
        };

        let entity = resource.into_entity();
        let json = serde_json::to_string(&entity).unwrap();
        assert!(json.contains("\"kind\":\"resource\""));
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entity);
        assert_eq!(back.id(), "host1");
    }

    #[test]
    fn typed_conversion_rejects_other_kinds() {
        let entity = Tenant {
            path: tenant(),
            properties: Properties::new(),
        }
        .into_entity();

        let err = entity.into_typed::<Environment>().unwrap_err();
        assert!(matches!(err, InventoryError::Conversion { .. }));
    }

    #[test]
    fn update_replaces_properties() {
        let mut t = Tenant::from_blueprint(
            tenant(),
            &BasicBlueprint::new("acme").with_property("a", serde_json::json!(1)),
        );
        t.apply_update(&EntityUpdate::default());
        assert_eq!(t.properties.len(), 1);

        t.apply_update(&EntityUpdate::properties(Properties::new()));
        assert!(t.properties.is_empty());
    }

    #[test]
    fn well_known_labels_are_camel_case() {
        assert_eq!(WellKnown::HasData.name(), "hasData");
        assert_eq!(
            serde_json::to_string(&WellKnown::IsParentOf).unwrap(),
            "\"isParentOf\""
        );
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::Incoming);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
