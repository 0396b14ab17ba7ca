//! Schema-less structured data attached to entities.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};
use crate::path::{RelativePath, RelativeSegment};

/// A recursive value tree: a scalar, an ordered list, or a key-ordered map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredData {
    #[default]
    Undefined,
    Bool(bool),
    Integral(i64),
    Floating(f64),
    String(String),
    List(Vec<StructuredData>),
    Map(BTreeMap<String, StructuredData>),
}

/// The top-level shape of a [`StructuredData`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Undefined,
    Bool,
    Integral,
    Floating,
    String,
    List,
    Map,
}

impl Shape {
    pub fn is_container(&self) -> bool {
        matches!(self, Shape::List | Shape::Map)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Shape::Undefined => "undefined",
            Shape::Bool => "bool",
            Shape::Integral => "integral",
            Shape::Floating => "floating",
            Shape::String => "string",
            Shape::List => "list",
            Shape::Map => "map",
        }
    }
}

impl FromStr for Shape {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "undefined" => Ok(Shape::Undefined),
            "bool" => Ok(Shape::Bool),
            "integral" => Ok(Shape::Integral),
            "floating" => Ok(Shape::Floating),
            "string" => Ok(Shape::String),
            "list" => Ok(Shape::List),
            "map" => Ok(Shape::Map),
            other => Err(InventoryError::Conversion {
                expected: "structured data shape".to_string(),
                actual: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl StructuredData {
    pub fn top_level_shape(&self) -> Shape {
        match self {
            StructuredData::Undefined => Shape::Undefined,
            StructuredData::Bool(_) => Shape::Bool,
            StructuredData::Integral(_) => Shape::Integral,
            StructuredData::Floating(_) => Shape::Floating,
            StructuredData::String(_) => Shape::String,
            StructuredData::List(_) => Shape::List,
            StructuredData::Map(_) => Shape::Map,
        }
    }

    /// An empty container or an undefined scalar of the given shape.
    pub fn empty_of(shape: Shape) -> Self {
        match shape {
            Shape::List => StructuredData::List(Vec::new()),
            Shape::Map => StructuredData::Map(BTreeMap::new()),
            Shape::Bool => StructuredData::Bool(false),
            Shape::Integral => StructuredData::Integral(0),
            Shape::Floating => StructuredData::Floating(0.0),
            Shape::String => StructuredData::String(String::new()),
            Shape::Undefined => StructuredData::Undefined,
        }
    }

    /// The value with every container below the top level emptied.
    ///
    /// Direct children of a top-level container are kept, but any child that is
    /// itself a container is replaced by an empty container of the same shape.
    pub fn shallow(&self) -> Self {
        let marker = |child: &StructuredData| {
            let shape = child.top_level_shape();
            if shape.is_container() {
                StructuredData::empty_of(shape)
            } else {
                child.clone()
            }
        };

        match self {
            StructuredData::List(items) => StructuredData::List(items.iter().map(marker).collect()),
            StructuredData::Map(entries) => StructuredData::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), marker(v)))
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }

    /// Walk a data-only relative path. Returns `None` if any step is missing.
    pub fn get(&self, path: &RelativePath) -> Option<&StructuredData> {
        let mut current = self;
        for segment in path.segments() {
            current = match (segment, current) {
                (RelativeSegment::Key(key), StructuredData::Map(entries)) => entries.get(key)?,
                (RelativeSegment::Index(index), StructuredData::List(items)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn is_container(&self) -> bool {
        self.top_level_shape().is_container()
    }

    /// The scalar part of the value as JSON, `None` for containers.
    pub fn scalar_json(&self) -> Option<serde_json::Value> {
        match self {
            StructuredData::List(_) | StructuredData::Map(_) => None,
            scalar => Some(serde_json::Value::from(scalar.clone())),
        }
    }
}

impl From<serde_json::Value> for StructuredData {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => StructuredData::Undefined,
            serde_json::Value::Bool(b) => StructuredData::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => StructuredData::Integral(i),
                None => StructuredData::Floating(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => StructuredData::String(s),
            serde_json::Value::Array(items) => {
                StructuredData::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(entries) => StructuredData::Map(
                entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<StructuredData> for serde_json::Value {
    fn from(data: StructuredData) -> Self {
        match data {
            StructuredData::Undefined => serde_json::Value::Null,
            StructuredData::Bool(b) => serde_json::Value::Bool(b),
            StructuredData::Integral(i) => serde_json::Value::from(i),
            StructuredData::Floating(f) => serde_json::Value::from(f),
            StructuredData::String(s) => serde_json::Value::String(s),
            StructuredData::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            StructuredData::Map(entries) => serde_json::Value::Object(
                entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

// ── Roles & Views ────────────────────────────────────────────────

/// The role a data entity plays for its owner. The role name is the data
/// entity's id, so an owner has at most one data entity per role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DataRole {
    Configuration,
    ConnectionConfiguration,
    ConfigurationSchema,
    ConnectionConfigurationSchema,
}

impl DataRole {
    pub const ALL: [DataRole; 4] = [
        DataRole::Configuration,
        DataRole::ConnectionConfiguration,
        DataRole::ConfigurationSchema,
        DataRole::ConnectionConfigurationSchema,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DataRole::Configuration => "configuration",
            DataRole::ConnectionConfiguration => "connectionConfiguration",
            DataRole::ConfigurationSchema => "configurationSchema",
            DataRole::ConnectionConfigurationSchema => "connectionConfigurationSchema",
        }
    }
}

impl fmt::Display for DataRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataRole {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| InventoryError::IllegalArgument(format!("unknown data role '{s}'")))
    }
}

/// How much of a structured data tree to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataView {
    /// The full tree.
    Deep,
    /// The top-level value only; nested containers come back empty.
    Shallow,
}
