//! Entity kinds and the containment rules between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

/// Every kind of node the inventory knows about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Tenant,
    Environment,
    Feed,
    ResourceType,
    MetricType,
    Resource,
    Metric,
    DataEntity,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Tenant,
        EntityKind::Environment,
        EntityKind::Feed,
        EntityKind::ResourceType,
        EntityKind::MetricType,
        EntityKind::Resource,
        EntityKind::Metric,
        EntityKind::DataEntity,
    ];

    /// Short code used in the string form of paths, e.g. `r` in `/t;acme/e;prod/r;host1`.
    pub fn code(&self) -> &'static str {
        match self {
            EntityKind::Tenant => "t",
            EntityKind::Environment => "e",
            EntityKind::Feed => "f",
            EntityKind::ResourceType => "rt",
            EntityKind::MetricType => "mt",
            EntityKind::Resource => "r",
            EntityKind::Metric => "m",
            EntityKind::DataEntity => "d",
        }
    }

    /// Node label used by graph backends.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Tenant => "Tenant",
            EntityKind::Environment => "Environment",
            EntityKind::Feed => "Feed",
            EntityKind::ResourceType => "ResourceType",
            EntityKind::MetricType => "MetricType",
            EntityKind::Resource => "Resource",
            EntityKind::Metric => "Metric",
            EntityKind::DataEntity => "DataEntity",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.code() == code)
            .ok_or_else(|| InventoryError::InvalidPath(format!("unknown entity kind '{code}'")))
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.label() == label)
    }

    /// Kinds that may directly contain this kind. Empty for root kinds.
    pub fn allowed_parents(&self) -> &'static [EntityKind] {
        match self {
            EntityKind::Tenant => &[],
            EntityKind::Environment | EntityKind::ResourceType | EntityKind::MetricType => {
                &[EntityKind::Tenant]
            }
            EntityKind::Feed => &[EntityKind::Environment],
            EntityKind::Resource | EntityKind::Metric => {
                &[EntityKind::Environment, EntityKind::Feed]
            }
            EntityKind::DataEntity => &[EntityKind::Resource, EntityKind::ResourceType],
        }
    }

    pub fn is_root(&self) -> bool {
        self.allowed_parents().is_empty()
    }

    pub fn can_be_contained_in(&self, parent: EntityKind) -> bool {
        self.allowed_parents().contains(&parent)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EntityKind {
    type Err = InventoryError;

    /// Accepts either the short code or the label, case-insensitively for labels.
    fn from_str(s: &str) -> Result<Self> {
        Self::from_code(s).or_else(|_| {
            Self::ALL
                .into_iter()
                .find(|k| k.label().eq_ignore_ascii_case(s))
                .ok_or_else(|| InventoryError::InvalidPath(format!("unknown entity kind '{s}'")))
        })
    }
}
