//! Hierarchical addressing of entities and of data nested inside them.
//!
//! A [`CanonicalPath`] is the stable identity of an entity: two nodes are the
//! same entity iff their canonical paths are equal. A [`RelativePath`] is resolved
//! against a canonical path, either to reach another entity or to descend into
//! structured data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};
use crate::kind::EntityKind;

/// One `(kind, id)` step of a canonical path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    pub kind: EntityKind,
    pub id: String,
}

impl Segment {
    fn new(kind: EntityKind, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_id(&id)?;
        Ok(Self { kind, id })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.kind.code(), self.id)
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(InventoryError::InvalidPath(
            "segment id must not be empty".to_string(),
        ));
    }
    if id.contains('/') {
        return Err(InventoryError::InvalidPath(format!(
            "segment id '{id}' must not contain '/'"
        )));
    }
    Ok(())
}

fn parse_segment(raw: &str) -> Result<(String, String)> {
    let (code, id) = raw
        .split_once(';')
        .ok_or_else(|| InventoryError::InvalidPath(format!("malformed segment '{raw}'")))?;
    Ok((code.to_string(), id.to_string()))
}

// ── Canonical Path ───────────────────────────────────────────────

/// Absolute address of an entity, rooted at a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalPath {
    segments: Vec<Segment>,
}

impl CanonicalPath {
    /// Start a path at a root entity.
    pub fn root(kind: EntityKind, id: impl Into<String>) -> Result<Self> {
        if !kind.is_root() {
            return Err(InventoryError::InvalidPath(format!(
                "{kind} cannot start a canonical path"
            )));
        }
        Ok(Self {
            segments: vec![Segment::new(kind, id)?],
        })
    }

    /// Shorthand for `root(EntityKind::Tenant, id)`.
    pub fn tenant(id: impl Into<String>) -> Result<Self> {
        Self::root(EntityKind::Tenant, id)
    }

    /// A new path one level deeper. The receiver is left untouched.
    pub fn extend(&self, kind: EntityKind, id: impl Into<String>) -> Result<Self> {
        let parent = self.kind();
        if !kind.can_be_contained_in(parent) {
            return Err(InventoryError::InvalidPath(format!(
                "{kind} cannot be contained in {parent}"
            )));
        }
        let mut segments = self.segments.clone();
        segments.push(Segment::new(kind, id)?);
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Canonical paths always have at least one segment.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn last(&self) -> &Segment {
        // Construction guarantees at least one segment.
        &self.segments[self.segments.len() - 1]
    }

    pub fn kind(&self) -> EntityKind {
        self.last().kind
    }

    pub fn id(&self) -> &str {
        &self.last().id
    }

    pub fn tenant_id(&self) -> &str {
        &self.segments[0].id
    }

    pub fn parent(&self) -> Option<CanonicalPath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True if `other` is a direct child of this path.
    pub fn is_parent_of(&self, other: &CanonicalPath) -> bool {
        other.segments.len() == self.segments.len() + 1 && self.is_ancestor_of(other)
    }

    /// True if this path is a direct child of `other`.
    pub fn is_child_of(&self, other: &CanonicalPath) -> bool {
        other.is_parent_of(self)
    }

    /// True if `other` is strictly below this path.
    pub fn is_ancestor_of(&self, other: &CanonicalPath) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Express this path relative to `base`, e.g. `/t;a/e;b/r;c` relative to
    /// `/t;a/e;x` is `../e;b/r;c`.
    pub fn relative_to(&self, base: &CanonicalPath) -> RelativePath {
        let common = self
            .segments
            .iter()
            .zip(base.segments.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<RelativeSegment> = (common..base.segments.len())
            .map(|_| RelativeSegment::Up)
            .collect();
        segments.extend(
            self.segments[common..]
                .iter()
                .map(|s| RelativeSegment::Entity(s.kind, s.id.clone())),
        );
        RelativePath { segments }
    }

    /// Resolve an entity-addressing relative path against this one.
    ///
    /// Data segments cannot be resolved here; they are handled by the backend
    /// when descending into structured data.
    pub fn descend_into(&self, relative: &RelativePath) -> Result<CanonicalPath> {
        let mut current = self.clone();
        for segment in &relative.segments {
            current = match segment {
                RelativeSegment::Up => current.parent().ok_or_else(|| {
                    InventoryError::InvalidPath(format!(
                        "'{relative}' climbs above the root of {self}"
                    ))
                })?,
                RelativeSegment::Entity(kind, id) => current.extend(*kind, id.clone())?,
                RelativeSegment::Key(_) | RelativeSegment::Index(_) => {
                    return Err(InventoryError::InvalidPath(format!(
                        "'{relative}' addresses structured data, not an entity"
                    )))
                }
            };
        }
        Ok(current)
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for CanonicalPath {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s.strip_prefix('/').ok_or_else(|| {
            InventoryError::InvalidPath(format!("canonical path '{s}' must start with '/'"))
        })?;

        let mut path: Option<CanonicalPath> = None;
        for raw in rest.split('/') {
            let (code, id) = parse_segment(raw)?;
            let kind = EntityKind::from_code(&code)?;
            path = Some(match path {
                None => CanonicalPath::root(kind, id)?,
                Some(p) => p.extend(kind, id)?,
            });
        }
        path.ok_or_else(|| InventoryError::InvalidPath(format!("empty canonical path '{s}'")))
    }
}

impl TryFrom<String> for CanonicalPath {
    type Error = InventoryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CanonicalPath> for String {
    fn from(path: CanonicalPath) -> Self {
        path.to_string()
    }
}

// ── Relative Path ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelativeSegment {
    Up,
    Entity(EntityKind, String),
    Key(String),
    Index(usize),
}

impl fmt::Display for RelativeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelativeSegment::Up => f.write_str(".."),
            RelativeSegment::Entity(kind, id) => write!(f, "{};{}", kind.code(), id),
            RelativeSegment::Key(key) => write!(f, "k;{key}"),
            RelativeSegment::Index(index) => write!(f, "i;{index}"),
        }
    }
}

/// A path fragment resolved against a base canonical path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath {
    segments: Vec<RelativeSegment>,
}

impl RelativePath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn up(mut self) -> Self {
        self.segments.push(RelativeSegment::Up);
        self
    }

    pub fn entity(mut self, kind: EntityKind, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_id(&id)?;
        self.segments.push(RelativeSegment::Entity(kind, id));
        Ok(self)
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(RelativeSegment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(RelativeSegment::Index(index));
        self
    }

    pub fn segments(&self) -> &[RelativeSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when the path only walks keys and indices of structured data.
    pub fn is_data_path(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, RelativeSegment::Key(_) | RelativeSegment::Index(_)))
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(".");
        }
        let parts: Vec<String> = self.segments.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("/"))
    }
}

impl FromStr for RelativePath {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() || trimmed == "." {
            return Ok(Self::empty());
        }

        let mut path = Self::empty();
        for raw in trimmed.split('/') {
            path = match raw {
                ".." => path.up(),
                "." => path,
                _ => {
                    let (code, value) = parse_segment(raw)?;
                    match code.as_str() {
                        "k" => path.key(value),
                        "i" => {
                            let index = value.parse::<usize>().map_err(|_| {
                                InventoryError::InvalidPath(format!("bad index in '{raw}'"))
                            })?;
                            path.index(index)
                        }
                        _ => path.entity(EntityKind::from_code(&code)?, value)?,
                    }
                }
            };
        }
        Ok(path)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = InventoryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_path() -> CanonicalPath {
        CanonicalPath::tenant("acme")
            .unwrap()
            .extend(EntityKind::Environment, "prod")
            .unwrap()
            .extend(EntityKind::Resource, "host1")
            .unwrap()
    }

    #[test]
    fn display_and_parse_agree() {
        let path = host_path();
        assert_eq!(path.to_string(), "/t;acme/e;prod/r;host1");
        assert_eq!("/t;acme/e;prod/r;host1".parse::<CanonicalPath>().unwrap(), path);
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = CanonicalPath::tenant("").unwrap_err();
        assert!(matches!(err, InventoryError::InvalidPath(_)));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("/t;acme/zz;x".parse::<CanonicalPath>().is_err());
        assert!("t;acme".parse::<CanonicalPath>().is_err());
    }

    #[test]
    fn containment_is_enforced() {
        let tenant = CanonicalPath::tenant("acme").unwrap();
        assert!(tenant.extend(EntityKind::Resource, "r").is_err());
        assert!(CanonicalPath::root(EntityKind::Environment, "prod").is_err());
    }

    #[test]
    fn extend_does_not_mutate_receiver() {
        let tenant = CanonicalPath::tenant("acme").unwrap();
        let env = tenant.extend(EntityKind::Environment, "prod").unwrap();
        assert_eq!(tenant.len(), 1);
        assert_eq!(env.len(), 2);
        assert!(tenant.is_parent_of(&env));
        assert!(env.is_child_of(&tenant));
    }

    #[test]
    fn parent_and_ancestry() {
        let host = host_path();
        let env = host.parent().unwrap();
        let tenant = env.parent().unwrap();
        assert!(tenant.parent().is_none());
        assert!(tenant.is_ancestor_of(&host));
        assert!(!tenant.is_parent_of(&host));
        assert!(!host.is_ancestor_of(&host));
        assert_eq!(host.tenant_id(), "acme");
    }

    #[test]
    fn relative_to_and_descend_into_are_inverse() {
        let host = host_path();
        let base = CanonicalPath::tenant("acme")
            .unwrap()
            .extend(EntityKind::ResourceType, "linux")
            .unwrap();

        let rel = host.relative_to(&base);
        assert_eq!(rel.to_string(), "../e;prod/r;host1");
        assert_eq!(base.descend_into(&rel).unwrap(), host);
    }

    #[test]
    fn descend_into_rejects_data_segments_and_overflow() {
        let host = host_path();
        let data = RelativePath::empty().key("a");
        assert!(host.descend_into(&data).is_err());

        let too_far = RelativePath::empty().up().up().up();
        assert!(host.descend_into(&too_far).is_err());
    }

    #[test]
    fn relative_path_parsing() {
        let rel: RelativePath = "k;settings/i;2".parse().unwrap();
        assert!(rel.is_data_path());
        assert_eq!(rel.to_string(), "k;settings/i;2");

        let nav: RelativePath = "../f;agent".parse().unwrap();
        assert!(!nav.is_data_path());
        assert_eq!(RelativePath::empty().to_string(), ".");
        assert!(".".parse::<RelativePath>().unwrap().is_empty());
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&host_path()).unwrap();
        assert_eq!(json, "\"/t;acme/e;prod/r;host1\"");
        let back: CanonicalPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, host_path());
    }
}
