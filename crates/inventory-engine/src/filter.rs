//! Traversal predicates and the filter paths built from them.
//!
//! A [`Filter`] either moves the traversal position across edges (`Related`,
//! `RelatedWithId`) or narrows the current position (everything else). Filters
//! in one AND-sequence apply left to right. A [`FilterPath`] is an ordered list
//! of steps; each step holds one or more alternative AND-sequences whose
//! results are unioned.

use std::fmt;

use inventory_core::{CanonicalPath, Direction, EntityKind, WellKnown};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Hop across edges with this label (any label when `None`).
    Related {
        label: Option<String>,
        direction: Direction,
    },
    /// Hop across the single edge with this id, if it carries `label` when one is given.
    RelatedWithId {
        edge_id: String,
        label: Option<String>,
        direction: Direction,
    },
    /// Keep nodes having a `label` edge to the entity at `path`.
    RelatedWith {
        path: CanonicalPath,
        label: String,
        direction: Direction,
    },
    WithId(String),
    WithIds(Vec<String>),
    WithType(EntityKind),
    /// Keep nodes whose property `name` equals any of `values`.
    WithProperty {
        name: String,
        values: Vec<serde_json::Value>,
    },
}

impl Filter {
    pub fn related_by(label: impl Into<String>) -> Self {
        Filter::Related {
            label: Some(label.into()),
            direction: Direction::Outgoing,
        }
    }

    pub fn related_by_in(label: impl Into<String>, direction: Direction) -> Self {
        Filter::Related {
            label: Some(label.into()),
            direction,
        }
    }

    pub fn related_any(direction: Direction) -> Self {
        Filter::Related {
            label: None,
            direction,
        }
    }

    pub fn contains() -> Self {
        Self::related_by(WellKnown::Contains.name())
    }

    pub fn by_relationship_id(
        edge_id: impl Into<String>,
        label: Option<String>,
        direction: Direction,
    ) -> Self {
        Filter::RelatedWithId {
            edge_id: edge_id.into(),
            label,
            direction,
        }
    }

    pub fn related_with(path: CanonicalPath, label: impl Into<String>, direction: Direction) -> Self {
        Filter::RelatedWith {
            path,
            label: label.into(),
            direction,
        }
    }

    /// Resources (or metrics) defined by the given type.
    pub fn defined_by(type_path: CanonicalPath) -> Self {
        Self::related_with(type_path, WellKnown::Defines.name(), Direction::Incoming)
    }

    pub fn id(id: impl Into<String>) -> Self {
        Filter::WithId(id.into())
    }

    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::WithIds(ids.into_iter().map(Into::into).collect())
    }

    pub fn of_type(kind: EntityKind) -> Self {
        Filter::WithType(kind)
    }

    pub fn property(name: impl Into<String>, value: serde_json::Value) -> Self {
        Filter::WithProperty {
            name: name.into(),
            values: vec![value],
        }
    }

    /// True for filters that move the traversal position.
    pub fn is_hop(&self) -> bool {
        matches!(self, Filter::Related { .. } | Filter::RelatedWithId { .. })
    }

    /// Only id filters may be applied to relationships directly.
    pub fn is_id_filter(&self) -> bool {
        matches!(self, Filter::WithId(_) | Filter::WithIds(_))
    }

    /// Whether an id passes an id filter. Non-id filters accept everything.
    pub fn accepts_id(&self, id: &str) -> bool {
        match self {
            Filter::WithId(expected) => expected == id,
            Filter::WithIds(ids) => ids.iter().any(|i| i == id),
            _ => true,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Related { label, direction } => match label {
                Some(label) => write!(f, "Related({label}, {direction})"),
                None => write!(f, "Related(*, {direction})"),
            },
            Filter::RelatedWithId {
                edge_id,
                label,
                direction,
            } => match label {
                Some(label) => write!(f, "RelatedWithId({edge_id}, {label}, {direction})"),
                None => write!(f, "RelatedWithId({edge_id}, {direction})"),
            },
            Filter::RelatedWith {
                path,
                label,
                direction,
            } => write!(f, "RelatedWith({label}, {direction}, {path})"),
            Filter::WithId(id) => write!(f, "WithId({id})"),
            Filter::WithIds(ids) => write!(f, "WithIds({})", ids.join(", ")),
            Filter::WithType(kind) => write!(f, "WithType({kind})"),
            Filter::WithProperty { name, values } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "WithProperty({name} in [{}])", values.join(", "))
            }
        }
    }
}

/// Builds one AND-sequence of filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    filters: Vec<Filter>,
}

impl Accumulator {
    pub fn by<I: IntoIterator<Item = Filter>>(filters: I) -> Self {
        Self {
            filters: filters.into_iter().collect(),
        }
    }

    pub fn and_filter<I: IntoIterator<Item = Filter>>(mut self, more: I) -> Self {
        self.filters.extend(more);
        self
    }

    pub fn get(self) -> Vec<Filter> {
        self.filters
    }
}

/// One traversal step: alternatives are ORed, filters within one are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    alternatives: Vec<Vec<Filter>>,
}

impl Step {
    pub fn single(filters: Vec<Filter>) -> Self {
        Self {
            alternatives: vec![filters],
        }
    }

    pub fn any_of(alternatives: Vec<Vec<Filter>>) -> Self {
        Self { alternatives }
    }

    pub fn alternatives(&self) -> &[Vec<Filter>] {
        &self.alternatives
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alternatives: Vec<String> = self
            .alternatives
            .iter()
            .map(|alt| {
                let filters: Vec<String> = alt.iter().map(ToString::to_string).collect();
                format!("[{}]", filters.join(", "))
            })
            .collect();
        f.write_str(&alternatives.join(" | "))
    }
}

/// The accumulated traversal from the whole graph to the current position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPath {
    steps: Vec<Step>,
}

impl FilterPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// The walk that reaches exactly the entity at `path`.
    pub fn to(path: &CanonicalPath) -> Self {
        let mut filter_path = Self::new();
        for (i, segment) in path.segments().iter().enumerate() {
            let mut filters = Vec::with_capacity(3);
            if i > 0 {
                filters.push(Filter::contains());
            }
            filters.push(Filter::WithType(segment.kind));
            filters.push(Filter::WithId(segment.id.clone()));
            filter_path = filter_path.with_step(Step::single(filters));
        }
        filter_path
    }

    /// A new path with `step` appended; the receiver is left untouched.
    pub fn with_step(&self, step: Step) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    pub fn with_filters(&self, filters: Vec<Filter>) -> Self {
        self.with_step(Step::single(filters))
    }

    /// The path minus its last step, or `None` when already empty.
    pub fn parent(&self) -> Option<Self> {
        if self.steps.is_empty() {
            return None;
        }
        Some(Self {
            steps: self.steps[..self.steps.len() - 1].to_vec(),
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for FilterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("<root>");
        }
        let steps: Vec<String> = self.steps.iter().map(ToString::to_string).collect();
        f.write_str(&steps.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_preserves_order() {
        let filters = Accumulator::by([Filter::contains(), Filter::of_type(EntityKind::Feed)])
            .and_filter([Filter::id("agent")])
            .get();
        assert_eq!(filters.len(), 3);
        assert_eq!(filters[2], Filter::id("agent"));
    }

    #[test]
    fn path_to_canonical_walks_contains() {
        let path: CanonicalPath = "/t;acme/e;prod".parse().unwrap();
        let fp = FilterPath::to(&path);
        assert_eq!(fp.steps().len(), 2);
        assert_eq!(
            fp.to_string(),
            "[WithType(Tenant), WithId(acme)] -> [Related(contains, outgoing), WithType(Environment), WithId(prod)]"
        );
    }

    #[test]
    fn with_step_does_not_mutate() {
        let base = FilterPath::new();
        let extended = base.with_filters(vec![Filter::id("x")]);
        assert!(base.is_empty());
        assert_eq!(extended.parent().unwrap(), base);
    }

    #[test]
    fn id_filter_classification() {
        assert!(Filter::ids(["a", "b"]).is_id_filter());
        assert!(!Filter::of_type(EntityKind::Tenant).is_id_filter());
        assert!(Filter::ids(["a", "b"]).accepts_id("b"));
        assert!(!Filter::id("a").accepts_id("b"));
        assert!(Filter::contains().is_hop());
    }

    #[test]
    fn alternatives_display_with_bar() {
        let step = Step::any_of(vec![vec![Filter::id("a")], vec![Filter::id("b")]]);
        assert_eq!(step.to_string(), "[WithId(a)] | [WithId(b)]");
    }
}
