//! Cypher generation: filter sequences and structured-data trees.
//!
//! Statements are built as plain text plus a parameter list so they can be
//! inspected in tests without a server. Every caller-supplied value travels as a
//! parameter; the only interpolated identifiers are the static labels below and
//! property keys, which are backtick-escaped.

use std::collections::HashMap;

use neo4rs::{query, Query};

use inventory_core::{Direction, StructuredData};
use inventory_engine::Filter;

/// Label carried by every entity node.
pub const ENTITY: &str = "Entity";
/// Label carried by every structured-data node.
pub const DATA: &str = "StructuredData";
/// Relationship type of every labelled inventory edge.
pub const RELATES: &str = "RELATES";
/// Relationship type linking a structured-data node to its children. Always backtick-quoted.
pub const CHILD: &str = "__child";
/// Prefix of the node keys holding entity properties.
pub const PROPERTY_PREFIX: &str = "prop.";

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Integer(i64),
    Texts(Vec<String>),
    Map(HashMap<String, String>),
}

/// A statement ready to be handed to the driver.
#[derive(Debug, Clone, Default)]
pub struct CypherQuery {
    pub text: String,
    pub params: Vec<(String, Param)>,
}

impl CypherQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, value: Param) -> Self {
        self.params.push((name.to_string(), value));
        self
    }

    /// Bind a fresh parameter and return its placeholder (`$p3`).
    fn bind(&mut self, value: Param) -> String {
        let name = format!("p{}", self.params.len());
        self.params.push((name.clone(), value));
        format!("${name}")
    }

    fn line(&mut self, text: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(text);
    }

    pub fn into_query(self) -> Query {
        let mut q = query(&self.text);
        for (name, value) in self.params {
            q = match value {
                Param::Text(v) => q.param(&name, v),
                Param::Integer(v) => q.param(&name, v),
                Param::Texts(v) => q.param(&name, v),
                Param::Map(v) => q.param(&name, v),
            };
        }
        q
    }
}

/// Quote a property key for use after `n.`.
pub fn escape_key(key: &str) -> String {
    format!("`{}`", key.replace('`', "``"))
}

/// Node key under which the entity property `name` is stored.
pub fn property_key(name: &str) -> String {
    format!("{PROPERTY_PREFIX}{name}")
}

/// Stored form of a property value; equal JSON values encode identically.
pub fn encode_value(value: &serde_json::Value) -> String {
    value.to_string()
}

/// `-[r:RELATES ...]->` oriented for `direction`, read from the left node.
fn arrow(direction: Direction, inner: &str) -> String {
    match direction {
        Direction::Outgoing => format!("-[{inner}]->"),
        Direction::Incoming => format!("<-[{inner}]-"),
        Direction::Both => format!("-[{inner}]-"),
    }
}

/// Compile one AND-sequence of filters.
///
/// With `start` the walk begins at the nodes with those element ids, otherwise
/// at every entity. Each row of the result carries `eid`, the element id of a
/// reached entity, with no duplicates.
pub fn compile_filters(start: Option<&[String]>, filters: &[Filter]) -> CypherQuery {
    let mut q = CypherQuery::default();
    let mut at = 0usize;
    q.line(&format!("MATCH (n0:{ENTITY})"));
    if let Some(start) = start {
        let ids = q.bind(Param::Texts(start.to_vec()));
        q.line(&format!("WHERE elementId(n0) IN {ids}"));
    }

    for filter in filters {
        let n = format!("n{at}");
        match filter {
            Filter::Related { label, direction } => {
                let inner = match label {
                    Some(label) => {
                        let label = q.bind(Param::Text(label.clone()));
                        format!(":{RELATES} {{label: {label}}}")
                    }
                    None => format!(":{RELATES}"),
                };
                at += 1;
                q.line(&format!(
                    "MATCH ({n}){}(n{at}:{ENTITY})",
                    arrow(*direction, &inner)
                ));
                q.line(&format!("WITH DISTINCT n{at}"));
            }
            Filter::RelatedWithId {
                edge_id,
                label,
                direction,
            } => {
                let id = q.bind(Param::Text(edge_id.clone()));
                let inner = match label {
                    Some(label) => {
                        let label = q.bind(Param::Text(label.clone()));
                        format!(":{RELATES} {{id: {id}, label: {label}}}")
                    }
                    None => format!(":{RELATES} {{id: {id}}}"),
                };
                at += 1;
                q.line(&format!(
                    "MATCH ({n}){}(n{at}:{ENTITY})",
                    arrow(*direction, &inner)
                ));
                q.line(&format!("WITH DISTINCT n{at}"));
            }
            Filter::RelatedWith {
                path,
                label,
                direction,
            } => {
                let label = q.bind(Param::Text(label.clone()));
                let path = q.bind(Param::Text(path.to_string()));
                q.line(&format!(
                    "WITH DISTINCT {n} WHERE ({n}){}(:{ENTITY} {{path: {path}}})",
                    arrow(*direction, &format!(":{RELATES} {{label: {label}}}"))
                ));
            }
            Filter::WithId(id) => {
                let id = q.bind(Param::Text(id.clone()));
                q.line(&format!("WITH DISTINCT {n} WHERE {n}.id = {id}"));
            }
            Filter::WithIds(ids) => {
                let ids = q.bind(Param::Texts(ids.clone()));
                q.line(&format!("WITH DISTINCT {n} WHERE {n}.id IN {ids}"));
            }
            Filter::WithType(kind) => {
                let kind = q.bind(Param::Text(kind.label().to_string()));
                q.line(&format!("WITH DISTINCT {n} WHERE {n}.kind = {kind}"));
            }
            Filter::WithProperty { name, values } => {
                let values = q.bind(Param::Texts(values.iter().map(encode_value).collect()));
                q.line(&format!(
                    "WITH DISTINCT {n} WHERE {n}.{} IN {values}",
                    escape_key(&property_key(name))
                ));
            }
        }
    }

    q.line(&format!(
        "RETURN DISTINCT elementId(n{at}) AS eid, n{at}.path AS path ORDER BY path"
    ));
    q
}

/// A single `CREATE` statement storing the whole tree; the row returns the root's `eid`.
pub fn create_tree(value: &StructuredData) -> CypherQuery {
    let mut q = CypherQuery::default();
    let mut next = 0usize;
    add_data_node(&mut q, value, None, &mut next);
    q.line("RETURN elementId(d0) AS eid");
    q
}

/// Where a child hangs below its parent.
enum Slot<'a> {
    Key(&'a str),
    Index(usize),
}

fn add_data_node(
    q: &mut CypherQuery,
    value: &StructuredData,
    parent: Option<(usize, Slot<'_>)>,
    next: &mut usize,
) {
    let me = *next;
    *next += 1;

    let shape = q.bind(Param::Text(value.top_level_shape().name().to_string()));
    let stored = value
        .scalar_json()
        .map(|json| json.to_string())
        .unwrap_or_default();
    let stored = q.bind(Param::Text(stored));
    q.line(&format!(
        "CREATE (d{me}:{DATA} {{shape: {shape}, value: {stored}}})"
    ));

    if let Some((parent, slot)) = parent {
        let (key, idx) = match slot {
            Slot::Key(key) => (key.to_string(), -1),
            Slot::Index(index) => (String::new(), index as i64),
        };
        let key = q.bind(Param::Text(key));
        let idx = q.bind(Param::Integer(idx));
        q.line(&format!(
            "CREATE (d{parent})-[:`{CHILD}` {{key: {key}, idx: {idx}}}]->(d{me})"
        ));
    }

    match value {
        StructuredData::List(items) => {
            for (index, item) in items.iter().enumerate() {
                add_data_node(q, item, Some((me, Slot::Index(index))), next);
            }
        }
        StructuredData::Map(entries) => {
            for (key, item) in entries {
                add_data_node(q, item, Some((me, Slot::Key(key))), next);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_core::{CanonicalPath, EntityKind};
    use serde_json::json;

    fn lines(q: &CypherQuery) -> Vec<&str> {
        q.text.lines().collect()
    }

    #[test]
    fn first_step_starts_from_every_entity() {
        let q = compile_filters(
            None,
            &[Filter::of_type(EntityKind::Tenant), Filter::id("acme")],
        );
        assert_eq!(
            lines(&q),
            vec![
                "MATCH (n0:Entity)",
                "WITH DISTINCT n0 WHERE n0.kind = $p0",
                "WITH DISTINCT n0 WHERE n0.id = $p1",
                "RETURN DISTINCT elementId(n0) AS eid, n0.path AS path ORDER BY path",
            ]
        );
        assert_eq!(q.params[0].1, Param::Text("Tenant".into()));
        assert_eq!(q.params[1].1, Param::Text("acme".into()));
    }

    #[test]
    fn hops_only_reach_entities() {
        let start = vec!["4:abc:1".to_string()];
        let q = compile_filters(
            Some(&start),
            &[Filter::contains(), Filter::of_type(EntityKind::Environment)],
        );
        assert_eq!(lines(&q)[1], "WHERE elementId(n0) IN $p0");
        assert_eq!(
            lines(&q)[2],
            "MATCH (n0)-[:RELATES {label: $p1}]->(n1:Entity)"
        );
        assert!(q.text.ends_with("RETURN DISTINCT elementId(n1) AS eid, n1.path AS path ORDER BY path"));
    }

    #[test]
    fn direction_controls_the_arrow() {
        let incoming = compile_filters(None, &[Filter::related_by_in("defines", Direction::Incoming)]);
        assert!(incoming.text.contains("MATCH (n0)<-[:RELATES {label: $p0}]-(n1:Entity)"));

        let any = compile_filters(None, &[Filter::related_any(Direction::Both)]);
        assert!(any.text.contains("MATCH (n0)-[:RELATES]-(n1:Entity)"));
        assert!(any.params.is_empty());
    }

    #[test]
    fn edge_id_hop_carries_the_scope_label() {
        let bare = compile_filters(None, &[Filter::by_relationship_id("e1", None, Direction::Outgoing)]);
        assert_eq!(lines(&bare)[1], "MATCH (n0)-[:RELATES {id: $p0}]->(n1:Entity)");

        let scoped = compile_filters(
            None,
            &[Filter::by_relationship_id("e1", Some("defines".into()), Direction::Outgoing)],
        );
        assert_eq!(
            lines(&scoped)[1],
            "MATCH (n0)-[:RELATES {id: $p0, label: $p1}]->(n1:Entity)"
        );
        assert_eq!(scoped.params[1].1, Param::Text("defines".into()));
    }

    #[test]
    fn neighbour_predicate_does_not_move() {
        let type_path: CanonicalPath = "/t;acme/rt;host".parse().unwrap();
        let q = compile_filters(None, &[Filter::defined_by(type_path)]);
        assert_eq!(
            lines(&q)[1],
            "WITH DISTINCT n0 WHERE (n0)<-[:RELATES {label: $p0}]-(:Entity {path: $p1})"
        );
        assert_eq!(q.params[1].1, Param::Text("/t;acme/rt;host".into()));
        assert!(q.text.contains("elementId(n0) AS eid"));
    }

    #[test]
    fn property_filters_compare_encoded_values() {
        let q = compile_filters(None, &[Filter::property("zone", json!("eu"))]);
        assert_eq!(
            lines(&q)[1],
            "WITH DISTINCT n0 WHERE n0.`prop.zone` IN $p0"
        );
        assert_eq!(q.params[0].1, Param::Texts(vec!["\"eu\"".into()]));
    }

    #[test]
    fn property_keys_are_escaped() {
        assert_eq!(escape_key("prop.we`ird"), "`prop.we``ird`");
    }

    #[test]
    fn tree_statement_creates_every_node_once() {
        let value: StructuredData = json!({"a": [1, 2], "b": "x"}).into();
        let q = create_tree(&value);

        let creates = q.text.lines().filter(|l| l.contains(":StructuredData")).count();
        let links = q.text.lines().filter(|l| l.contains("__child")).count();
        assert_eq!(creates, 5);
        assert_eq!(links, 4);
        assert!(q.text.ends_with("RETURN elementId(d0) AS eid"));

        // Root is a map with an empty stored value; the list item at index 1 keeps its position.
        assert_eq!(q.params[0].1, Param::Text("map".into()));
        assert_eq!(q.params[1].1, Param::Text(String::new()));
        assert!(q.params.contains(&("p13".to_string(), Param::Integer(1))));
    }

    #[test]
    fn scalar_tree_is_a_single_node() {
        let q = create_tree(&StructuredData::Floating(1.5));
        assert_eq!(
            lines(&q),
            vec![
                "CREATE (d0:StructuredData {shape: $p0, value: $p1})",
                "RETURN elementId(d0) AS eid",
            ]
        );
        assert_eq!(q.params[1].1, Param::Text("1.5".into()));
    }
}
