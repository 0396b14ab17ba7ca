//! Element handles and the row shapes read back from Neo4j.

use std::collections::{BTreeMap, HashMap};

use inventory_core::{DataView, Entity, InventoryError, Properties, Result, Shape, StructuredData};

use crate::cypher::property_key;

/// Handle to a node or relationship, by Neo4j element id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphElement {
    Entity(String),
    Data(String),
    Edge(String),
}

impl GraphElement {
    pub fn element_id(&self) -> &str {
        match self {
            GraphElement::Entity(id) | GraphElement::Data(id) | GraphElement::Edge(id) => id,
        }
    }

    /// A node handle, telling entity nodes from data nodes.
    pub fn node(element_id: String, is_entity: bool) -> Self {
        if is_entity {
            GraphElement::Entity(element_id)
        } else {
            GraphElement::Data(element_id)
        }
    }
}

/// The property map written to an entity node.
///
/// The entity travels whole as JSON in `body`; `path`, `id` and `kind` are
/// duplicated for matching, and each property is stored under its own key so
/// property filters can compare in Cypher.
pub fn entity_record(entity: &Entity, token: &str) -> Result<HashMap<String, String>> {
    let mut stored = entity.clone();
    if let Entity::DataEntity(data) = &mut stored {
        data.value = StructuredData::Undefined;
    }

    let mut record = HashMap::new();
    record.insert("path".to_string(), entity.path().to_string());
    record.insert("id".to_string(), entity.id().to_string());
    record.insert("kind".to_string(), entity.kind().label().to_string());
    record.insert("token".to_string(), token.to_string());
    record.insert("body".to_string(), serde_json::to_string(&stored)?);
    for (name, value) in entity.properties() {
        record.insert(property_key(name), crate::cypher::encode_value(value));
    }
    Ok(record)
}

pub fn decode_entity(body: &str) -> Result<Entity> {
    Ok(serde_json::from_str(body)?)
}

pub fn decode_properties(raw: Option<&str>) -> Result<Properties> {
    match raw {
        Some(raw) if !raw.is_empty() => Ok(serde_json::from_str(raw)?),
        _ => Ok(Properties::new()),
    }
}

/// One structured-data node together with the link to its parent.
#[derive(Debug, Clone)]
pub struct DataRow {
    pub element_id: String,
    pub shape: Shape,
    pub value: String,
    pub parent: Option<String>,
    pub key: Option<String>,
    pub idx: i64,
}

/// Rebuild the value rooted at `root` from its rows.
///
/// Rows for nodes below the requested depth are simply absent, so a shallow
/// read yields nested containers without children.
pub fn assemble(root: &str, rows: &[DataRow], view: DataView) -> Result<StructuredData> {
    let by_id: HashMap<&str, &DataRow> = rows.iter().map(|r| (r.element_id.as_str(), r)).collect();
    let mut children: HashMap<&str, Vec<&DataRow>> = HashMap::new();
    for row in rows {
        if row.element_id == root {
            continue;
        }
        if let Some(parent) = row.parent.as_deref() {
            children.entry(parent).or_default().push(row);
        }
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|r| r.idx);
    }

    let root_row = by_id.get(root).ok_or_else(|| InventoryError::Conversion {
        expected: "structured data".to_string(),
        actual: format!("missing node {root}"),
    })?;
    let depth = match view {
        DataView::Deep => usize::MAX,
        DataView::Shallow => 1,
    };
    build(root_row, &children, depth)
}

fn build(
    row: &DataRow,
    children: &HashMap<&str, Vec<&DataRow>>,
    depth: usize,
) -> Result<StructuredData> {
    let below: &[&DataRow] = if depth == 0 {
        &[]
    } else {
        children
            .get(row.element_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    };

    match row.shape {
        Shape::List => Ok(StructuredData::List(
            below
                .iter()
                .map(|child| build(child, children, depth - 1))
                .collect::<Result<Vec<_>>>()?,
        )),
        Shape::Map => {
            let mut entries = BTreeMap::new();
            for child in below {
                let key = child.key.clone().unwrap_or_default();
                entries.insert(key, build(child, children, depth - 1)?);
            }
            Ok(StructuredData::Map(entries))
        }
        _ => decode_scalar(row),
    }
}

fn decode_scalar(row: &DataRow) -> Result<StructuredData> {
    if row.value.is_empty() {
        return Ok(StructuredData::empty_of(row.shape));
    }
    let json: serde_json::Value = serde_json::from_str(&row.value)?;
    let value = StructuredData::from(json);
    // JSON cannot tell 1.0 from 1 once written, so trust the stored shape.
    Ok(match (row.shape, value) {
        (Shape::Floating, StructuredData::Integral(i)) => StructuredData::Floating(i as f64),
        (_, value) => value,
    })
}
