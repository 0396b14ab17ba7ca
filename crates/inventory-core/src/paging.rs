//! Offset/limit paging with ordering for multi-entity queries.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort key: `id`, `path`, or the name of a property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Which slice of a result set to return and in what order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pager {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
    #[serde(default)]
    pub order: Vec<Order>,
}

impl Pager {
    /// Everything, in backend order.
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
            order: Vec::new(),
        }
    }

    pub fn ordered_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    /// Stable-sort `items` by this pager's order keys. `field_of` extracts the
    /// value of a named field from an item.
    pub fn sort<T, F>(&self, items: &mut [T], field_of: F)
    where
        F: Fn(&T, &str) -> Option<serde_json::Value>,
    {
        if self.order.is_empty() {
            return;
        }
        items.sort_by(|a, b| {
            for order in &self.order {
                let ordering = compare_values(
                    field_of(a, &order.field).as_ref(),
                    field_of(b, &order.field).as_ref(),
                );
                let ordering = match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Cut the requested slice out of an already ordered result set.
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let items: Vec<T> = match self.limit {
            Some(limit) => items.into_iter().skip(self.offset).take(limit).collect(),
            None => items.into_iter().skip(self.offset).collect(),
        };
        Page {
            items,
            total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// Missing values sort first. Present values rank by JSON type
/// (null, bool, number, string, array, object) and compare within a type.
pub fn compare_values(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    use serde_json::Value;

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
                a.to_string().cmp(&b.to_string())
            }
            _ => type_rank(a).cmp(&type_rank(b)),
        },
    }
}

fn type_rank(value: &serde_json::Value) -> u8 {
    use serde_json::Value;

    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(a: &serde_json::Number, b: &serde_json::Number) -> Ordering {
    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    x.total_cmp(&y)
}

/// One page of results plus the size of the whole result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            offset: 0,
            limit: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }

    /// Whether more results exist past this page.
    pub fn has_more(&self) -> bool {
        self.offset + self.items.len() < self.total
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
