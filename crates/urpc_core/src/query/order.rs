//! Result ordering.

use crate::error::UrpcError;
use crate::query::compare::compare_for_sort;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// One sort key: a field path and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    /// First segment is the top-level field; later segments walk nested objects.
    pub path: Vec<String>,
    pub direction: SortDirection,
}

impl OrderTerm {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            path: vec![field.into()],
            direction,
        }
    }

    fn lookup<'a>(&self, row: &'a Value) -> &'a Value {
        self.path
            .iter()
            .try_fold(row, |current, segment| current.get(segment))
            .unwrap_or(&Value::Null)
    }

    fn to_value(&self) -> (String, Value) {
        let field = self.path.first().cloned().unwrap_or_default();
        if self.path.len() <= 1 {
            return (field, Value::String(self.direction.as_str().to_string()));
        }
        let nested: Vec<Value> = self.path[1..]
            .iter()
            .map(|segment| Value::String(segment.clone()))
            .collect();
        let mut term = Map::new();
        term.insert("path".to_string(), Value::Array(nested));
        term.insert(
            "sortOrder".to_string(),
            Value::String(self.direction.as_str().to_string()),
        );
        (field, Value::Object(term))
    }
}

/// Ordered list of sort keys, applied left to right.
///
/// Accepts `{field: "asc"|"desc"}`, `{field: {path, sortOrder}}` or an array
/// of such objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct OrderBy {
    terms: Vec<OrderTerm>,
}

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new().then(OrderTerm::new(field, SortDirection::Asc))
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new().then(OrderTerm::new(field, SortDirection::Desc))
    }

    pub fn then(mut self, term: OrderTerm) -> Self {
        self.terms.push(term);
        self
    }

    pub fn terms(&self) -> &[OrderTerm] {
        &self.terms
    }

    pub fn compare(&self, left: &Value, right: &Value) -> Ordering {
        self.terms
            .iter()
            .map(|term| {
                let ordering = compare_for_sort(term.lookup(left), term.lookup(right));
                match term.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    /// Stable in-place sort.
    pub fn sort(&self, rows: &mut [Value]) {
        if !self.terms.is_empty() {
            rows.sort_by(|left, right| self.compare(left, right));
        }
    }
}

fn parse_term(field: String, term: Value) -> Result<OrderTerm, UrpcError> {
    match term {
        Value::String(direction) => {
            let direction = SortDirection::parse(&direction).ok_or_else(|| {
                UrpcError::bad_request(format!(
                    "order_by.{field}: expected asc|desc, got `{direction}`"
                ))
            })?;
            Ok(OrderTerm::new(field, direction))
        }
        Value::Object(map) => {
            let direction = match map.get("sortOrder").or_else(|| map.get("sort")) {
                Some(Value::String(direction)) => SortDirection::parse(direction).ok_or_else(
                    || {
                        UrpcError::bad_request(format!(
                            "order_by.{field}.sortOrder: expected asc|desc"
                        ))
                    },
                )?,
                None => SortDirection::Asc,
                Some(_) => {
                    return Err(UrpcError::bad_request(format!(
                        "order_by.{field}.sortOrder: expected a string"
                    )))
                }
            };
            let mut path = vec![field.clone()];
            match map.get("path") {
                Some(Value::Array(segments)) => {
                    for segment in segments {
                        let Value::String(segment) = segment else {
                            return Err(UrpcError::bad_request(format!(
                                "order_by.{field}.path: expected string segments"
                            )));
                        };
                        path.push(segment.clone());
                    }
                }
                Some(Value::String(dotted)) => {
                    path.extend(dotted.split('.').filter(|s| !s.is_empty()).map(String::from));
                }
                None => {}
                Some(_) => {
                    return Err(UrpcError::bad_request(format!(
                        "order_by.{field}.path: expected an array or dotted string"
                    )))
                }
            }
            Ok(OrderTerm { path, direction })
        }
        _ => Err(UrpcError::bad_request(format!(
            "order_by.{field}: expected a direction or {{path, sortOrder}}"
        ))),
    }
}

impl TryFrom<Value> for OrderBy {
    type Error = UrpcError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let objects = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => vec![map],
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    _ => Err(UrpcError::bad_request("order_by: expected objects")),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(UrpcError::bad_request("order_by: expected an object or array")),
        };

        let mut order = Self::default();
        for map in objects {
            for (field, term) in map {
                order.terms.push(parse_term(field, term)?);
            }
        }
        Ok(order)
    }
}

impl From<OrderBy> for Value {
    fn from(order: OrderBy) -> Self {
        let items: Vec<Value> = order
            .terms
            .iter()
            .map(|term| {
                let (field, value) = term.to_value();
                let mut map = Map::new();
                map.insert(field, value);
                Value::Object(map)
            })
            .collect();
        Value::Array(items)
    }
}
