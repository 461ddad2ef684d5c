//! Where-clause parsing and row matching.

use crate::error::UrpcError;
use crate::query::compare::{compare_scalars, values_equal};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

const AND_KEY: &str = "AND";
const OR_KEY: &str = "OR";

const OPERATOR_KEYS: &[&str] = &[
    "eq",
    "ne",
    "gt",
    "gte",
    "lt",
    "lte",
    "in",
    "nin",
    "contains",
    "startsWith",
    "endsWith",
    "mode",
    "not",
];

/// String comparison mode for operator objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    Sensitive,
    Insensitive,
}

/// Operator object applied to one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOperators {
    pub eq: Option<Value>,
    pub ne: Option<Value>,
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
    pub in_list: Option<Vec<Value>>,
    pub not_in_list: Option<Vec<Value>>,
    pub contains: Option<Value>,
    pub starts_with: Option<String>,
    pub ends_with: Option<String>,
    pub mode: MatchMode,
    pub not: Option<Box<Condition>>,
}

/// Constraint on one field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    Operators(FieldOperators),
}

/// Filter over rows: field conditions plus `AND`/`OR` composition.
///
/// Field conditions and `AND` members must all hold; when `OR` is non-empty at
/// least one member must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct WhereClause {
    fields: Vec<(String, Condition)>,
    and: Vec<WhereClause>,
    or: Vec<WhereClause>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality filter on one field.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and_eq(field, value)
    }

    pub fn and_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and_condition(field, Condition::Equals(value.into()))
    }

    pub fn and_condition(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.fields.push((field.into(), condition));
        self
    }

    pub fn and_all(mut self, clauses: Vec<WhereClause>) -> Self {
        self.and.extend(clauses);
        self
    }

    pub fn or_any(mut self, clauses: Vec<WhereClause>) -> Self {
        self.or.extend(clauses);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.and.is_empty() && self.or.is_empty()
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.fields.iter().map(|(field, condition)| (field.as_str(), condition))
    }

    /// Literal value a top-level field is pinned to (`field: v` or `{eq: v}`).
    pub fn pinned_value(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, condition)| match condition {
                Condition::Equals(value) => Some(value),
                Condition::Operators(ops) => ops.eq.as_ref(),
            })
    }

    /// Top-level `field: v` / `{eq: v}` pairs, used to seed created rows.
    pub fn pinned_fields(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|(name, _)| {
                self.pinned_value(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, condition)| condition.matches(row.get(field).unwrap_or(&Value::Null)))
            && self.and.iter().all(|clause| clause.matches(row))
            && (self.or.is_empty() || self.or.iter().any(|clause| clause.matches(row)))
    }
}

impl Condition {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Equals(expected) => values_equal(value, expected, MatchMode::Sensitive),
            Self::Operators(ops) => ops.matches(value),
        }
    }

    fn parse(field: &str, value: Value) -> Result<Self, UrpcError> {
        match value {
            Value::Object(map) if is_operator_object(&map) => {
                Ok(Self::Operators(FieldOperators::parse(field, map)?))
            }
            Value::Object(map) if map.keys().any(|key| OPERATOR_KEYS.contains(&key.as_str())) => {
                Err(UrpcError::bad_request(format!(
                    "where.{field}: operator object mixes operators with plain keys"
                )))
            }
            other => Ok(Self::Equals(other)),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Equals(value) => value.clone(),
            Self::Operators(ops) => ops.to_value(),
        }
    }
}

impl FieldOperators {
    pub fn matches(&self, value: &Value) -> bool {
        let mode = self.mode;
        let ordered = |operand: &Option<Value>, accept: fn(Ordering) -> bool| {
            operand.as_ref().map_or(true, |operand| {
                compare_scalars(value, operand, mode).is_some_and(accept)
            })
        };

        self.eq
            .as_ref()
            .map_or(true, |operand| values_equal(value, operand, mode))
            && self
                .ne
                .as_ref()
                .map_or(true, |operand| !values_equal(value, operand, mode))
            && ordered(&self.gt, |ord| ord == Ordering::Greater)
            && ordered(&self.gte, |ord| ord != Ordering::Less)
            && ordered(&self.lt, |ord| ord == Ordering::Less)
            && ordered(&self.lte, |ord| ord != Ordering::Greater)
            && self.in_list.as_ref().map_or(true, |list| {
                list.iter().any(|item| values_equal(value, item, mode))
            })
            && self.not_in_list.as_ref().map_or(true, |list| {
                !list.iter().any(|item| values_equal(value, item, mode))
            })
            && self
                .contains
                .as_ref()
                .map_or(true, |needle| contains(value, needle, mode))
            && self.starts_with.as_ref().map_or(true, |prefix| {
                string_test(value, prefix, mode, |text, prefix| text.starts_with(prefix))
            })
            && self.ends_with.as_ref().map_or(true, |suffix| {
                string_test(value, suffix, mode, |text, suffix| text.ends_with(suffix))
            })
            && self.not.as_ref().map_or(true, |inner| match inner.as_ref() {
                Condition::Equals(operand) => !values_equal(value, operand, mode),
                Condition::Operators(ops) => !ops.matches(value),
            })
    }

    fn parse(field: &str, map: Map<String, Value>) -> Result<Self, UrpcError> {
        let mut ops = Self::default();
        for (key, operand) in map {
            match key.as_str() {
                "eq" => ops.eq = Some(operand),
                "ne" => ops.ne = Some(operand),
                "gt" => ops.gt = Some(operand),
                "gte" => ops.gte = Some(operand),
                "lt" => ops.lt = Some(operand),
                "lte" => ops.lte = Some(operand),
                "in" => ops.in_list = Some(expect_list(field, &key, operand)?),
                "nin" => ops.not_in_list = Some(expect_list(field, &key, operand)?),
                "contains" => ops.contains = Some(operand),
                "startsWith" => ops.starts_with = Some(expect_string(field, &key, operand)?),
                "endsWith" => ops.ends_with = Some(expect_string(field, &key, operand)?),
                "mode" => {
                    ops.mode = match expect_string(field, &key, operand)?.as_str() {
                        "sensitive" => MatchMode::Sensitive,
                        "insensitive" => MatchMode::Insensitive,
                        other => {
                            return Err(UrpcError::bad_request(format!(
                                "where.{field}.mode: expected sensitive|insensitive, got `{other}`"
                            )))
                        }
                    }
                }
                "not" => ops.not = Some(Box::new(Condition::parse(field, operand)?)),
                other => {
                    return Err(UrpcError::bad_request(format!(
                        "where.{field}: unknown operator `{other}`"
                    )))
                }
            }
        }
        Ok(ops)
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };
        put("eq", self.eq.clone());
        put("ne", self.ne.clone());
        put("gt", self.gt.clone());
        put("gte", self.gte.clone());
        put("lt", self.lt.clone());
        put("lte", self.lte.clone());
        put("in", self.in_list.clone().map(Value::Array));
        put("nin", self.not_in_list.clone().map(Value::Array));
        put("contains", self.contains.clone());
        put("startsWith", self.starts_with.clone().map(Value::String));
        put("endsWith", self.ends_with.clone().map(Value::String));
        if self.mode == MatchMode::Insensitive {
            put("mode", Some(Value::String("insensitive".to_string())));
        }
        put("not", self.not.as_ref().map(|inner| inner.to_value()));
        Value::Object(map)
    }
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    map.is_empty() || map.keys().all(|key| OPERATOR_KEYS.contains(&key.as_str()))
}

fn expect_list(field: &str, key: &str, operand: Value) -> Result<Vec<Value>, UrpcError> {
    match operand {
        Value::Array(items) => Ok(items),
        _ => Err(UrpcError::bad_request(format!(
            "where.{field}.{key}: expected an array"
        ))),
    }
}

fn expect_string(field: &str, key: &str, operand: Value) -> Result<String, UrpcError> {
    match operand {
        Value::String(text) => Ok(text),
        _ => Err(UrpcError::bad_request(format!(
            "where.{field}.{key}: expected a string"
        ))),
    }
}

fn contains(value: &Value, needle: &Value, mode: MatchMode) -> bool {
    match (value, needle) {
        (Value::Array(items), _) => items.iter().any(|item| values_equal(item, needle, mode)),
        (Value::String(_), Value::String(needle)) => {
            string_test(value, needle, mode, |text, needle| text.contains(needle))
        }
        _ => false,
    }
}

fn string_test(value: &Value, operand: &str, mode: MatchMode, test: fn(&str, &str) -> bool) -> bool {
    let Value::String(text) = value else {
        return false;
    };
    match mode {
        MatchMode::Sensitive => test(text, operand),
        MatchMode::Insensitive => test(&text.to_lowercase(), &operand.to_lowercase()),
    }
}

impl TryFrom<Value> for WhereClause {
    type Error = UrpcError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            _ => return Err(UrpcError::bad_request("where: expected an object")),
        };

        let mut clause = Self::default();
        for (key, value) in map {
            match key.as_str() {
                AND_KEY => clause.and = parse_clause_list(AND_KEY, value)?,
                OR_KEY => clause.or = parse_clause_list(OR_KEY, value)?,
                _ => {
                    let condition = Condition::parse(&key, value)?;
                    clause.fields.push((key, condition));
                }
            }
        }
        Ok(clause)
    }
}

fn parse_clause_list(key: &str, value: Value) -> Result<Vec<WhereClause>, UrpcError> {
    match value {
        Value::Array(items) => items.into_iter().map(WhereClause::try_from).collect(),
        single @ Value::Object(_) => Ok(vec![WhereClause::try_from(single)?]),
        _ => Err(UrpcError::bad_request(format!(
            "where.{key}: expected an array of where clauses"
        ))),
    }
}

impl From<WhereClause> for Value {
    fn from(clause: WhereClause) -> Self {
        let mut map = Map::new();
        for (field, condition) in &clause.fields {
            map.insert(field.clone(), condition.to_value());
        }
        if !clause.and.is_empty() {
            map.insert(
                AND_KEY.to_string(),
                Value::Array(clause.and.into_iter().map(Value::from).collect()),
            );
        }
        if !clause.or.is_empty() {
            map.insert(
                OR_KEY.to_string(),
                Value::Array(clause.or.into_iter().map(Value::from).collect()),
            );
        }
        Value::Object(map)
    }
}
