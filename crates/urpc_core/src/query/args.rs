//! Argument records for the fixed adapter operations.

use crate::error::{UrpcError, UrpcResult};
use crate::query::filter::WhereClause;
use crate::query::order::OrderBy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decodes operation arguments; `null` is read as an empty object so records
/// whose keys are all optional accept omitted arguments.
pub fn decode_args<T: DeserializeOwned>(operation: &str, args: Value) -> UrpcResult<T> {
    let args = if args.is_null() {
        Value::Object(Map::new())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|err| UrpcError::bad_request(format!("invalid `{operation}` arguments: {err}")))
}

pub fn encode_args<T: Serialize>(args: &T) -> UrpcResult<Value> {
    serde_json::to_value(args)
        .map_err(|err| UrpcError::internal(format!("failed to encode arguments: {err}")))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindManyArgs {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<WhereClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Value>,
}

impl FindManyArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: WhereClause) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOneArgs {
    #[serde(rename = "where", default)]
    pub filter: WhereClause,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Value>,
}

impl FindOneArgs {
    pub fn new(filter: WhereClause) -> Self {
        Self {
            filter,
            include: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateArgs {
    pub data: Value,
}

impl CreateArgs {
    pub fn new(data: Value) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateManyArgs {
    pub data: Vec<Value>,
}

impl CreateManyArgs {
    pub fn new(data: Vec<Value>) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateArgs {
    #[serde(rename = "where")]
    pub filter: WhereClause,
    pub data: Value,
}

impl UpdateArgs {
    pub fn new(filter: WhereClause, data: Value) -> Self {
        Self { filter, data }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateManyArgs {
    #[serde(rename = "where", default)]
    pub filter: WhereClause,
    pub data: Value,
}

impl UpdateManyArgs {
    pub fn new(filter: WhereClause, data: Value) -> Self {
        Self { filter, data }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertArgs {
    #[serde(rename = "where")]
    pub filter: WhereClause,
    pub create: Value,
    pub update: Value,
}

impl UpsertArgs {
    pub fn new(filter: WhereClause, create: Value, update: Value) -> Self {
        Self {
            filter,
            create,
            update,
        }
    }
}

/// Field(s) identifying an existing row in bulk upserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConflictTarget {
    Field(String),
    Fields(Vec<String>),
}

impl ConflictTarget {
    /// Single conflict field; composite keys are not supported.
    pub fn single_field(&self) -> UrpcResult<&str> {
        match self {
            Self::Field(field) => Ok(field.as_str()),
            Self::Fields(fields) if fields.len() == 1 => Ok(fields[0].as_str()),
            Self::Fields(fields) => Err(UrpcError::bad_request(format!(
                "composite upsert conflict targets are not supported: [{}]",
                fields.join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertManyArgs {
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_conflict: Option<ConflictTarget>,
}

impl UpsertManyArgs {
    pub fn new(data: Vec<Value>) -> Self {
        Self {
            data,
            on_conflict: None,
        }
    }

    pub fn on_conflict(mut self, field: impl Into<String>) -> Self {
        self.on_conflict = Some(ConflictTarget::Field(field.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteArgs {
    #[serde(rename = "where")]
    pub filter: WhereClause,
}

impl DeleteArgs {
    pub fn new(filter: WhereClause) -> Self {
        Self { filter }
    }
}
