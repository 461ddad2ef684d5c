//! Schema derivation from entity definitions.

use crate::schema::entity::EntityDefinition;
use crate::schema::field::{FieldKind, FieldMetadata};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Structural description of one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub actions: Map<String, Value>,
}

impl Schema {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Derives the schema of one entity.
///
/// Data fields land in `properties`; fields without `optional` are listed in
/// `required` in declaration order. Action fields are described under
/// `actions` and are never required.
pub fn generate_schema(entity: &EntityDefinition) -> Schema {
    let mut properties = Map::new();
    let mut required = Vec::new();
    let mut actions = Map::new();

    for (name, field) in entity.fields() {
        if field.kind == FieldKind::Action {
            actions.insert(name.to_string(), action_schema(field));
            continue;
        }
        properties.insert(name.to_string(), field_schema(field));
        if !field.optional {
            required.push(name.to_string());
        }
    }

    Schema {
        kind: "object".to_string(),
        properties,
        required,
        actions,
    }
}

/// Derives schemas keyed by simplified entity name.
pub fn generate_schemas<'a, I>(entities: I) -> BTreeMap<String, Schema>
where
    I: IntoIterator<Item = &'a EntityDefinition>,
{
    entities
        .into_iter()
        .map(|entity| (entity.simplified_name(), generate_schema(entity)))
        .collect()
}

fn field_schema(field: &FieldMetadata) -> Value {
    let mut schema = match field.kind {
        FieldKind::String => json!({"type": "string"}),
        FieldKind::Number => json!({"type": "number"}),
        FieldKind::Boolean => json!({"type": "boolean"}),
        FieldKind::Date => json!({"type": "string", "format": "date-time"}),
        FieldKind::Array => match &field.target {
            Some(target) => json!({"type": "array", "items": {"$ref": target.resolve_name()}}),
            None => json!({"type": "array"}),
        },
        FieldKind::Record => match &field.target {
            Some(target) => json!({"type": "object", "$ref": target.resolve_name()}),
            None => json!({"type": "object"}),
        },
        FieldKind::Action => action_schema(field),
    };

    if let (Some(description), Value::Object(map)) = (&field.description, &mut schema) {
        map.insert("description".to_string(), Value::String(description.clone()));
    }
    schema
}

fn action_schema(field: &FieldMetadata) -> Value {
    let mut schema = Map::new();
    if let Some(description) = &field.description {
        schema.insert("description".to_string(), Value::String(description.clone()));
    }
    schema.insert(
        "params".to_string(),
        field.params.clone().unwrap_or_else(|| json!({})),
    );
    schema.insert(
        "returns".to_string(),
        field.returns.clone().unwrap_or(Value::Null),
    );
    Value::Object(schema)
}
