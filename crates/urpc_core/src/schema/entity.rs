//! Declarative entity definitions.
//!
//! # Responsibility
//! - Describe one record type as an ordered field-descriptor map.
//! - Own entity-name normalization shared by registry and config lookups.
//!
//! # Invariants
//! - Field names are unique identifiers within one entity.
//! - Definitions are immutable once built; schemas are re-derived, never patched.

use crate::error::{UrpcError, UrpcResult};
use crate::schema::field::{declare_field, FieldKind, FieldMetadata, FieldOptions};
use once_cell::sync::Lazy;
use regex::Regex;

const ENTITY_SUFFIX: &str = "entity";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Lowercased entity name with a trailing `Entity` suffix removed.
///
/// `UserEntity`, `userentity`, `User` and `user` all simplify to `user`.
pub fn simplify_entity_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_suffix(ENTITY_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => lower,
    }
}

/// Entity name with a trailing `Entity` suffix removed, original casing kept.
pub fn display_entity_name(name: &str) -> &str {
    let trimmed = name.trim();
    let len = trimmed.len();
    if len > ENTITY_SUFFIX.len() && trimmed.to_ascii_lowercase().ends_with(ENTITY_SUFFIX) {
        &trimmed[..len - ENTITY_SUFFIX.len()]
    } else {
        trimmed
    }
}

/// Rust types that describe an entity.
pub trait Entity {
    const NAME: &'static str;

    fn definition() -> UrpcResult<EntityDefinition>;
}

/// Named record type with ordered field metadata.
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    name: String,
    description: Option<String>,
    fields: Vec<(String, FieldMetadata)>,
}

impl EntityDefinition {
    pub fn builder(name: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            name: name.into(),
            description: None,
            fields: Vec::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simplified_name(&self) -> String {
        simplify_entity_name(&self.name)
    }

    pub fn display_name(&self) -> &str {
        display_entity_name(&self.name)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// All declared fields, actions included, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldMetadata)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, field)| field)
    }

    pub fn data_fields(&self) -> impl Iterator<Item = (&str, &FieldMetadata)> {
        self.fields().filter(|(_, field)| field.kind != FieldKind::Action)
    }

    pub fn actions(&self) -> impl Iterator<Item = (&str, &FieldMetadata)> {
        self.fields().filter(|(_, field)| field.kind == FieldKind::Action)
    }
}

/// Builder collecting field declarations; the first invalid declaration wins.
#[derive(Debug)]
pub struct EntityBuilder {
    name: String,
    description: Option<String>,
    fields: Vec<(String, FieldMetadata)>,
    error: Option<UrpcError>,
}

impl EntityBuilder {
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, metadata: FieldMetadata) -> Self {
        if self.error.is_none() {
            if let Err(err) = metadata.validate() {
                self.error = Some(err);
            }
        }
        self.fields.push((name.into(), metadata));
        self
    }

    /// Declares a field from its type name, e.g. `"string"`.
    pub fn declare(mut self, name: impl Into<String>, kind: &str, options: FieldOptions) -> Self {
        let name = name.into();
        match declare_field(kind, options) {
            Ok(metadata) => self.fields.push((name, metadata)),
            Err(err) => {
                if self.error.is_none() {
                    self.error = Some(UrpcError::bad_request(format!(
                        "{}.{name}: {}",
                        self.name,
                        err.message()
                    )));
                }
            }
        }
        self
    }

    pub fn build(self) -> UrpcResult<EntityDefinition> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let name = self.name.trim().to_string();
        if !IDENTIFIER.is_match(&name) {
            return Err(UrpcError::bad_request(format!(
                "entity name is invalid: `{name}`"
            )));
        }

        let mut seen = std::collections::BTreeSet::new();
        for (field_name, _) in &self.fields {
            if !IDENTIFIER.is_match(field_name) {
                return Err(UrpcError::bad_request(format!(
                    "{name}: field name is invalid: `{field_name}`"
                )));
            }
            if !seen.insert(field_name.as_str()) {
                return Err(UrpcError::bad_request(format!(
                    "{name}: field declared twice: `{field_name}`"
                )));
            }
        }

        Ok(EntityDefinition {
            name,
            description: self.description,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{display_entity_name, simplify_entity_name, EntityDefinition};
    use crate::error::ErrorCode;
    use crate::schema::field::{FieldMetadata, FieldOptions};
    use serde_json::json;

    #[test]
    fn simplify_strips_suffix_case_insensitively() {
        assert_eq!(simplify_entity_name("UserEntity"), "user");
        assert_eq!(simplify_entity_name("userENTITY"), "user");
        assert_eq!(simplify_entity_name("User"), "user");
        assert_eq!(simplify_entity_name(" user "), "user");
    }

    #[test]
    fn simplify_keeps_bare_suffix_word() {
        assert_eq!(simplify_entity_name("Entity"), "entity");
    }

    #[test]
    fn display_name_keeps_casing() {
        assert_eq!(display_entity_name("BlogPostEntity"), "BlogPost");
        assert_eq!(display_entity_name("BlogPost"), "BlogPost");
        assert_eq!(display_entity_name("Entity"), "Entity");
    }

    #[test]
    fn builder_preserves_declaration_order_and_splits_actions() {
        let entity = EntityDefinition::builder("TaskEntity")
            .field("id", FieldMetadata::string())
            .field("title", FieldMetadata::string().optional())
            .field(
                "complete",
                FieldMetadata::action(json!({"type": "object"}), json!({"type": "boolean"})),
            )
            .build()
            .expect("valid entity");

        let names: Vec<&str> = entity.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "title", "complete"]);
        assert_eq!(entity.data_fields().count(), 2);
        assert_eq!(entity.actions().count(), 1);
        assert_eq!(entity.simplified_name(), "task");
    }

    #[test]
    fn builder_fails_fast_on_unknown_type() {
        let err = EntityDefinition::builder("User")
            .declare("id", "uuid", FieldOptions::default())
            .declare("name", "string", FieldOptions::default())
            .build()
            .expect_err("unknown type must fail");
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert!(err.message().starts_with("User.id"));
    }

    #[test]
    fn builder_rejects_duplicate_fields() {
        let err = EntityDefinition::builder("User")
            .field("id", FieldMetadata::string())
            .field("id", FieldMetadata::number())
            .build()
            .expect_err("duplicate must fail");
        assert!(err.message().contains("declared twice"));
    }
}
