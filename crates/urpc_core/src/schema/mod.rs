//! Entity metadata registry and structural schema derivation.
//!
//! # Responsibility
//! - Hold per-entity field descriptors as plain data.
//! - Derive JSON-Schema-like objects on demand.
//!
//! # Invariants
//! - Malformed field metadata fails at declaration time, not at derivation.
//! - Relations are embedded as name references, never inlined.

pub mod entity;
pub mod field;
pub mod generate;

pub use entity::{
    display_entity_name, simplify_entity_name, Entity, EntityBuilder, EntityDefinition,
};
pub use field::{declare_field, FieldKind, FieldMetadata, FieldOptions, RelationTarget};
pub use generate::{generate_schema, generate_schemas, Schema};
