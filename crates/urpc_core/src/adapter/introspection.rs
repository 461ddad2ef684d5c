//! Built-in `_schema` entity served from the `_global` source.

use crate::adapter::contract::DataAdapter;
use crate::catalog::EntityCatalog;
use crate::error::UrpcResult;
use crate::middleware::context::OperationContext;
use crate::query::{FindManyArgs, FindOneArgs};
use crate::schema::{EntityDefinition, FieldMetadata};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const SCHEMA_ENTITY: &str = "_schema";
pub const GLOBAL_SOURCE: &str = "_global";

/// Definition of the `_schema` rows.
pub fn schema_entity() -> UrpcResult<EntityDefinition> {
    EntityDefinition::builder(SCHEMA_ENTITY)
        .describe("Registered entities with their schema and sources")
        .field("name", FieldMetadata::string())
        .field(
            "schema",
            FieldMetadata::object()
                .optional()
                .describe("Structural schema object"),
        )
        .field("sources", FieldMetadata::list().describe("Registered source names"))
        .build()
}

/// Read-only adapter over the bootstrap catalog.
pub struct SchemaAdapter {
    catalog: Arc<EntityCatalog>,
}

impl SchemaAdapter {
    pub fn new(catalog: Arc<EntityCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl DataAdapter for SchemaAdapter {
    async fn find_many(
        &self,
        args: FindManyArgs,
        _ctx: &OperationContext,
    ) -> UrpcResult<Vec<Value>> {
        let mut rows = self.catalog.describe_all();
        if let Some(filter) = &args.filter {
            rows.retain(|row| filter.matches(row));
        }
        if let Some(order) = &args.order_by {
            order.sort(&mut rows);
        }
        let rows = rows.into_iter().skip(args.offset.unwrap_or(0));
        Ok(match args.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        })
    }

    async fn find_one(&self, args: FindOneArgs, _ctx: &OperationContext) -> UrpcResult<Option<Value>> {
        if let Some(Value::String(name)) = args.filter.pinned_value("name") {
            return Ok(self.catalog.describe(name));
        }
        Ok(self
            .catalog
            .describe_all()
            .into_iter()
            .find(|row| args.filter.matches(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::{schema_entity, SchemaAdapter, GLOBAL_SOURCE, SCHEMA_ENTITY};
    use crate::adapter::contract::{dispatch, ops};
    use crate::catalog::EntityCatalog;
    use crate::error::ErrorCode;
    use crate::middleware::context::OperationContext;
    use crate::schema::generate_schemas;
    use serde_json::json;
    use std::sync::Arc;

    fn adapter() -> SchemaAdapter {
        let definition = schema_entity().expect("schema entity");
        let schemas = generate_schemas([&definition]);
        let sources = EntityCatalog::group_sources([(SCHEMA_ENTITY, GLOBAL_SOURCE), ("user", "memory")]);
        SchemaAdapter::new(Arc::new(EntityCatalog::new(schemas, sources)))
    }

    #[tokio::test]
    async fn lists_and_finds_entities() {
        let ctx = OperationContext::system(SCHEMA_ENTITY, GLOBAL_SOURCE);
        let rows = dispatch(&adapter(), ops::FIND_MANY, json!({}), &ctx)
            .await
            .expect("list");
        let names: Vec<_> = rows
            .as_array()
            .expect("array")
            .iter()
            .map(|row| row["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("_schema"), json!("user")]);

        let user = dispatch(&adapter(), ops::FIND_ONE, json!({"where": {"name": "UserEntity"}}), &ctx)
            .await
            .expect("find one");
        assert_eq!(user["sources"], json!(["memory"]));
        assert_eq!(user["schema"], json!(null));
    }

    #[tokio::test]
    async fn describes_its_own_rows() {
        let ctx = OperationContext::system(SCHEMA_ENTITY, GLOBAL_SOURCE);
        let row = dispatch(&adapter(), ops::FIND_ONE, json!({"where": {"name": "_schema"}}), &ctx)
            .await
            .expect("find one");
        let properties = &row["schema"]["properties"];
        assert_eq!(properties["name"], json!({"type": "string"}));
        assert_eq!(properties["schema"]["type"], json!("object"));
        assert_eq!(properties["sources"]["type"], json!("array"));
        assert_eq!(row["schema"]["required"], json!(["name", "sources"]));
        assert!(row["schema"].is_object());
        assert!(row["sources"].is_array());
    }

    #[tokio::test]
    async fn writes_are_not_implemented() {
        let ctx = OperationContext::system(SCHEMA_ENTITY, GLOBAL_SOURCE);
        let err = dispatch(&adapter(), ops::CREATE, json!({"data": {"name": "x"}}), &ctx)
            .await
            .expect_err("read only");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
