use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use urpc_core::{
    CreateArgs, DataAdapter, EntityConfig, EntityDefinition, ErrorCode, FieldMetadata,
    FindManyArgs, FindOneArgs, GlobalAdapter, Intent, MemoryAdapter, Middleware,
    MiddlewareContext, MiddlewareRequirements, Next, OperationContext, Plugin, RelationTarget,
    Urpc, UrpcConfig, UrpcError, UrpcResult, WhereClause,
};

/// Supports single `create` only.
#[derive(Default)]
struct SingleInsertAdapter {
    rows: Mutex<Vec<Value>>,
}

#[async_trait]
impl DataAdapter for SingleInsertAdapter {
    async fn find_many(
        &self,
        _args: FindManyArgs,
        _ctx: &OperationContext,
    ) -> UrpcResult<Vec<Value>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn create(&self, args: CreateArgs, _ctx: &OperationContext) -> UrpcResult<Value> {
        if args.data.get("id").is_none() {
            return Err(UrpcError::bad_request("id is required"));
        }
        self.rows.lock().unwrap().push(args.data.clone());
        Ok(args.data)
    }
}

struct NeedsAudit;

#[async_trait]
impl Middleware for NeedsAudit {
    fn name(&self) -> &str {
        "audit"
    }

    fn requirements(&self) -> MiddlewareRequirements {
        MiddlewareRequirements {
            entities: vec!["AuditEntity".to_string()],
        }
    }

    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> UrpcResult<Value> {
        next.run(ctx).await
    }
}

fn user_entity() -> EntityDefinition {
    EntityDefinition::builder("UserEntity")
        .field("id", FieldMetadata::number())
        .field("name", FieldMetadata::string().optional())
        .field(
            "posts",
            FieldMetadata::array(RelationTarget::named("PostEntity")).optional(),
        )
        .build()
        .unwrap()
}

fn post_entity() -> EntityDefinition {
    EntityDefinition::builder("PostEntity")
        .field("id", FieldMetadata::number())
        .field("author", FieldMetadata::record(RelationTarget::named("UserEntity")))
        .build()
        .unwrap()
}

fn demo_plugin() -> Plugin {
    Plugin::new("demo")
        .with_entity(user_entity())
        .with_entity(post_entity())
}

#[tokio::test]
async fn seeds_through_bulk_create() {
    let urpc = Urpc::bootstrap(
        UrpcConfig::new()
            .plugin(demo_plugin())
            .global_adapter(GlobalAdapter::new("memory", MemoryAdapter::factory()))
            .entity_config(
                "user",
                EntityConfig::default().with_init_data(vec![json!({"id": 1}), json!({"id": 2})]),
            ),
    )
    .await
    .unwrap();

    let rows = urpc
        .repo("user", None)
        .unwrap()
        .find_many(FindManyArgs::default())
        .await
        .unwrap();
    assert_eq!(rows, vec![json!({"id": 1}), json!({"id": 2})]);
}

#[tokio::test]
async fn seeding_falls_back_to_single_creates_and_never_fails_bootstrap() {
    let adapter = Arc::new(SingleInsertAdapter::default());
    let urpc = Urpc::bootstrap(
        UrpcConfig::new()
            .plugin(demo_plugin().with_adapter("user", "legacy", adapter.clone()))
            .entity_config(
                "UserEntity",
                EntityConfig::default()
                    .with_default_source("legacy")
                    .with_init_data(vec![json!({"id": 1}), json!({"name": "no id"}), json!({"id": 3})]),
            ),
    )
    .await
    .unwrap();

    let mut ids: Vec<i64> = adapter
        .rows
        .lock()
        .unwrap()
        .iter()
        .filter_map(|row| row["id"].as_i64())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(urpc.repo("user", None).unwrap().source(), "legacy");
}

#[tokio::test]
async fn global_adapters_back_every_declared_entity_unless_explicit() {
    let explicit = Arc::new(MemoryAdapter::new());
    let urpc = Urpc::bootstrap(
        UrpcConfig::new()
            .plugin(demo_plugin().with_adapter("PostEntity", "memory", explicit.clone()))
            .global_adapter(GlobalAdapter::new("memory", MemoryAdapter::factory()))
            .global_adapter(GlobalAdapter::new("mock", MemoryAdapter::factory())),
    )
    .await
    .unwrap();

    assert_eq!(
        urpc.entity_sources().get("user"),
        Some(&vec!["memory".to_string(), "mock".to_string()])
    );
    assert_eq!(
        urpc.entity_sources().get("post"),
        Some(&vec!["memory".to_string(), "mock".to_string()])
    );
    assert_eq!(
        urpc.entity_sources().get("_schema"),
        Some(&vec!["_global".to_string()])
    );

    let post_repo = urpc.repo("post", Some("memory")).unwrap();
    let explicit_dyn: Arc<dyn DataAdapter> = explicit;
    assert!(Arc::ptr_eq(post_repo.adapter(), &explicit_dyn));

    let err = urpc.repo("user", None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadRequest);
    let err = urpc.repo("user", Some("postgres")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn schemas_embed_relations_by_name() {
    let urpc = Urpc::bootstrap(UrpcConfig::new().plugin(demo_plugin()))
        .await
        .unwrap();

    let user = urpc.entity_schemas().get("user").unwrap().to_value();
    assert_eq!(
        user,
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "number"},
                "name": {"type": "string"},
                "posts": {"type": "array", "items": {"$ref": "PostEntity"}}
            },
            "required": ["id"]
        })
    );
    let post = urpc.entity_schemas().get("post").unwrap().to_value();
    assert_eq!(post["properties"]["author"], json!({"type": "object", "$ref": "UserEntity"}));
    assert!(urpc.entity_schemas().contains_key("_schema"));
}

#[tokio::test]
async fn missing_required_entity_fails_bootstrap() {
    let result = Urpc::bootstrap(
        UrpcConfig::new()
            .plugin(demo_plugin())
            .global_adapter(GlobalAdapter::new("memory", MemoryAdapter::factory()))
            .middleware(Arc::new(NeedsAudit)),
    )
    .await;
    let err = result.err().unwrap();
    assert_eq!(err.code(), ErrorCode::BadRequest);
    assert!(err.message().contains("audit"));

    let audit = EntityDefinition::builder("AuditEntity")
        .field("id", FieldMetadata::number())
        .build()
        .unwrap();
    let urpc = Urpc::bootstrap(
        UrpcConfig::new()
            .plugin(demo_plugin().with_entity(audit))
            .global_adapter(GlobalAdapter::new("memory", MemoryAdapter::factory()))
            .middleware(Arc::new(NeedsAudit)),
    )
    .await
    .unwrap();
    assert_eq!(urpc.middleware().names(), vec!["audit".to_string()]);
}

#[tokio::test]
async fn introspection_entity_lists_registered_entities() {
    let urpc = Urpc::bootstrap(
        UrpcConfig::new()
            .plugin(demo_plugin())
            .global_adapter(GlobalAdapter::new("memory", MemoryAdapter::factory())),
    )
    .await
    .unwrap();

    let schema_repo = urpc.repo("_schema", None).unwrap();
    let rows = schema_repo.find_many(FindManyArgs::default()).await.unwrap();
    let names: Vec<_> = rows.iter().map(|row| row["name"].clone()).collect();
    assert_eq!(names, vec![json!("_schema"), json!("post"), json!("user")]);

    let user = schema_repo
        .find_one(FindOneArgs::new(WhereClause::eq("name", "user")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user["sources"], json!(["memory"]));
    assert_eq!(user["schema"]["required"], json!(["id"]));
}

#[tokio::test]
async fn intents_dispatch_through_repositories() {
    let urpc = Urpc::bootstrap(
        UrpcConfig::new()
            .plugin(demo_plugin())
            .global_adapter(GlobalAdapter::new("memory", MemoryAdapter::factory())),
    )
    .await
    .unwrap();

    urpc.dispatch(Intent::new("user", "create", json!({"data": {"id": 7}})))
        .await
        .unwrap();
    let rows = urpc
        .dispatch(
            Intent::from_json_str(
                r#"{"entity":"UserEntity","source":"memory","operation":"findMany","args":{"where":{"id":7}}}"#,
            )
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rows, json!([{"id": 7}]));

    let err = urpc
        .dispatch(Intent::new("user", "archive", json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}
