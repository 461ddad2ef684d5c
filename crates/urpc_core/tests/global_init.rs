use serde_json::json;
use urpc_core::urpc::{global, init, repo};
use urpc_core::{
    EntityConfig, EntityDefinition, ErrorCode, FieldMetadata, FindManyArgs, GlobalAdapter,
    MemoryAdapter, Plugin, UrpcConfig,
};

fn plugin(entity: &str) -> Plugin {
    Plugin::new(entity).with_entity(
        EntityDefinition::builder(entity)
            .field("id", FieldMetadata::number())
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn second_init_is_a_no_op() {
    let err = repo("user", None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InternalServerError);
    assert!(global().is_none());

    let first = init(
        UrpcConfig::new()
            .plugin(plugin("UserEntity"))
            .global_adapter(GlobalAdapter::new("memory", MemoryAdapter::factory()))
            .entity_config(
                "user",
                EntityConfig::default().with_init_data(vec![json!({"id": 1})]),
            ),
    )
    .await
    .unwrap();

    let second = init(
        UrpcConfig::new()
            .plugin(plugin("OrderEntity"))
            .global_adapter(GlobalAdapter::new("mock", MemoryAdapter::factory())),
    )
    .await
    .unwrap();

    assert!(std::ptr::eq(first, second));
    assert!(second.entity_sources().contains_key("user"));
    assert!(!second.entity_sources().contains_key("order"));
    assert!(repo("order", None).is_err());

    let rows = repo("UserEntity", None)
        .unwrap()
        .find_many(FindManyArgs::default())
        .await
        .unwrap();
    assert_eq!(rows, vec![json!({"id": 1})]);
}
