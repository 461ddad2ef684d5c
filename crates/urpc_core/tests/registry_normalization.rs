use std::sync::Arc;
use urpc_core::{simplify_entity_name, BaseAdapter, MemoryAdapter, MiddlewareManager, RepoRegistry};

fn registry() -> RepoRegistry {
    RepoRegistry::new(Arc::new(MiddlewareManager::new()))
}

#[test]
fn suffix_and_case_resolve_to_one_slot() {
    for name in ["user", "User", "USER", "Order", "lineItem"] {
        let registry = registry();
        let suffixed = format!("{name}Entity");
        let repo = registry
            .register_adapter(&suffixed, "memory", Arc::new(MemoryAdapter::new()))
            .unwrap();

        for lookup in [
            name.to_string(),
            suffixed.clone(),
            name.to_lowercase(),
            format!("{}ENTITY", name.to_uppercase()),
        ] {
            let found = registry.get_repo(&lookup, "memory").unwrap();
            assert!(Arc::ptr_eq(found.adapter(), repo.adapter()), "lookup {lookup}");
        }
        assert_eq!(registry.len(), 1);
    }
}

#[test]
fn bare_entity_name_is_not_stripped() {
    assert_eq!(simplify_entity_name("Entity"), "entity");
    let registry = registry();
    registry
        .register_adapter("Entity", "memory", Arc::new(BaseAdapter))
        .unwrap();
    assert!(registry.contains("entity", "memory"));
}

#[test]
fn lookup_of_unknown_key_is_none() {
    let registry = registry();
    registry
        .register_adapter("user", "a", Arc::new(MemoryAdapter::new()))
        .unwrap();
    assert!(registry.get_repo("user", "b").is_none());
    assert!(registry.get_repo("post", "a").is_none());
}

#[test]
fn clear_drops_every_entry() {
    let registry = registry();
    registry
        .register_adapter("user", "a", Arc::new(MemoryAdapter::new()))
        .unwrap();
    registry
        .register_adapter("post", "a", Arc::new(MemoryAdapter::new()))
        .unwrap();
    assert_eq!(registry.keys(), vec!["post:a".to_string(), "user:a".to_string()]);

    registry.clear();
    assert!(registry.is_empty());
}
