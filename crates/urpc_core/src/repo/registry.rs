//! Keyed map from `(entity, source)` to repository.

use crate::adapter::DataAdapter;
use crate::error::{UrpcError, UrpcResult};
use crate::middleware::MiddlewareManager;
use crate::repo::repository::Repository;
use crate::schema::simplify_entity_name;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry key `"{simplified entity}:{source}"`.
pub fn registry_key(entity: &str, source: &str) -> String {
    format!("{}:{}", simplify_entity_name(entity), source.trim())
}

/// Repositories sharing one middleware manager.
pub struct RepoRegistry {
    repos: RwLock<BTreeMap<String, Repository>>,
    middleware: Arc<MiddlewareManager>,
}

impl RepoRegistry {
    pub fn new(middleware: Arc<MiddlewareManager>) -> Self {
        Self {
            repos: RwLock::new(BTreeMap::new()),
            middleware,
        }
    }

    pub fn middleware(&self) -> &Arc<MiddlewareManager> {
        &self.middleware
    }

    /// Builds and stores a repository for `adapter`; an existing entry under
    /// the same key is replaced.
    pub fn register_adapter(
        &self,
        entity: &str,
        source: &str,
        adapter: Arc<dyn DataAdapter>,
    ) -> UrpcResult<Repository> {
        let simplified = simplify_entity_name(entity);
        let source = source.trim();
        if simplified.is_empty() {
            return Err(UrpcError::bad_request("entity name must not be blank"));
        }
        if source.is_empty() {
            return Err(UrpcError::bad_request(format!(
                "source for `{simplified}` must not be blank"
            )));
        }

        let key = registry_key(&simplified, source);
        let repo = Repository::new(
            simplified,
            source,
            adapter,
            Arc::clone(&self.middleware),
        );
        let replaced = self
            .repos
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), repo.clone())
            .is_some();
        if replaced {
            info!(
                "event=repo_register module=repo status=ok key={} replaced=true",
                key
            );
        } else {
            debug!("event=repo_register module=repo status=ok key={}", key);
        }
        Ok(repo)
    }

    /// Lookup only; `None` when nothing is registered under the key.
    pub fn get_repo(&self, entity: &str, source: &str) -> Option<Repository> {
        self.repos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&registry_key(entity, source))
            .cloned()
    }

    pub fn contains(&self, entity: &str, source: &str) -> bool {
        self.get_repo(entity, source).is_some()
    }

    /// Sorted registry keys.
    pub fn keys(&self) -> Vec<String> {
        self.repos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.repos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.repos
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{registry_key, RepoRegistry};
    use crate::adapter::{BaseAdapter, MemoryAdapter};
    use crate::error::ErrorCode;
    use crate::middleware::MiddlewareManager;
    use std::sync::Arc;

    #[test]
    fn key_normalizes_entity_only() {
        assert_eq!(registry_key("UserEntity", "memory"), "user:memory");
        assert_eq!(registry_key("user", "Memory"), "user:Memory");
    }

    #[test]
    fn reregistration_replaces_entry() {
        let registry = RepoRegistry::new(Arc::new(MiddlewareManager::new()));
        let first = registry
            .register_adapter("user", "memory", Arc::new(MemoryAdapter::new()))
            .expect("first");
        let second = registry
            .register_adapter("UserEntity", "memory", Arc::new(BaseAdapter))
            .expect("second");
        assert!(!Arc::ptr_eq(first.adapter(), second.adapter()));

        let current = registry.get_repo("user", "memory").expect("registered");
        assert!(Arc::ptr_eq(current.adapter(), second.adapter()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn blank_names_are_rejected() {
        let registry = RepoRegistry::new(Arc::new(MiddlewareManager::new()));
        let err = registry
            .register_adapter("  ", "memory", Arc::new(BaseAdapter))
            .expect_err("blank entity");
        assert_eq!(err.code(), ErrorCode::BadRequest);
        let err = registry
            .register_adapter("user", "", Arc::new(BaseAdapter))
            .expect_err("blank source");
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert!(registry.is_empty());
    }
}
