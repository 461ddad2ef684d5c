//! Ordered interceptor chain around repository operations.
//!
//! # Responsibility
//! - Keep registered middleware in registration order.
//! - Compose the non-excluded middleware around one operation per call.
//!
//! # Invariants
//! - Registration order is execution order: the first registered middleware
//!   is the outermost wrapper.
//! - The active chain is fixed synchronously before any middleware runs.
//! - Errors from middleware or the operation propagate unchanged.

use crate::config::{EntityConfig, EntityConfigs};
use crate::error::UrpcResult;
use crate::middleware::context::{MiddlewareContext, OperationContext};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Entities a middleware needs to be registered at bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiddlewareRequirements {
    pub entities: Vec<String>,
}

/// Interceptor composed around every repository operation.
///
/// Implementations call `next.run(ctx)` to continue the chain; returning
/// without calling it short-circuits the remaining middleware and the
/// operation itself.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Lookup key used for removal and per-entity exclusion; empty means a
    /// generated name.
    fn name(&self) -> &str {
        ""
    }

    fn requirements(&self) -> MiddlewareRequirements {
        MiddlewareRequirements::default()
    }

    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> UrpcResult<Value>;
}

/// The wrapped operation at the center of a chain.
pub struct Operation {
    run: Box<dyn FnOnce(Value, OperationContext) -> BoxFuture<'static, UrpcResult<Value>> + Send>,
}

impl Operation {
    pub fn new<F, Fut>(operation: F) -> Self
    where
        F: FnOnce(Value, OperationContext) -> Fut + Send + 'static,
        Fut: Future<Output = UrpcResult<Value>> + Send + 'static,
    {
        Self {
            run: Box::new(move |args, ctx| operation(args, ctx).boxed()),
        }
    }

    /// Invokes the operation with the context's current args and records the
    /// resolved value as the context result.
    async fn invoke(self, ctx: &mut MiddlewareContext) -> UrpcResult<Value> {
        let value = (self.run)(ctx.args.clone(), ctx.operation_context()).await?;
        ctx.set_result(value.clone());
        Ok(value)
    }
}

/// Continuation handed to each middleware.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    operation: Operation,
}

impl<'a> Next<'a> {
    /// Runs the rest of the chain, then the operation.
    pub async fn run(self, ctx: &mut MiddlewareContext) -> UrpcResult<Value> {
        match self.chain.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    chain: rest,
                    operation: self.operation,
                };
                head.handle(ctx, next).await
            }
            None => self.operation.invoke(ctx).await,
        }
    }
}

/// Options for [`MiddlewareManager::use_middleware`].
#[derive(Debug, Clone, Default)]
pub struct UseOptions {
    pub name: Option<String>,
    pub required: Option<MiddlewareRequirements>,
}

impl UseOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            required: None,
        }
    }
}

struct MiddlewareEntry {
    name: String,
    middleware: Arc<dyn Middleware>,
    required: MiddlewareRequirements,
}

/// Registered middleware plus the entity policy used for exclusions.
#[derive(Default)]
pub struct MiddlewareManager {
    entries: RwLock<Vec<MiddlewareEntry>>,
    entity_configs: RwLock<EntityConfigs>,
    generated_names: AtomicU64,
}

impl MiddlewareManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entity_configs(&self, configs: EntityConfigs) {
        *self
            .entity_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner) = configs;
    }

    pub fn entity_config(&self, entity: &str) -> Option<Arc<EntityConfig>> {
        self.entity_configs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
    }

    /// Appends a middleware and returns the name it is registered under.
    ///
    /// The name is `options.name`, else the middleware's own name, else a
    /// generated `middleware_<millis>_<seq>` key.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>, options: UseOptions) -> String {
        let name = options
            .name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                let own = middleware.name().trim();
                (!own.is_empty()).then(|| own.to_string())
            })
            .unwrap_or_else(|| self.generate_name());
        let required = options
            .required
            .unwrap_or_else(|| middleware.requirements());

        debug!(
            "event=middleware_use module=middleware status=ok name={}",
            name
        );
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MiddlewareEntry {
                name: name.clone(),
                middleware,
                required,
            });
        name
    }

    /// Removes every middleware registered under `name`.
    pub fn remove(&self, name: &str) -> bool {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|entry| entry.name != name);
        before != entries.len()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Registered names in execution order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn requirements(&self) -> Vec<(String, MiddlewareRequirements)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| (entry.name.clone(), entry.required.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `operation` inside every middleware not excluded for the
    /// context's entity and stores the resolved value as the context result.
    pub async fn execute(
        &self,
        ctx: &mut MiddlewareContext,
        operation: Operation,
    ) -> UrpcResult<Value> {
        let config = self.entity_config(ctx.entity());
        let chain = self.active_chain(config.as_deref());
        ctx.set_entity_config(config);

        if chain.is_empty() {
            return operation.invoke(ctx).await;
        }

        let value = Next {
            chain: &chain,
            operation,
        }
        .run(ctx)
        .await?;
        ctx.set_result(value.clone());
        Ok(value)
    }

    fn active_chain(&self, config: Option<&EntityConfig>) -> Vec<Arc<dyn Middleware>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| config.map_or(true, |config| !config.excludes(&entry.name)))
            .map(|entry| Arc::clone(&entry.middleware))
            .collect()
    }

    fn generate_name(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let seq = self.generated_names.fetch_add(1, Ordering::Relaxed);
        format!("middleware_{millis}_{seq}")
    }
}

#[cfg(test)]
mod tests {
    use super::{Middleware, MiddlewareManager, Next, Operation, UseOptions};
    use crate::error::UrpcResult;
    use crate::middleware::context::{MiddlewareContext, RequestMetadata};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Anonymous;

    #[async_trait]
    impl Middleware for Anonymous {
        async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> UrpcResult<Value> {
            next.run(ctx).await
        }
    }

    struct SeesResult {
        seen: Arc<std::sync::Mutex<Option<Value>>>,
    }

    #[async_trait]
    impl Middleware for SeesResult {
        fn name(&self) -> &str {
            "sees_result"
        }

        async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> UrpcResult<Value> {
            assert!(ctx.result().is_none());
            let value = next.run(ctx).await?;
            *self.seen.lock().expect("lock") = ctx.result().cloned();
            Ok(value)
        }
    }

    fn context() -> MiddlewareContext {
        MiddlewareContext::new("findMany", json!({}), RequestMetadata::new("user", "memory"))
    }

    #[test]
    fn unnamed_middleware_gets_generated_unique_names() {
        let manager = MiddlewareManager::new();
        let first = manager.use_middleware(Arc::new(Anonymous), UseOptions::default());
        let second = manager.use_middleware(Arc::new(Anonymous), UseOptions::default());
        assert!(first.starts_with("middleware_"));
        assert_ne!(first, second);
        assert_eq!(manager.names(), vec![first, second]);
    }

    #[test]
    fn explicit_name_overrides_own_name() {
        let manager = MiddlewareManager::new();
        let seen = Arc::new(std::sync::Mutex::new(None));
        let name = manager.use_middleware(
            Arc::new(SeesResult { seen }),
            UseOptions::named("custom"),
        );
        assert_eq!(name, "custom");
        assert!(manager.remove("custom"));
        assert!(!manager.remove("custom"));
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn fast_path_runs_operation_and_records_result() {
        let manager = MiddlewareManager::new();
        let mut ctx = context();
        let value = manager
            .execute(&mut ctx, Operation::new(|_, _| async { Ok(json!([1, 2])) }))
            .await
            .expect("operation result");
        assert_eq!(value, json!([1, 2]));
        assert_eq!(ctx.result(), Some(&json!([1, 2])));
    }

    #[tokio::test]
    async fn result_is_visible_after_next_only() {
        let manager = MiddlewareManager::new();
        let seen = Arc::new(std::sync::Mutex::new(None));
        manager.use_middleware(
            Arc::new(SeesResult { seen: seen.clone() }),
            UseOptions::default(),
        );

        let mut ctx = context();
        manager
            .execute(&mut ctx, Operation::new(|_, _| async { Ok(json!("done")) }))
            .await
            .expect("operation result");
        assert_eq!(*seen.lock().expect("lock"), Some(json!("done")));
    }

    #[tokio::test]
    async fn operation_receives_args_and_identity() {
        let manager = MiddlewareManager::new();
        manager.use_middleware(Arc::new(Anonymous), UseOptions::default());
        let mut ctx = context();
        ctx.args = json!({"limit": 1});

        let value = manager
            .execute(
                &mut ctx,
                Operation::new(|args, op_ctx| async move {
                    Ok(json!({"args": args, "entity": op_ctx.entity, "source": op_ctx.source}))
                }),
            )
            .await
            .expect("operation result");
        assert_eq!(
            value,
            json!({"args": {"limit": 1}, "entity": "user", "source": "memory"})
        );
    }
}
