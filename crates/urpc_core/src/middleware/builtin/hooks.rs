//! Before/after hooks keyed by entity and operation.

use crate::config::ANY_OPERATION;
use crate::error::UrpcResult;
use crate::middleware::context::MiddlewareContext;
use crate::middleware::manager::{Middleware, Next};
use crate::schema::simplify_entity_name;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// May rewrite `ctx.args` or abort the call with an error.
pub type BeforeHook = Arc<dyn Fn(&mut MiddlewareContext) -> UrpcResult<()> + Send + Sync>;
/// Receives the resolved value and returns the value handed back to callers.
pub type AfterHook = Arc<dyn Fn(&MiddlewareContext, Value) -> UrpcResult<Value> + Send + Sync>;

const ANY_ENTITY: &str = "*";

#[derive(Debug, Clone)]
struct HookKey {
    entity: String,
    operation: String,
}

impl HookKey {
    fn new(entity: &str, operation: &str) -> Self {
        let entity = if entity.trim() == ANY_ENTITY {
            ANY_ENTITY.to_string()
        } else {
            simplify_entity_name(entity)
        };
        Self {
            entity,
            operation: operation.trim().to_string(),
        }
    }

    fn matches(&self, entity: &str, operation: &str) -> bool {
        (self.entity == ANY_ENTITY || self.entity == entity)
            && (self.operation == ANY_OPERATION || self.operation == operation)
    }
}

/// Hooks run in registration order; `"*"` matches any entity or operation.
#[derive(Default)]
pub struct HooksMiddleware {
    before: Vec<(HookKey, BeforeHook)>,
    after: Vec<(HookKey, AfterHook)>,
}

impl HooksMiddleware {
    pub const NAME: &'static str = "hooks";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn before<F>(mut self, entity: &str, operation: &str, hook: F) -> Self
    where
        F: Fn(&mut MiddlewareContext) -> UrpcResult<()> + Send + Sync + 'static,
    {
        self.before.push((HookKey::new(entity, operation), Arc::new(hook)));
        self
    }

    pub fn after<F>(mut self, entity: &str, operation: &str, hook: F) -> Self
    where
        F: Fn(&MiddlewareContext, Value) -> UrpcResult<Value> + Send + Sync + 'static,
    {
        self.after.push((HookKey::new(entity, operation), Arc::new(hook)));
        self
    }
}

#[async_trait]
impl Middleware for HooksMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> UrpcResult<Value> {
        for (key, hook) in &self.before {
            if key.matches(ctx.entity(), &ctx.operation) {
                hook(&mut *ctx)?;
            }
        }

        let mut value = next.run(ctx).await?;

        for (key, hook) in &self.after {
            if key.matches(ctx.entity(), &ctx.operation) {
                value = hook(ctx, value)?;
            }
        }
        Ok(value)
    }
}
