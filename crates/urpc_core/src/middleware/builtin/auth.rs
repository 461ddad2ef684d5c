//! Permission enforcement from entity policy.

use crate::config::PermissionRule;
use crate::error::{UrpcError, UrpcResult};
use crate::middleware::context::{MiddlewareContext, User};
use crate::middleware::manager::{Middleware, Next};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;

/// Checks the caller against `EntityConfig::permission` for the operation;
/// entities or operations without a rule are open.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthMiddleware;

impl AuthMiddleware {
    pub const NAME: &'static str = "auth";
}

fn authorize(rule: &PermissionRule, user: Option<&User>, target: &str) -> UrpcResult<()> {
    let needs_user = rule.require_auth || !rule.roles.is_empty();
    let Some(user) = user else {
        if needs_user {
            return Err(UrpcError::unauthorized(format!(
                "authentication required for {target}"
            )));
        }
        return Ok(());
    };
    if !rule.roles.is_empty() && !rule.roles.iter().any(|role| user.has_role(role)) {
        return Err(UrpcError::forbidden(format!(
            "user `{}` lacks a required role for {target}: [{}]",
            user.id,
            rule.roles.join(", ")
        )));
    }
    Ok(())
}

#[async_trait]
impl Middleware for AuthMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> UrpcResult<Value> {
        let rule = ctx
            .entity_config()
            .and_then(|config| config.permission(&ctx.operation))
            .cloned();
        if let Some(rule) = rule {
            let target = format!("{}.{}", ctx.entity(), ctx.operation);
            if let Err(err) = authorize(&rule, ctx.user.as_ref(), &target) {
                debug!(
                    "event=auth_check module=middleware status=error target={} code={}",
                    target,
                    err.code()
                );
                return Err(err);
            }
        }
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::authorize;
    use crate::config::PermissionRule;
    use crate::error::ErrorCode;
    use crate::middleware::context::User;

    #[test]
    fn public_rule_allows_anonymous() {
        assert!(authorize(&PermissionRule::public(), None, "post.findMany").is_ok());
    }

    #[test]
    fn missing_user_is_unauthorized() {
        let err = authorize(&PermissionRule::authenticated(), None, "post.create")
            .expect_err("anonymous");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[test]
    fn role_mismatch_is_forbidden() {
        let rule = PermissionRule::roles(["admin", "editor"]);
        let reader = User::new("u1").with_role("reader");
        let err = authorize(&rule, Some(&reader), "post.delete").expect_err("no role");
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let editor = User::new("u2").with_role("editor");
        assert!(authorize(&rule, Some(&editor), "post.delete").is_ok());
    }
}
