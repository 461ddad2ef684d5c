//! Per-call context records.

use crate::config::EntityConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Request metadata key carrying the caller locale.
pub const LOCALE_KEY: &str = "locale";

/// Authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            attributes: Map::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|held| held == role)
    }
}

/// Caller-supplied request scope attached to repository calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallScope {
    pub user: Option<User>,
    pub extra: Map<String, Value>,
}

impl CallScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_locale(self, locale: impl Into<String>) -> Self {
        self.with_extra(LOCALE_KEY, Value::String(locale.into()))
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Identity of the call target plus request-scoped values.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMetadata {
    /// Simplified entity name.
    pub entity: String,
    pub source: String,
    pub request_id: Uuid,
    pub extra: Map<String, Value>,
}

impl RequestMetadata {
    pub fn new(entity: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            source: source.into(),
            request_id: Uuid::new_v4(),
            extra: Map::new(),
        }
    }

    pub fn locale(&self) -> Option<&str> {
        self.extra.get(LOCALE_KEY).and_then(Value::as_str)
    }
}

/// Context handed to adapters, separate from query arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationContext {
    pub user: Option<User>,
    pub entity: String,
    pub source: String,
    pub request_id: Uuid,
    pub extra: Map<String, Value>,
}

impl OperationContext {
    /// Context for calls made outside a repository, e.g. seeding.
    pub fn system(entity: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            user: None,
            entity: entity.into(),
            source: source.into(),
            request_id: Uuid::new_v4(),
            extra: Map::new(),
        }
    }
}

/// Mutable record threaded through one middleware chain.
///
/// `result` stays `None` until the wrapped operation resolves, so only code
/// running after `next` observes it.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    pub operation: String,
    pub args: Value,
    pub metadata: RequestMetadata,
    pub user: Option<User>,
    result: Option<Value>,
    entity_config: Option<Arc<EntityConfig>>,
}

impl MiddlewareContext {
    pub fn new(operation: impl Into<String>, args: Value, metadata: RequestMetadata) -> Self {
        Self {
            operation: operation.into(),
            args,
            metadata,
            user: None,
            result: None,
            entity_config: None,
        }
    }

    pub fn with_user(mut self, user: Option<User>) -> Self {
        self.user = user;
        self
    }

    pub fn entity(&self) -> &str {
        &self.metadata.entity
    }

    pub fn source(&self) -> &str {
        &self.metadata.source
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Policy of the target entity, attached by the middleware manager.
    pub fn entity_config(&self) -> Option<&EntityConfig> {
        self.entity_config.as_deref()
    }

    pub(crate) fn set_result(&mut self, value: Value) {
        self.result = Some(value);
    }

    pub(crate) fn set_entity_config(&mut self, config: Option<Arc<EntityConfig>>) {
        self.entity_config = config;
    }

    /// Snapshot passed to the adapter at the end of the chain.
    pub fn operation_context(&self) -> OperationContext {
        OperationContext {
            user: self.user.clone(),
            entity: self.metadata.entity.clone(),
            source: self.metadata.source.clone(),
            request_id: self.metadata.request_id,
            extra: self.metadata.extra.clone(),
        }
    }
}
