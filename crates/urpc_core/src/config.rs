//! Declarative per-entity policy.
//!
//! # Responsibility
//! - Describe default source, cache, permission, i18n, seed and middleware
//!   exclusion policy for each entity.
//! - Load that policy from JSON or build it in code.
//!
//! # Invariants
//! - Configs are keyed by simplified entity name, so `UserEntity` and `user`
//!   address the same policy.
//! - Configs are set once at bootstrap and only read afterwards.

use crate::error::UrpcResult;
use crate::schema::simplify_entity_name;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Wildcard key matching every operation in `cache` and `permissions`.
pub const ANY_OPERATION: &str = "*";

/// Read-result caching policy for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePolicy {
    pub ttl_ms: u64,
}

/// Access rule for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRule {
    #[serde(default = "default_require_auth")]
    pub require_auth: bool,
    /// Caller needs at least one of these roles; empty means any caller.
    #[serde(default)]
    pub roles: Vec<String>,
}

fn default_require_auth() -> bool {
    true
}

impl PermissionRule {
    pub fn public() -> Self {
        Self {
            require_auth: false,
            roles: Vec::new(),
        }
    }

    pub fn authenticated() -> Self {
        Self {
            require_auth: true,
            roles: Vec::new(),
        }
    }

    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            require_auth: true,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per-field policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPolicy {
    #[serde(default)]
    pub i18n: bool,
}

/// Policy for one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    #[serde(default)]
    pub default_source: Option<String>,
    #[serde(default)]
    pub cache: BTreeMap<String, CachePolicy>,
    #[serde(default)]
    pub permissions: BTreeMap<String, PermissionRule>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldPolicy>,
    #[serde(default)]
    pub init_data: Vec<Value>,
    /// Middleware names skipped for this entity.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl EntityConfig {
    pub fn with_default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = Some(source.into());
        self
    }

    pub fn with_cache(mut self, operation: impl Into<String>, ttl_ms: u64) -> Self {
        self.cache.insert(operation.into(), CachePolicy { ttl_ms });
        self
    }

    pub fn with_permission(mut self, operation: impl Into<String>, rule: PermissionRule) -> Self {
        self.permissions.insert(operation.into(), rule);
        self
    }

    pub fn with_i18n_field(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), FieldPolicy { i18n: true });
        self
    }

    pub fn with_init_data(mut self, rows: Vec<Value>) -> Self {
        self.init_data = rows;
        self
    }

    pub fn excluding(mut self, middleware: impl Into<String>) -> Self {
        self.exclude.push(middleware.into());
        self
    }

    pub fn cache_policy(&self, operation: &str) -> Option<&CachePolicy> {
        self.cache
            .get(operation)
            .or_else(|| self.cache.get(ANY_OPERATION))
    }

    /// Rule for `operation`, falling back to the `*` rule.
    pub fn permission(&self, operation: &str) -> Option<&PermissionRule> {
        self.permissions
            .get(operation)
            .or_else(|| self.permissions.get(ANY_OPERATION))
    }

    pub fn i18n_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, policy)| policy.i18n)
            .map(|(name, _)| name.as_str())
    }

    pub fn excludes(&self, middleware: &str) -> bool {
        self.exclude.iter().any(|name| name == middleware)
    }
}

/// Process-wide policy map keyed by simplified entity name.
#[derive(Debug, Clone, Default)]
pub struct EntityConfigs {
    entries: BTreeMap<String, Arc<EntityConfig>>,
}

impl EntityConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `{ "<entity>": EntityConfig, ... }`.
    pub fn from_json_str(text: &str) -> UrpcResult<Self> {
        let raw: BTreeMap<String, EntityConfig> = serde_json::from_str(text)?;
        Ok(raw.into_iter().collect())
    }

    pub fn insert(&mut self, entity: &str, config: EntityConfig) {
        self.entries
            .insert(simplify_entity_name(entity), Arc::new(config));
    }

    pub fn with(mut self, entity: &str, config: EntityConfig) -> Self {
        self.insert(entity, config);
        self
    }

    pub fn get(&self, entity: &str) -> Option<Arc<EntityConfig>> {
        self.entries.get(&simplify_entity_name(entity)).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<EntityConfig>)> {
        self.entries.iter().map(|(name, config)| (name.as_str(), config))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, EntityConfig)> for EntityConfigs {
    fn from_iter<T: IntoIterator<Item = (String, EntityConfig)>>(iter: T) -> Self {
        let mut configs = Self::new();
        for (entity, config) in iter {
            configs.insert(&entity, config);
        }
        configs
    }
}
