//! TTL-bounded LRU cache for read operations.
//!
//! # Invariants
//! - Only `findMany`/`findOne` results are cached, and only when the entity
//!   policy sets a TTL for that operation.
//! - Results are cached per caller: the key carries the user id and roles
//!   and the request extras (locale included), so a hit never crosses users
//!   or locales.
//! - A successful write on an entity+source drops every cached read for it
//!   and bumps that scope's generation; a read that started under an older
//!   generation is not stored.
//! - The cache lock is never held across an await point.

use crate::adapter::ops;
use crate::error::UrpcResult;
use crate::middleware::context::MiddlewareContext;
use crate::middleware::manager::{Middleware, Next};
use async_trait::async_trait;
use log::debug;
use lru::LruCache;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

const DEFAULT_CAPACITY: usize = 256;

struct CacheEntry {
    scope: String,
    value: Value,
    expires_at: Instant,
}

struct CacheState {
    entries: LruCache<String, CacheEntry>,
    generations: HashMap<String, u64>,
}

impl CacheState {
    fn generation(&self, scope: &str) -> u64 {
        self.generations.get(scope).copied().unwrap_or(0)
    }
}

pub struct CacheMiddleware {
    state: Mutex<CacheState>,
}

impl CacheMiddleware {
    pub const NAME: &'static str = "cache";

    pub fn new() -> Self {
        Self::with_capacity(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                generations: HashMap::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self, scope: &str) -> u64 {
        self.lock().generation(scope)
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let mut state = self.lock();
        let expired = match state.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            state.entries.pop(key);
        }
        None
    }

    fn store(&self, key: String, scope: String, value: Value, ttl: Duration, generation: u64) {
        let mut state = self.lock();
        if state.generation(&scope) != generation {
            debug!(
                "event=cache_store module=middleware status=skipped key={} reason=stale",
                key
            );
            return;
        }
        state.entries.put(
            key,
            CacheEntry {
                scope,
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn invalidate(&self, scope: &str) {
        let mut state = self.lock();
        *state.generations.entry(scope.to_string()).or_insert(0) += 1;
        let stale: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.scope == scope)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            state.entries.pop(key);
        }
        if !stale.is_empty() {
            debug!(
                "event=cache_invalidate module=middleware status=ok scope={} dropped={}",
                scope,
                stale.len()
            );
        }
    }
}

impl Default for CacheMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller part of a cache key: user id with sorted roles, then sorted extras.
fn caller_key(ctx: &MiddlewareContext) -> String {
    let user = match &ctx.user {
        Some(user) => {
            let mut roles: Vec<&str> = user.roles.iter().map(String::as_str).collect();
            roles.sort_unstable();
            format!("user={}[{}]", user.id, roles.join(","))
        }
        None => "anonymous".to_string(),
    };
    let mut extras: Vec<String> = ctx
        .metadata
        .extra
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    extras.sort_unstable();
    format!("{user}:{{{}}}", extras.join(","))
}

#[async_trait]
impl Middleware for CacheMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> UrpcResult<Value> {
        let scope = format!("{}:{}", ctx.entity(), ctx.source());

        if !ops::is_read(&ctx.operation) {
            let value = next.run(ctx).await?;
            self.invalidate(&scope);
            return Ok(value);
        }

        let ttl_ms = ctx
            .entity_config()
            .and_then(|config| config.cache_policy(&ctx.operation))
            .map(|policy| policy.ttl_ms)
            .filter(|ttl_ms| *ttl_ms > 0);
        let Some(ttl_ms) = ttl_ms else {
            return next.run(ctx).await;
        };

        let key = format!("{scope}:{}:{}:{}", ctx.operation, ctx.args, caller_key(ctx));
        if let Some(value) = self.lookup(&key) {
            debug!("event=cache_hit module=middleware status=ok key={}", key);
            return Ok(value);
        }

        let generation = self.generation(&scope);
        let value = next.run(ctx).await?;
        self.store(
            key,
            scope,
            value.clone(),
            Duration::from_millis(ttl_ms),
            generation,
        );
        Ok(value)
    }
}
