//! Per-(entity, source) repository facade.
//!
//! # Responsibility
//! - Bind one adapter to one `(entity, source)` identity.
//! - Turn every call into a middleware context and delegate to the manager.
//!
//! # Invariants
//! - The adapter bound at construction never changes.
//! - Arguments reach middleware untouched; errors reach callers unwrapped.

use crate::adapter::{dispatch, ops, DataAdapter};
use crate::error::{UrpcError, UrpcResult};
use crate::middleware::{
    CallScope, MiddlewareContext, MiddlewareManager, Operation, RequestMetadata, User,
};
use crate::query::{
    encode_args, CreateArgs, CreateManyArgs, DeleteArgs, FindManyArgs, FindOneArgs, UpdateArgs,
    UpdateManyArgs, UpsertArgs, UpsertManyArgs,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

struct RepositoryInner {
    entity: String,
    source: String,
    adapter: Arc<dyn DataAdapter>,
    middleware: Arc<MiddlewareManager>,
}

/// Cheap-to-clone handle; clones share the adapter and middleware manager.
#[derive(Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
    scope: CallScope,
}

impl Debug for Repository {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &self.inner.entity)
            .field("source", &self.inner.source)
            .field("scope", &self.scope)
            .finish()
    }
}

fn decode_result<T: DeserializeOwned>(operation: &str, value: Value) -> UrpcResult<T> {
    serde_json::from_value(value).map_err(|err| {
        UrpcError::internal(format!("unexpected `{operation}` result shape: {err}"))
    })
}

impl Repository {
    /// `entity` is expected in simplified form.
    pub fn new(
        entity: impl Into<String>,
        source: impl Into<String>,
        adapter: Arc<dyn DataAdapter>,
        middleware: Arc<MiddlewareManager>,
    ) -> Self {
        Self {
            inner: Arc::new(RepositoryInner {
                entity: entity.into(),
                source: source.into(),
                adapter,
                middleware,
            }),
            scope: CallScope::default(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.inner.entity
    }

    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn adapter(&self) -> &Arc<dyn DataAdapter> {
        &self.inner.adapter
    }

    pub fn scope(&self) -> &CallScope {
        &self.scope
    }

    /// Same repository acting for `user`.
    pub fn with_user(&self, user: User) -> Self {
        self.with_scope(self.scope.clone().with_user(user))
    }

    /// Same repository carrying `scope` into every call.
    pub fn with_scope(&self, scope: CallScope) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            scope,
        }
    }

    /// Runs any named operation through the middleware chain.
    ///
    /// # Contract
    /// - Builds a fresh context per call with a new request id.
    /// - Fixed operation names decode `args` into their typed records at the
    ///   adapter boundary; other names reach [`DataAdapter::call`].
    pub async fn invoke(&self, operation: &str, args: Value) -> UrpcResult<Value> {
        let mut metadata = RequestMetadata::new(self.entity(), self.source());
        metadata.extra = self.scope.extra.clone();
        let mut ctx =
            MiddlewareContext::new(operation, args, metadata).with_user(self.scope.user.clone());

        let adapter = Arc::clone(&self.inner.adapter);
        let name = operation.to_string();
        let operation = Operation::new(move |args, op_ctx| async move {
            dispatch(adapter.as_ref(), &name, args, &op_ctx).await
        });
        self.inner.middleware.execute(&mut ctx, operation).await
    }

    pub async fn find_many(&self, args: FindManyArgs) -> UrpcResult<Vec<Value>> {
        let value = self.invoke(ops::FIND_MANY, encode_args(&args)?).await?;
        decode_result(ops::FIND_MANY, value)
    }

    /// Typed variant of [`Repository::find_many`].
    pub async fn find_many_as<T: DeserializeOwned>(&self, args: FindManyArgs) -> UrpcResult<Vec<T>> {
        let value = self.invoke(ops::FIND_MANY, encode_args(&args)?).await?;
        decode_result(ops::FIND_MANY, value)
    }

    pub async fn find_one(&self, args: FindOneArgs) -> UrpcResult<Option<Value>> {
        let value = self.invoke(ops::FIND_ONE, encode_args(&args)?).await?;
        Ok((!value.is_null()).then_some(value))
    }

    pub async fn find_one_as<T: DeserializeOwned>(&self, args: FindOneArgs) -> UrpcResult<Option<T>> {
        let value = self.invoke(ops::FIND_ONE, encode_args(&args)?).await?;
        decode_result(ops::FIND_ONE, value)
    }

    pub async fn create(&self, args: CreateArgs) -> UrpcResult<Value> {
        self.invoke(ops::CREATE, encode_args(&args)?).await
    }

    pub async fn create_many(&self, args: CreateManyArgs) -> UrpcResult<Vec<Value>> {
        let value = self.invoke(ops::CREATE_MANY, encode_args(&args)?).await?;
        decode_result(ops::CREATE_MANY, value)
    }

    pub async fn update(&self, args: UpdateArgs) -> UrpcResult<Value> {
        self.invoke(ops::UPDATE, encode_args(&args)?).await
    }

    pub async fn update_many(&self, args: UpdateManyArgs) -> UrpcResult<Vec<Value>> {
        let value = self.invoke(ops::UPDATE_MANY, encode_args(&args)?).await?;
        decode_result(ops::UPDATE_MANY, value)
    }

    pub async fn upsert(&self, args: UpsertArgs) -> UrpcResult<Value> {
        self.invoke(ops::UPSERT, encode_args(&args)?).await
    }

    pub async fn upsert_many(&self, args: UpsertManyArgs) -> UrpcResult<Vec<Value>> {
        let value = self.invoke(ops::UPSERT_MANY, encode_args(&args)?).await?;
        decode_result(ops::UPSERT_MANY, value)
    }

    pub async fn delete(&self, args: DeleteArgs) -> UrpcResult<bool> {
        let value = self.invoke(ops::DELETE, encode_args(&args)?).await?;
        decode_result(ops::DELETE, value)
    }

    /// Action-style call routed to [`DataAdapter::call`] as `call`.
    pub async fn call(&self, args: Value) -> UrpcResult<Value> {
        self.invoke(ops::CALL, args).await
    }
}
