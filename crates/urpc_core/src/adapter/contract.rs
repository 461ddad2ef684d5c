//! Operation surface every data source implements.

use crate::error::{UrpcError, UrpcResult};
use crate::middleware::context::OperationContext;
use crate::query::{
    decode_args, CreateArgs, CreateManyArgs, DeleteArgs, FindManyArgs, FindOneArgs, UpdateArgs,
    UpdateManyArgs, UpsertArgs, UpsertManyArgs,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Operation identifiers carried in `MiddlewareContext::operation`.
pub mod ops {
    pub const FIND_MANY: &str = "findMany";
    pub const FIND_ONE: &str = "findOne";
    pub const CREATE: &str = "create";
    pub const CREATE_MANY: &str = "createMany";
    pub const UPDATE: &str = "update";
    pub const UPDATE_MANY: &str = "updateMany";
    pub const UPSERT: &str = "upsert";
    pub const UPSERT_MANY: &str = "upsertMany";
    pub const DELETE: &str = "delete";
    pub const CALL: &str = "call";

    /// Operations that only read.
    pub fn is_read(operation: &str) -> bool {
        matches!(operation, FIND_MANY | FIND_ONE)
    }
}

/// Data source contract.
///
/// Every method defaults to a `NOT_FOUND` "method not implemented" failure,
/// so partial adapters override only what they support.
#[async_trait]
pub trait DataAdapter: Send + Sync {
    async fn find_many(
        &self,
        _args: FindManyArgs,
        _ctx: &OperationContext,
    ) -> UrpcResult<Vec<Value>> {
        Err(UrpcError::not_implemented(ops::FIND_MANY))
    }

    async fn find_one(&self, _args: FindOneArgs, _ctx: &OperationContext) -> UrpcResult<Option<Value>> {
        Err(UrpcError::not_implemented(ops::FIND_ONE))
    }

    async fn create(&self, _args: CreateArgs, _ctx: &OperationContext) -> UrpcResult<Value> {
        Err(UrpcError::not_implemented(ops::CREATE))
    }

    async fn create_many(
        &self,
        _args: CreateManyArgs,
        _ctx: &OperationContext,
    ) -> UrpcResult<Vec<Value>> {
        Err(UrpcError::not_implemented(ops::CREATE_MANY))
    }

    async fn update(&self, _args: UpdateArgs, _ctx: &OperationContext) -> UrpcResult<Value> {
        Err(UrpcError::not_implemented(ops::UPDATE))
    }

    async fn update_many(
        &self,
        _args: UpdateManyArgs,
        _ctx: &OperationContext,
    ) -> UrpcResult<Vec<Value>> {
        Err(UrpcError::not_implemented(ops::UPDATE_MANY))
    }

    async fn upsert(&self, _args: UpsertArgs, _ctx: &OperationContext) -> UrpcResult<Value> {
        Err(UrpcError::not_implemented(ops::UPSERT))
    }

    async fn upsert_many(
        &self,
        _args: UpsertManyArgs,
        _ctx: &OperationContext,
    ) -> UrpcResult<Vec<Value>> {
        Err(UrpcError::not_implemented(ops::UPSERT_MANY))
    }

    async fn delete(&self, _args: DeleteArgs, _ctx: &OperationContext) -> UrpcResult<bool> {
        Err(UrpcError::not_implemented(ops::DELETE))
    }

    /// Adapter-specific verbs outside the fixed set, including `call`.
    async fn call(&self, operation: &str, _args: Value, _ctx: &OperationContext) -> UrpcResult<Value> {
        Err(UrpcError::not_implemented(operation))
    }
}

/// Adapter with every operation unimplemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseAdapter;

#[async_trait]
impl DataAdapter for BaseAdapter {}

/// Builds one adapter for an `(entity, source)` pair.
pub type AdapterFactory = Arc<dyn Fn(&str, &str) -> Arc<dyn DataAdapter> + Send + Sync>;

/// Routes a named operation with JSON arguments to the matching adapter method.
///
/// Names outside the fixed set go to [`DataAdapter::call`].
pub async fn dispatch(
    adapter: &dyn DataAdapter,
    operation: &str,
    args: Value,
    ctx: &OperationContext,
) -> UrpcResult<Value> {
    match operation {
        ops::FIND_MANY => adapter
            .find_many(decode_args(operation, args)?, ctx)
            .await
            .map(Value::Array),
        ops::FIND_ONE => adapter
            .find_one(decode_args(operation, args)?, ctx)
            .await
            .map(|row| row.unwrap_or(Value::Null)),
        ops::CREATE => adapter.create(decode_args(operation, args)?, ctx).await,
        ops::CREATE_MANY => adapter
            .create_many(decode_args(operation, args)?, ctx)
            .await
            .map(Value::Array),
        ops::UPDATE => adapter.update(decode_args(operation, args)?, ctx).await,
        ops::UPDATE_MANY => adapter
            .update_many(decode_args(operation, args)?, ctx)
            .await
            .map(Value::Array),
        ops::UPSERT => adapter.upsert(decode_args(operation, args)?, ctx).await,
        ops::UPSERT_MANY => adapter
            .upsert_many(decode_args(operation, args)?, ctx)
            .await
            .map(Value::Array),
        ops::DELETE => adapter
            .delete(decode_args(operation, args)?, ctx)
            .await
            .map(Value::Bool),
        _ => adapter.call(operation, args, ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::{dispatch, ops, BaseAdapter, DataAdapter};
    use crate::error::ErrorCode;
    use crate::middleware::context::OperationContext;
    use crate::query::FindManyArgs;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Echo;

    #[async_trait]
    impl DataAdapter for Echo {
        async fn call(
            &self,
            operation: &str,
            args: Value,
            _ctx: &OperationContext,
        ) -> crate::error::UrpcResult<Value> {
            Ok(json!({"operation": operation, "args": args}))
        }
    }

    #[tokio::test]
    async fn base_adapter_rejects_every_operation_with_not_found() {
        let ctx = OperationContext::system("user", "base");
        let err = BaseAdapter
            .find_many(FindManyArgs::default(), &ctx)
            .await
            .expect_err("unimplemented");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(err.is_not_implemented());

        for operation in [ops::FIND_ONE, ops::CREATE, ops::UPSERT_MANY, ops::DELETE, "archive"] {
            let args = match operation {
                ops::FIND_ONE | ops::DELETE => json!({"where": {}}),
                ops::CREATE => json!({"data": {}}),
                ops::UPSERT_MANY => json!({"data": []}),
                _ => json!({}),
            };
            let err = dispatch(&BaseAdapter, operation, args, &ctx)
                .await
                .expect_err("unimplemented");
            assert_eq!(err.code(), ErrorCode::NotFound, "operation {operation}");
            assert!(err.message().contains(operation));
        }
    }

    #[tokio::test]
    async fn unknown_operations_route_to_call() {
        let ctx = OperationContext::system("user", "echo");
        let value = dispatch(&Echo, "archive", json!({"id": 1}), &ctx)
            .await
            .expect("custom verb");
        assert_eq!(value, json!({"operation": "archive", "args": {"id": 1}}));
    }

    #[tokio::test]
    async fn malformed_arguments_fail_before_the_adapter() {
        let ctx = OperationContext::system("user", "echo");
        let err = dispatch(&Echo, ops::UPDATE, json!({"data": {}}), &ctx)
            .await
            .expect_err("missing where");
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }
}
