//! Universal repository core: one `repo(entity, source)` surface over
//! heterogeneous data sources, with a composable middleware pipeline.

pub mod adapter;
pub mod catalog;
pub mod config;
pub mod error;
pub mod intent;
pub mod logging;
pub mod middleware;
pub mod plugin;
pub mod query;
pub mod repo;
pub mod rest;
pub mod schema;
pub mod urpc;

pub use adapter::{
    dispatch, ops, AdapterFactory, BaseAdapter, DataAdapter, MemoryAdapter, SchemaAdapter,
    GLOBAL_SOURCE, SCHEMA_ENTITY,
};
pub use catalog::EntityCatalog;
pub use config::{CachePolicy, EntityConfig, EntityConfigs, FieldPolicy, PermissionRule};
pub use error::{ErrorCode, UrpcError, UrpcResult};
pub use intent::Intent;
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use middleware::builtin::{
    AuthMiddleware, CacheMiddleware, HooksMiddleware, I18nMiddleware, LoggingMiddleware,
};
pub use middleware::{
    CallScope, Middleware, MiddlewareContext, MiddlewareManager, MiddlewareRequirements, Next,
    Operation, OperationContext, RequestMetadata, UseOptions, User,
};
pub use plugin::{AdapterRegistration, GlobalAdapter, Plugin};
pub use query::{
    ConflictTarget, CreateArgs, CreateManyArgs, DeleteArgs, FindManyArgs, FindOneArgs, OrderBy,
    SortDirection, UpdateArgs, UpdateManyArgs, UpsertArgs, UpsertManyArgs, WhereClause,
};
pub use repo::{RepoRegistry, Repository};
pub use schema::{
    declare_field, generate_schema, generate_schemas, simplify_entity_name, Entity,
    EntityDefinition, FieldKind, FieldMetadata, FieldOptions, RelationTarget, Schema,
};
pub use urpc::{Urpc, UrpcConfig};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
