//! CLI smoke entry point.
//!
//! # Responsibility
//! - Bootstrap a small demo plugin through `urpc_core` and print the
//!   resulting entity maps and one query result as JSON.
//! - Keep stdout deterministic; diagnostics go to stderr.

use log::info;
use serde_json::json;
use std::process::ExitCode;
use std::sync::Arc;
use urpc_core::{
    default_log_level, init_logging, EntityConfig, EntityDefinition, FieldMetadata, FindManyArgs,
    GlobalAdapter, LoggingConfig, LoggingMiddleware, MemoryAdapter, OrderBy, Plugin, UrpcConfig,
    UrpcResult,
};

fn demo_plugin() -> UrpcResult<Plugin> {
    let user = EntityDefinition::builder("UserEntity")
        .describe("Application user")
        .field("id", FieldMetadata::string())
        .field("name", FieldMetadata::string())
        .field("email", FieldMetadata::string().optional())
        .field(
            "posts",
            FieldMetadata::array(urpc_core::RelationTarget::named("PostEntity")).optional(),
        )
        .build()?;
    let post = EntityDefinition::builder("PostEntity")
        .field("id", FieldMetadata::string())
        .field("title", FieldMetadata::string())
        .field("published", FieldMetadata::boolean())
        .build()?;
    Ok(Plugin::new("demo").with_entity(user).with_entity(post))
}

async fn run() -> UrpcResult<()> {
    init_logging(&LoggingConfig::stderr(default_log_level()))?;

    let config = UrpcConfig::new()
        .plugin(demo_plugin()?)
        .global_adapter(GlobalAdapter::new("memory", MemoryAdapter::factory()))
        .middleware(Arc::new(LoggingMiddleware::new()))
        .entity_config(
            "user",
            EntityConfig::default().with_init_data(vec![
                json!({"id": "2", "name": "Bo"}),
                json!({"id": "1", "name": "Ann", "email": "ann@example.com"}),
            ]),
        );
    let urpc = urpc_core::urpc::init(config).await?;

    let users = urpc
        .repo("user", None)?
        .find_many(FindManyArgs::new().order_by(OrderBy::asc("id")))
        .await?;
    info!(
        "event=cli_report module=cli status=ok entities={} users={}",
        urpc.entity_sources().len(),
        users.len()
    );

    let report = json!({
        "version": urpc_core::core_version(),
        "sources": urpc.entity_sources(),
        "schemas": urpc
            .entity_schemas()
            .iter()
            .map(|(name, schema)| (name.clone(), schema.to_value()))
            .collect::<serde_json::Map<_, _>>(),
        "users": users,
    });
    println!("{report:#}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("urpc_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}
