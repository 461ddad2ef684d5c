//! Bootstrap and process-wide facade.
//!
//! # Responsibility
//! - Wire plugins, global adapters, middleware and entity policy into one
//!   runtime context.
//! - Expose repository lookup and the entity schema/source maps.
//!
//! # Invariants
//! - A missing entity required by a middleware fails bootstrap.
//! - Seed failures are logged and never fail bootstrap.
//! - The process-wide instance is set once; later `init` calls return it
//!   unchanged.

use crate::adapter::introspection::{schema_entity, SchemaAdapter, GLOBAL_SOURCE, SCHEMA_ENTITY};
use crate::adapter::DataAdapter;
use crate::catalog::EntityCatalog;
use crate::config::{EntityConfig, EntityConfigs};
use crate::error::{UrpcError, UrpcResult};
use crate::intent::Intent;
use crate::middleware::{CallScope, Middleware, MiddlewareManager, OperationContext, UseOptions};
use crate::plugin::{AdapterRegistration, GlobalAdapter, Plugin};
use crate::query::{CreateArgs, CreateManyArgs};
use crate::repo::{registry_key, RepoRegistry, Repository};
use crate::schema::{generate_schemas, simplify_entity_name, Schema};
use futures::future::join_all;
use log::{debug, error, info, warn};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Single bootstrap input.
#[derive(Default)]
pub struct UrpcConfig {
    pub plugins: Vec<Plugin>,
    pub middlewares: Vec<(Arc<dyn Middleware>, UseOptions)>,
    pub entity_configs: EntityConfigs,
    pub global_adapters: Vec<GlobalAdapter>,
}

impl UrpcConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push((middleware, UseOptions::default()));
        self
    }

    pub fn middleware_with(mut self, middleware: Arc<dyn Middleware>, options: UseOptions) -> Self {
        self.middlewares.push((middleware, options));
        self
    }

    pub fn entity_config(mut self, entity: &str, config: EntityConfig) -> Self {
        self.entity_configs.insert(entity, config);
        self
    }

    pub fn entity_configs(mut self, configs: EntityConfigs) -> Self {
        self.entity_configs = configs;
        self
    }

    pub fn global_adapter(mut self, global: GlobalAdapter) -> Self {
        self.global_adapters.push(global);
        self
    }
}

/// Bootstrapped runtime context.
pub struct Urpc {
    registry: RepoRegistry,
    entity_configs: EntityConfigs,
    catalog: Arc<EntityCatalog>,
}

impl Urpc {
    /// Builds a runtime from `config`.
    ///
    /// # Contract
    /// - Explicit registrations win over global adapters for the same key;
    ///   among explicit registrations the last one wins.
    /// - The built-in `_schema` entity is always registered on `_global`.
    /// - Seeding calls adapters directly, outside the middleware chain.
    pub async fn bootstrap(config: UrpcConfig) -> UrpcResult<Self> {
        let UrpcConfig {
            plugins,
            middlewares,
            entity_configs,
            global_adapters,
        } = config;

        let middleware = Arc::new(MiddlewareManager::new());
        middleware.set_entity_configs(entity_configs.clone());
        let registry = RepoRegistry::new(Arc::clone(&middleware));

        let mut definitions = Vec::new();
        let mut registrations: Vec<AdapterRegistration> = Vec::new();
        for plugin in plugins {
            debug!(
                "event=plugin_load module=urpc status=ok plugin={} entities={} adapters={}",
                plugin.name,
                plugin.entities.len(),
                plugin.adapters.len()
            );
            definitions.extend(plugin.entities);
            registrations.extend(plugin.adapters);
        }

        let mut declared: Vec<String> = Vec::new();
        for definition in &definitions {
            let name = definition.simplified_name();
            if !declared.contains(&name) {
                declared.push(name);
            }
        }
        definitions.push(schema_entity()?);

        for global in &global_adapters {
            for entity in &declared {
                let key = registry_key(entity, &global.source);
                let explicit = registrations.iter().any(|registration| {
                    registry_key(&registration.entity, &registration.source) == key
                });
                if explicit {
                    debug!(
                        "event=global_adapter module=urpc status=skipped key={} reason=explicit",
                        key
                    );
                    continue;
                }
                let adapter: Arc<dyn DataAdapter> =
                    (global.factory)(entity.as_str(), global.source.as_str());
                registrations.push(AdapterRegistration::new(
                    entity.clone(),
                    global.source.clone(),
                    adapter,
                ));
            }
        }

        let sources = EntityCatalog::group_sources(
            registrations
                .iter()
                .map(|registration| (registration.entity.as_str(), registration.source.as_str()))
                .chain([(SCHEMA_ENTITY, GLOBAL_SOURCE)]),
        );
        let catalog = Arc::new(EntityCatalog::new(generate_schemas(&definitions), sources));
        registrations.push(AdapterRegistration::new(
            SCHEMA_ENTITY,
            GLOBAL_SOURCE,
            Arc::new(SchemaAdapter::new(Arc::clone(&catalog))),
        ));

        for registration in registrations {
            registry.register_adapter(
                &registration.entity,
                &registration.source,
                registration.adapter,
            )?;
        }

        let registered: BTreeSet<&str> = catalog.sources().keys().map(String::as_str).collect();
        for (entry, options) in middlewares {
            let required = options
                .required
                .clone()
                .unwrap_or_else(|| entry.requirements());
            for entity in &required.entities {
                let simplified = simplify_entity_name(entity);
                if !registered.contains(simplified.as_str()) {
                    let label = options.name.as_deref().unwrap_or_else(|| entry.name());
                    error!(
                        "event=urpc_bootstrap module=urpc status=error middleware={} missing_entity={}",
                        label, simplified
                    );
                    return Err(UrpcError::bad_request(format!(
                        "middleware `{label}` requires entity `{simplified}`, which has no registered adapter"
                    )));
                }
            }
            middleware.use_middleware(entry, options);
        }

        let urpc = Self {
            registry,
            entity_configs,
            catalog,
        };
        urpc.seed().await;

        info!(
            "event=urpc_bootstrap module=urpc status=ok entities={} repos={} middleware={}",
            urpc.catalog.entity_names().len(),
            urpc.registry.len(),
            middleware.len()
        );
        Ok(urpc)
    }

    pub fn registry(&self) -> &RepoRegistry {
        &self.registry
    }

    pub fn middleware(&self) -> &Arc<MiddlewareManager> {
        self.registry.middleware()
    }

    pub fn entity_config(&self, entity: &str) -> Option<Arc<EntityConfig>> {
        self.entity_configs.get(entity)
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    /// Simplified entity name to schema.
    pub fn entity_schemas(&self) -> &BTreeMap<String, Schema> {
        self.catalog.schemas()
    }

    /// Simplified entity name to registered sources.
    pub fn entity_sources(&self) -> &BTreeMap<String, Vec<String>> {
        self.catalog.sources()
    }

    /// Resolves a repository.
    ///
    /// Without `source`, the entity's configured default source is used, else
    /// its only registered source.
    pub fn repo(&self, entity: &str, source: Option<&str>) -> UrpcResult<Repository> {
        let source = match source {
            Some(source) => source.to_string(),
            None => self.resolve_source(entity)?,
        };
        self.registry.get_repo(entity, &source).ok_or_else(|| {
            UrpcError::not_found(format!(
                "no repository registered for `{}`",
                registry_key(entity, &source)
            ))
        })
    }

    /// Lookup without default-source resolution.
    pub fn get_repo(&self, entity: &str, source: &str) -> Option<Repository> {
        self.registry.get_repo(entity, source)
    }

    pub async fn dispatch(&self, intent: Intent) -> UrpcResult<Value> {
        self.dispatch_scoped(intent, CallScope::default()).await
    }

    /// Runs a structured intent through the target repository.
    pub async fn dispatch_scoped(&self, intent: Intent, scope: CallScope) -> UrpcResult<Value> {
        intent.validate()?;
        let repo = self
            .repo(&intent.entity, intent.source.as_deref())?
            .with_scope(scope);
        repo.invoke(&intent.operation, intent.args).await
    }

    fn resolve_source(&self, entity: &str) -> UrpcResult<String> {
        if let Some(source) = self
            .entity_configs
            .get(entity)
            .and_then(|config| config.default_source.clone())
        {
            return Ok(source);
        }
        match self.catalog.sources_for(entity) {
            [only] => Ok(only.clone()),
            [] => Err(UrpcError::not_found(format!(
                "no sources registered for entity `{}`",
                simplify_entity_name(entity)
            ))),
            many => Err(UrpcError::bad_request(format!(
                "source required: entity `{}` is served by [{}]",
                simplify_entity_name(entity),
                many.join(", ")
            ))),
        }
    }

    fn seed_source(&self, entity: &str, config: &EntityConfig) -> Option<String> {
        config
            .default_source
            .clone()
            .or_else(|| self.catalog.sources_for(entity).first().cloned())
    }

    async fn seed(&self) {
        for (entity, config) in self.entity_configs.iter() {
            if config.init_data.is_empty() {
                continue;
            }
            let Some(source) = self.seed_source(entity, config) else {
                warn!(
                    "event=seed module=urpc status=skipped entity={} reason=no_source",
                    entity
                );
                continue;
            };
            let Some(repo) = self.registry.get_repo(entity, &source) else {
                warn!(
                    "event=seed module=urpc status=skipped entity={} source={} reason=no_repository",
                    entity, source
                );
                continue;
            };
            seed_rows(repo.adapter().as_ref(), entity, &source, config.init_data.clone()).await;
        }
    }
}

async fn seed_rows(adapter: &dyn DataAdapter, entity: &str, source: &str, rows: Vec<Value>) {
    let ctx = OperationContext::system(entity, source);
    let total = rows.len();
    match adapter
        .create_many(CreateManyArgs::new(rows.clone()), &ctx)
        .await
    {
        Ok(_) => info!(
            "event=seed module=urpc status=ok entity={} source={} rows={} mode=bulk",
            entity, source, total
        ),
        Err(err) if err.is_not_implemented() => {
            let ctx = &ctx;
            let results = join_all(
                rows.into_iter()
                    .map(|row| async move { adapter.create(CreateArgs::new(row), ctx).await }),
            )
            .await;
            let failures: Vec<UrpcError> = results.into_iter().filter_map(Result::err).collect();
            for err in &failures {
                warn!(
                    "event=seed module=urpc status=error entity={} source={} mode=single error={}",
                    entity, source, err
                );
            }
            info!(
                "event=seed module=urpc status=ok entity={} source={} rows={} failed={} mode=single",
                entity,
                source,
                total - failures.len(),
                failures.len()
            );
        }
        Err(err) => warn!(
            "event=seed module=urpc status=error entity={} source={} mode=bulk error={}",
            entity, source, err
        ),
    }
}

static GLOBAL: OnceCell<Urpc> = OnceCell::new();
static INIT_LOCK: Mutex<()> = Mutex::const_new(());

/// Bootstraps the process-wide runtime once.
///
/// Later calls return the first runtime and ignore their `config`.
pub async fn init(config: UrpcConfig) -> UrpcResult<&'static Urpc> {
    if let Some(urpc) = GLOBAL.get() {
        debug!("event=urpc_init module=urpc status=skipped reason=already_initialized");
        return Ok(urpc);
    }
    let _guard = INIT_LOCK.lock().await;
    if let Some(urpc) = GLOBAL.get() {
        return Ok(urpc);
    }
    let urpc = Urpc::bootstrap(config).await?;
    Ok(GLOBAL.get_or_init(|| urpc))
}

pub fn global() -> Option<&'static Urpc> {
    GLOBAL.get()
}

/// Repository lookup through the process-wide runtime.
pub fn repo(entity: &str, source: Option<&str>) -> UrpcResult<Repository> {
    global()
        .ok_or_else(|| UrpcError::internal("urpc is not initialized; call urpc::init first"))?
        .repo(entity, source)
}
