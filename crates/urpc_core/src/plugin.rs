//! Bootstrap composition units.

use crate::adapter::{AdapterFactory, DataAdapter};
use crate::error::UrpcResult;
use crate::schema::{Entity, EntityDefinition};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// One adapter bound to `(entity, source)`.
#[derive(Clone)]
pub struct AdapterRegistration {
    pub entity: String,
    pub source: String,
    pub adapter: Arc<dyn DataAdapter>,
}

impl AdapterRegistration {
    pub fn new(
        entity: impl Into<String>,
        source: impl Into<String>,
        adapter: Arc<dyn DataAdapter>,
    ) -> Self {
        Self {
            entity: entity.into(),
            source: source.into(),
            adapter,
        }
    }
}

impl Debug for AdapterRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistration")
            .field("entity", &self.entity)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Source-agnostic adapter family instantiated for every declared entity.
#[derive(Clone)]
pub struct GlobalAdapter {
    pub source: String,
    pub factory: AdapterFactory,
}

impl GlobalAdapter {
    pub fn new(source: impl Into<String>, factory: AdapterFactory) -> Self {
        Self {
            source: source.into(),
            factory,
        }
    }
}

impl Debug for GlobalAdapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalAdapter")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Bundle of entity definitions and adapter registrations.
#[derive(Debug, Clone, Default)]
pub struct Plugin {
    pub name: String,
    pub entities: Vec<EntityDefinition>,
    pub adapters: Vec<AdapterRegistration>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_entity(mut self, definition: EntityDefinition) -> Self {
        self.entities.push(definition);
        self
    }

    /// Adds the definition declared by `E`.
    pub fn with_entity_type<E: Entity>(self) -> UrpcResult<Self> {
        Ok(self.with_entity(E::definition()?))
    }

    pub fn with_adapter(
        mut self,
        entity: impl Into<String>,
        source: impl Into<String>,
        adapter: Arc<dyn DataAdapter>,
    ) -> Self {
        self.adapters
            .push(AdapterRegistration::new(entity, source, adapter));
        self
    }
}
