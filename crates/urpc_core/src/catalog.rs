//! Read-only entity maps built at bootstrap.

use crate::schema::{simplify_entity_name, Schema};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Entity to schema and entity to sources, keyed by simplified name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityCatalog {
    schemas: BTreeMap<String, Schema>,
    sources: BTreeMap<String, Vec<String>>,
}

impl EntityCatalog {
    pub fn new(schemas: BTreeMap<String, Schema>, sources: BTreeMap<String, Vec<String>>) -> Self {
        Self { schemas, sources }
    }

    /// Groups `(entity, source)` pairs; sources keep first-seen order without
    /// duplicates.
    pub fn group_sources<'a, I>(pairs: I) -> BTreeMap<String, Vec<String>>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut sources: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (entity, source) in pairs {
            let listed = sources.entry(simplify_entity_name(entity)).or_default();
            if !listed.iter().any(|known| known == source) {
                listed.push(source.to_string());
            }
        }
        sources
    }

    pub fn schemas(&self) -> &BTreeMap<String, Schema> {
        &self.schemas
    }

    pub fn sources(&self) -> &BTreeMap<String, Vec<String>> {
        &self.sources
    }

    pub fn schema(&self, entity: &str) -> Option<&Schema> {
        self.schemas.get(&simplify_entity_name(entity))
    }

    pub fn sources_for(&self, entity: &str) -> &[String] {
        self.sources
            .get(&simplify_entity_name(entity))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every entity known through a schema or a registration.
    pub fn entity_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schemas
            .keys()
            .chain(self.sources.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// `{name, schema, sources}` row for one entity.
    pub fn describe(&self, entity: &str) -> Option<Value> {
        let name = simplify_entity_name(entity);
        if !self.schemas.contains_key(&name) && !self.sources.contains_key(&name) {
            return None;
        }
        Some(json!({
            "name": name,
            "schema": self.schema(&name).map(Schema::to_value).unwrap_or(Value::Null),
            "sources": self.sources_for(&name),
        }))
    }

    pub fn describe_all(&self) -> Vec<Value> {
        self.entity_names()
            .iter()
            .filter_map(|name| self.describe(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::EntityCatalog;
    use std::collections::BTreeMap;

    #[test]
    fn group_sources_normalizes_and_dedups() {
        let sources = EntityCatalog::group_sources([
            ("UserEntity", "memory"),
            ("user", "postgres"),
            ("User", "memory"),
        ]);
        assert_eq!(
            sources.get("user"),
            Some(&vec!["memory".to_string(), "postgres".to_string()])
        );
    }

    #[test]
    fn describe_unknown_entity_is_none() {
        let catalog = EntityCatalog::new(BTreeMap::new(), BTreeMap::new());
        assert!(catalog.describe("ghost").is_none());
        assert!(catalog.sources_for("ghost").is_empty());
    }
}
