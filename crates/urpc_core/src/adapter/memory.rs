//! In-process adapter over a vector of JSON rows.
//!
//! # Responsibility
//! - Serve every fixed operation against rows held in memory.
//! - Back any entity through [`MemoryAdapter::factory`].
//!
//! # Invariants
//! - Stored rows are JSON objects.
//! - Each operation holds the row lock for its whole read-modify-write, so
//!   concurrent calls never interleave inside one operation.
//! - `include` is accepted and ignored; rows carry no relations.

use crate::adapter::contract::{AdapterFactory, DataAdapter};
use crate::error::{UrpcError, UrpcResult};
use crate::middleware::context::OperationContext;
use crate::query::compare::values_equal;
use crate::query::{
    CreateArgs, CreateManyArgs, DeleteArgs, FindManyArgs, FindOneArgs, MatchMode, UpdateArgs,
    UpdateManyArgs, UpsertArgs, UpsertManyArgs,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const DEFAULT_CONFLICT_FIELD: &str = "id";

#[derive(Debug, Default)]
pub struct MemoryAdapter {
    rows: RwLock<Vec<Value>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Value>) -> UrpcResult<Self> {
        for row in &rows {
            expect_object("rows", row)?;
        }
        Ok(Self {
            rows: RwLock::new(rows),
        })
    }

    /// Factory creating one empty store per `(entity, source)`.
    pub fn factory() -> AdapterFactory {
        Arc::new(|_entity: &str, _source: &str| -> Arc<dyn DataAdapter> {
            Arc::new(MemoryAdapter::new())
        })
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Value>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Value>> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn expect_object<'a>(label: &str, value: &'a Value) -> UrpcResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| UrpcError::bad_request(format!("{label}: expected an object")))
}

/// Shallow merge: top-level keys of `patch` replace those of `row`.
fn merge_into(row: &mut Value, patch: &Map<String, Value>) {
    if let Value::Object(target) = row {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl DataAdapter for MemoryAdapter {
    async fn find_many(
        &self,
        args: FindManyArgs,
        _ctx: &OperationContext,
    ) -> UrpcResult<Vec<Value>> {
        let mut rows: Vec<Value> = {
            let rows = self.read();
            match &args.filter {
                Some(filter) => rows.iter().filter(|row| filter.matches(row)).cloned().collect(),
                None => rows.clone(),
            }
        };
        if let Some(order) = &args.order_by {
            order.sort(&mut rows);
        }

        let offset = args.offset.unwrap_or(0);
        let rows = rows.into_iter().skip(offset);
        Ok(match args.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        })
    }

    async fn find_one(&self, args: FindOneArgs, _ctx: &OperationContext) -> UrpcResult<Option<Value>> {
        Ok(self
            .read()
            .iter()
            .find(|row| args.filter.matches(row))
            .cloned())
    }

    async fn create(&self, args: CreateArgs, _ctx: &OperationContext) -> UrpcResult<Value> {
        expect_object("data", &args.data)?;
        self.write().push(args.data.clone());
        Ok(args.data)
    }

    async fn create_many(
        &self,
        args: CreateManyArgs,
        _ctx: &OperationContext,
    ) -> UrpcResult<Vec<Value>> {
        for (index, row) in args.data.iter().enumerate() {
            expect_object(&format!("data[{index}]"), row)?;
        }
        self.write().extend(args.data.iter().cloned());
        Ok(args.data)
    }

    async fn update(&self, args: UpdateArgs, _ctx: &OperationContext) -> UrpcResult<Value> {
        let patch = expect_object("data", &args.data)?;
        let mut rows = self.write();
        let row = rows
            .iter_mut()
            .find(|row| args.filter.matches(row))
            .ok_or_else(|| UrpcError::not_found("no row matches the update filter"))?;
        merge_into(row, patch);
        Ok(row.clone())
    }

    async fn update_many(
        &self,
        args: UpdateManyArgs,
        _ctx: &OperationContext,
    ) -> UrpcResult<Vec<Value>> {
        let patch = expect_object("data", &args.data)?;
        let mut rows = self.write();
        Ok(rows
            .iter_mut()
            .filter(|row| args.filter.matches(row))
            .map(|row| {
                merge_into(row, patch);
                row.clone()
            })
            .collect())
    }

    async fn upsert(&self, args: UpsertArgs, _ctx: &OperationContext) -> UrpcResult<Value> {
        let update = expect_object("update", &args.update)?;
        let create = expect_object("create", &args.create)?;
        let mut rows = self.write();
        if let Some(row) = rows.iter_mut().find(|row| args.filter.matches(row)) {
            merge_into(row, update);
            return Ok(row.clone());
        }

        let mut created = Value::Object(args.filter.pinned_fields());
        merge_into(&mut created, create);
        rows.push(created.clone());
        Ok(created)
    }

    async fn upsert_many(
        &self,
        args: UpsertManyArgs,
        _ctx: &OperationContext,
    ) -> UrpcResult<Vec<Value>> {
        let field = match &args.on_conflict {
            Some(target) => target.single_field()?,
            None => DEFAULT_CONFLICT_FIELD,
        };
        for (index, row) in args.data.iter().enumerate() {
            expect_object(&format!("data[{index}]"), row)?;
        }

        let mut rows = self.write();
        let mut out = Vec::with_capacity(args.data.len());
        for incoming in args.data {
            let position = incoming
                .get(field)
                .filter(|key| !key.is_null())
                .and_then(|key| {
                    rows.iter().position(|row| {
                        row.get(field)
                            .is_some_and(|current| values_equal(current, key, MatchMode::Sensitive))
                    })
                });
            match position {
                Some(index) => {
                    if let Value::Object(patch) = &incoming {
                        merge_into(&mut rows[index], patch);
                    }
                    out.push(rows[index].clone());
                }
                None => {
                    rows.push(incoming.clone());
                    out.push(incoming);
                }
            }
        }
        Ok(out)
    }

    async fn delete(&self, args: DeleteArgs, _ctx: &OperationContext) -> UrpcResult<bool> {
        let mut rows = self.write();
        let before = rows.len();
        rows.retain(|row| !args.filter.matches(row));
        Ok(rows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryAdapter;
    use crate::adapter::contract::DataAdapter;
    use crate::error::ErrorCode;
    use crate::middleware::context::OperationContext;
    use crate::query::{
        CreateArgs, DeleteArgs, FindManyArgs, OrderBy, UpdateArgs, UpsertManyArgs, WhereClause,
    };
    use serde_json::json;

    fn ctx() -> OperationContext {
        OperationContext::system("user", "memory")
    }

    #[tokio::test]
    async fn find_many_filters_sorts_and_pages() {
        let adapter = MemoryAdapter::with_rows(vec![
            json!({"id": "1", "age": 30}),
            json!({"id": "2", "age": 20}),
            json!({"id": "3", "age": 40}),
            json!({"id": "4", "age": 10}),
        ])
        .expect("seed rows");

        let args = FindManyArgs::new()
            .filter(WhereClause::try_from(json!({"age": {"gte": 20}})).expect("filter"))
            .order_by(OrderBy::desc("age"))
            .offset(1)
            .limit(1);
        let rows = adapter.find_many(args, &ctx()).await.expect("rows");
        assert_eq!(rows, vec![json!({"id": "1", "age": 30})]);
    }

    #[tokio::test]
    async fn create_rejects_non_object_rows() {
        let adapter = MemoryAdapter::new();
        let err = adapter
            .create(CreateArgs::new(json!("not a row")), &ctx())
            .await
            .expect_err("scalar row");
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert!(adapter.is_empty());
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let adapter = MemoryAdapter::new();
        let err = adapter
            .update(
                UpdateArgs::new(WhereClause::eq("id", "9"), json!({"name": "x"})),
                &ctx(),
            )
            .await
            .expect_err("no row");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(!err.is_not_implemented());
    }

    #[tokio::test]
    async fn delete_removes_every_match() {
        let adapter = MemoryAdapter::with_rows(vec![
            json!({"id": "1", "team": "a"}),
            json!({"id": "2", "team": "a"}),
            json!({"id": "3", "team": "b"}),
        ])
        .expect("seed rows");

        let removed = adapter
            .delete(DeleteArgs::new(WhereClause::eq("team", "a")), &ctx())
            .await
            .expect("delete");
        assert!(removed);
        assert_eq!(adapter.snapshot(), vec![json!({"id": "3", "team": "b"})]);

        let removed = adapter
            .delete(DeleteArgs::new(WhereClause::eq("team", "a")), &ctx())
            .await
            .expect("delete");
        assert!(!removed);
    }

    #[tokio::test]
    async fn upsert_many_matches_on_conflict_field() {
        let adapter =
            MemoryAdapter::with_rows(vec![json!({"email": "a@x", "n": 1})]).expect("seed rows");
        let rows = adapter
            .upsert_many(
                UpsertManyArgs::new(vec![json!({"email": "a@x", "n": 2}), json!({"email": "b@x"})])
                    .on_conflict("email"),
                &ctx(),
            )
            .await
            .expect("upsert many");
        assert_eq!(rows, vec![json!({"email": "a@x", "n": 2}), json!({"email": "b@x"})]);
        assert_eq!(adapter.len(), 2);
    }
}
