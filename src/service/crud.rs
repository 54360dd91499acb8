//! Generic scoped CRUD over catalog entities.

use crate::account::AccountRef;
use crate::config::{Catalog, EntityDef};
use crate::error::{AppError, FieldErrors};
use crate::service::RequestValidator;
use crate::store::{ListQuery, Row, Store};
use serde_json::Value;
use std::collections::HashMap;

pub struct CrudService<'a> {
    store: &'a dyn Store,
    catalog: &'a Catalog,
}

impl<'a> CrudService<'a> {
    pub fn new(store: &'a dyn Store, catalog: &'a Catalog) -> Self {
        CrudService { store, catalog }
    }

    /// Build a list query from raw query-string params: `limit` (default `default_limit`,
    /// capped at `max_limit`), `offset` (default 0) and exact-match column filters.
    /// Params naming no readable column are ignored.
    pub fn list_query(
        entity: &EntityDef,
        params: &HashMap<String, String>,
        default_limit: u32,
        max_limit: u32,
    ) -> Result<ListQuery, AppError> {
        let mut limit = default_limit;
        let mut offset = 0;
        let mut filters = Vec::new();
        for (k, v) in params {
            match k.as_str() {
                "limit" => {
                    limit = v
                        .parse()
                        .map_err(|_| AppError::BadRequest("limit must be a non-negative integer".into()))?;
                }
                "offset" => {
                    offset = v
                        .parse()
                        .map_err(|_| AppError::BadRequest("offset must be a non-negative integer".into()))?;
                }
                _ => {
                    if let Some(c) = entity.readable_columns().find(|c| c.name == k.as_str()) {
                        filters.push((k.clone(), RequestValidator::filter_value(c, v)?));
                    }
                }
            }
        }
        filters.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ListQuery {
            filters,
            limit: limit.min(max_limit),
            offset,
        })
    }

    pub async fn list(&self, scope: AccountRef, entity: &EntityDef, query: &ListQuery) -> Result<Vec<Row>, AppError> {
        self.store.list(scope, entity, query).await
    }

    /// Every row matching `filters`, fetched page by page.
    pub async fn list_all(
        &self,
        scope: AccountRef,
        entity: &EntityDef,
        filters: Vec<(String, Value)>,
    ) -> Result<Vec<Row>, AppError> {
        const PAGE: u32 = 1000;
        let mut query = ListQuery {
            filters,
            limit: PAGE,
            offset: 0,
        };
        let mut out = Vec::new();
        loop {
            let page = self.store.list(scope, entity, &query).await?;
            let done = page.len() < PAGE as usize;
            out.extend(page);
            if done {
                return Ok(out);
            }
            query.offset += PAGE;
        }
    }

    pub async fn read(&self, scope: AccountRef, entity: &EntityDef, id: i64) -> Result<Row, AppError> {
        self.store
            .read(scope, entity, id)
            .await?
            .ok_or_else(|| AppError::NotFound(entity.label.to_string()))
    }

    /// Validate, apply defaults, check references, insert.
    pub async fn create(&self, scope: AccountRef, entity: &EntityDef, body: &Value) -> Result<Row, AppError> {
        let values = RequestValidator::for_create(entity, body)?;
        self.check_references(scope, entity, &values).await?;
        let row = self.store.insert(scope, entity, &values).await?;
        tracing::info!(entity = entity.table, account = %scope, id = ?row.get("id"), "created");
        Ok(row)
    }

    /// Partial update: only columns present in `body` change.
    pub async fn update(&self, scope: AccountRef, entity: &EntityDef, id: i64, body: &Value) -> Result<Row, AppError> {
        let values = RequestValidator::for_update(entity, body)?;
        self.check_references(scope, entity, &values).await?;
        self.store
            .update(scope, entity, id, &values)
            .await?
            .ok_or_else(|| AppError::NotFound(entity.label.to_string()))
    }

    /// Delete one row. Fails with `Conflict` while other rows in the account still point at it.
    pub async fn delete(&self, scope: AccountRef, entity: &EntityDef, id: i64) -> Result<(), AppError> {
        self.read(scope, entity, id).await?;
        for (dependent, column) in self.catalog.referencing(entity.table) {
            let probe = ListQuery {
                filters: vec![(column.to_string(), Value::from(id))],
                limit: 1,
                offset: 0,
            };
            if !self.store.list(scope, &dependent, &probe).await?.is_empty() {
                return Err(AppError::Conflict(format!(
                    "{} is still referenced by {}",
                    entity.label, dependent.table
                )));
            }
        }
        if !self.store.delete(scope, entity, id).await? {
            return Err(AppError::NotFound(entity.label.to_string()));
        }
        tracing::info!(entity = entity.table, account = %scope, id, "deleted");
        Ok(())
    }

    /// Every non-null reference column must point at a row of the same account.
    pub async fn check_references(&self, scope: AccountRef, entity: &EntityDef, values: &Row) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        for c in entity.reference_columns() {
            let (Some(target), Some(id)) = (c.references, values.get(c.name).and_then(Value::as_i64)) else {
                continue;
            };
            let target = self
                .catalog
                .by_table(target)
                .ok_or_else(|| AppError::Internal(format!("unknown referenced table {}", target)))?;
            if self.store.read(scope, target, id).await?.is_none() {
                errors.insert(
                    c.name.to_string(),
                    format!("does not reference an existing {}", target.label.to_lowercase()),
                );
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation {
                message: "validation failed".into(),
                errors,
            })
        }
    }
}
