//! Task board: tasks bucketed into ordered status columns.

use crate::account::AccountRef;
use crate::config::{Catalog, EntityKind};
use crate::error::{AppError, FieldErrors};
use crate::service::{CrudService, RequestValidator};
use crate::store::{Row, Store};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Clone, Debug, Serialize)]
pub struct BoardColumn {
    pub status: String,
    pub tasks: Vec<Row>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Board {
    pub columns: Vec<BoardColumn>,
}

impl Board {
    pub fn column(&self, status: &str) -> Option<&BoardColumn> {
        self.columns.iter().find(|c| c.status == status)
    }
}

/// Partition tasks into `columns` by exact `status` match, keeping input order within
/// a column. Tasks whose status names no column are left out.
pub fn bucket(columns: &[String], tasks: Vec<Row>) -> Board {
    let mut board = Board {
        columns: columns
            .iter()
            .map(|status| BoardColumn {
                status: status.clone(),
                tasks: Vec::new(),
            })
            .collect(),
    };
    for task in tasks {
        let status = task.get("status").and_then(Value::as_str).unwrap_or_default();
        match board.columns.iter_mut().find(|c| c.status == status) {
            Some(column) => column.tasks.push(task),
            None => tracing::debug!(status, id = ?task.get("id"), "task status has no board column"),
        }
    }
    board
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StatusChange {
    pub id: i64,
    pub status: String,
}

pub struct KanbanService<'a> {
    store: &'a dyn Store,
    catalog: &'a Catalog,
    columns: &'a [String],
}

impl<'a> KanbanService<'a> {
    pub fn new(store: &'a dyn Store, catalog: &'a Catalog, columns: &'a [String]) -> Self {
        KanbanService { store, catalog, columns }
    }

    pub async fn board(&self, scope: AccountRef) -> Result<Board, AppError> {
        let tasks = self.catalog.get(EntityKind::Task)?;
        let mut rows = CrudService::new(self.store, self.catalog)
            .list_all(scope, tasks, Vec::new())
            .await?;
        rows.sort_by_key(|r| {
            (
                r.get("position").and_then(Value::as_i64).unwrap_or(0),
                r.get("id").and_then(Value::as_i64).unwrap_or(0),
            )
        });
        Ok(bucket(self.columns, rows))
    }

    /// Apply every change in one write; ids not found in the account are skipped.
    /// Returns the refreshed board.
    pub async fn apply_status_changes(&self, scope: AccountRef, changes: &[StatusChange]) -> Result<Board, AppError> {
        let tasks = self.catalog.get(EntityKind::Task)?;
        let mut items = Vec::with_capacity(changes.len());
        let mut errors = FieldErrors::new();
        for (i, change) in changes.iter().enumerate() {
            match RequestValidator::for_update(tasks, &json!({ "status": change.status })) {
                Ok(values) => items.push((change.id, values)),
                Err(AppError::Validation { errors: e, .. }) => {
                    for (field, reason) in e {
                        errors.insert(format!("{}.{}", i, field), reason);
                    }
                }
                Err(other) => return Err(other),
            }
        }
        if !errors.is_empty() {
            return Err(AppError::Validation {
                message: "validation failed".into(),
                errors,
            });
        }
        let updated = self.store.update_all(scope, tasks, &items).await?;
        if updated.len() < items.len() {
            tracing::debug!(
                account = %scope,
                requested = items.len(),
                updated = updated.len(),
                "skipped unknown task ids"
            );
        }
        self.board(scope).await
    }
}
