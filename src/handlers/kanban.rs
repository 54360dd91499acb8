//! Task board handlers.

use crate::error::AppError;
use crate::extractors::{ApiJson, CurrentAccount};
use crate::response::{success_ok, Reply};
use crate::service::{Board, KanbanService, StatusChange};
use crate::state::AppState;
use axum::extract::State;
use serde::Deserialize;

/// A bare list of changes, or the same list under `tasks`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KanbanUpdate {
    Changes(Vec<StatusChange>),
    Wrapped { tasks: Vec<StatusChange> },
}

impl KanbanUpdate {
    fn into_changes(self) -> Vec<StatusChange> {
        match self {
            KanbanUpdate::Changes(c) | KanbanUpdate::Wrapped { tasks: c } => c,
        }
    }
}

pub async fn board(State(state): State<AppState>, current: CurrentAccount) -> Result<Reply<Board>, AppError> {
    let board = KanbanService::new(state.store.as_ref(), &state.catalog, &state.config.kanban_columns)
        .board(current.scope())
        .await?;
    Ok(success_ok(board, "Board retrieved"))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentAccount,
    ApiJson(body): ApiJson<KanbanUpdate>,
) -> Result<Reply<Board>, AppError> {
    let changes = body.into_changes();
    let board = KanbanService::new(state.store.as_ref(), &state.catalog, &state.config.kanban_columns)
        .apply_status_changes(current.scope(), &changes)
        .await?;
    Ok(success_ok(board, "Board updated"))
}
