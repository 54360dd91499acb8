//! Stock create/update: plain CRUD plus the purchase expense and stock alerts.

use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, CurrentAccount};
use crate::handlers::entity::parse_id;
use crate::response::{success_created, success_ok, Reply};
use crate::service::StockService;
use crate::state::AppState;
use crate::store::Row;
use axum::extract::State;
use serde_json::Value;

pub async fn create(
    State(state): State<AppState>,
    current: CurrentAccount,
    ApiJson(body): ApiJson<Value>,
) -> Result<Reply<Row>, AppError> {
    let purchase = StockService::new(state.store.as_ref(), &state.catalog, state.notifier.as_ref())
        .create_with_expense(current.scope(), &body)
        .await?;
    let message = if purchase.expense.is_some() {
        "Stock created and purchase expense recorded"
    } else {
        "Stock created"
    };
    Ok(success_created(purchase.stock, message))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentAccount,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Reply<Row>, AppError> {
    let id = parse_id(&id)?;
    let row = StockService::new(state.store.as_ref(), &state.catalog, state.notifier.as_ref())
        .update_and_notify(current.scope(), id, &body)
        .await?;
    Ok(success_ok(row, "Stock updated"))
}
