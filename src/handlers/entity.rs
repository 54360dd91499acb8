//! Scoped CRUD handlers shared by every catalog entity. The entity comes from the
//! route's `Extension<EntityRef>` layer.

use crate::config::EntityRef;
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentAccount};
use crate::response::{success_created, success_empty, success_many, success_ok, Reply};
use crate::service::CrudService;
use crate::state::AppState;
use crate::store::Row;
use axum::extract::{Extension, State};
use serde_json::Value;
use std::collections::HashMap;

pub(crate) fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", raw)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(entity): Extension<EntityRef>,
    current: CurrentAccount,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> Result<Reply<Vec<Row>>, AppError> {
    let query = CrudService::list_query(&entity, &params, state.config.default_limit, state.config.max_limit)?;
    let rows = CrudService::new(state.store.as_ref(), &state.catalog)
        .list(current.scope(), &entity, &query)
        .await?;
    Ok(success_many(rows, format!("{} records retrieved", entity.label)))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(entity): Extension<EntityRef>,
    current: CurrentAccount,
    ApiPath(id): ApiPath<String>,
) -> Result<Reply<Row>, AppError> {
    let id = parse_id(&id)?;
    let row = CrudService::new(state.store.as_ref(), &state.catalog)
        .read(current.scope(), &entity, id)
        .await?;
    Ok(success_ok(row, format!("{} retrieved", entity.label)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(entity): Extension<EntityRef>,
    current: CurrentAccount,
    ApiJson(body): ApiJson<Value>,
) -> Result<Reply<Row>, AppError> {
    let row = CrudService::new(state.store.as_ref(), &state.catalog)
        .create(current.scope(), &entity, &body)
        .await?;
    Ok(success_created(row, format!("{} created", entity.label)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(entity): Extension<EntityRef>,
    current: CurrentAccount,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Reply<Row>, AppError> {
    let id = parse_id(&id)?;
    let row = CrudService::new(state.store.as_ref(), &state.catalog)
        .update(current.scope(), &entity, id, &body)
        .await?;
    Ok(success_ok(row, format!("{} updated", entity.label)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(entity): Extension<EntityRef>,
    current: CurrentAccount,
    ApiPath(id): ApiPath<String>,
) -> Result<Reply<Value>, AppError> {
    let id = parse_id(&id)?;
    CrudService::new(state.store.as_ref(), &state.catalog)
        .delete(current.scope(), &entity, id)
        .await?;
    Ok(success_empty(format!("{} deleted", entity.label)))
}
