//! Report endpoints. Only the data is produced here; rendering is done elsewhere.

use crate::error::AppError;
use crate::extractors::{ApiQuery, CurrentAccount};
use crate::response::{success_ok, Reply};
use crate::service::{sales_summary, SalesSummary};
use crate::state::AppState;
use axum::extract::State;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SalesReportParams {
    pub customer_id: Option<String>,
}

pub async fn sales(
    State(state): State<AppState>,
    current: CurrentAccount,
    ApiQuery(params): ApiQuery<SalesReportParams>,
) -> Result<Reply<SalesSummary>, AppError> {
    let customer_id = params
        .customer_id
        .as_deref()
        .map(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| AppError::field("customer_id", "must be an integer"))
        })
        .transpose()?;
    let summary = sales_summary(state.store.as_ref(), &state.catalog, current.scope(), customer_id).await?;
    Ok(success_ok(summary, "Sales summary retrieved"))
}
