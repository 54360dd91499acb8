//! Sales report totals for an account.

use crate::account::AccountRef;
use crate::config::{Catalog, EntityKind};
use crate::error::AppError;
use crate::service::CrudService;
use crate::store::{Row, Store};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SalesSummary {
    pub sales_count: u64,
    pub units_sold: i64,
    pub gross_total: f64,
    pub amount_paid: f64,
    /// Unpaid remainder of credit sales.
    pub credit_outstanding: f64,
}

impl SalesSummary {
    pub fn from_rows(rows: &[Row]) -> Self {
        let mut s = SalesSummary::default();
        for row in rows {
            let quantity = row.get("quantity").and_then(Value::as_i64).unwrap_or(0);
            let unit_price = row.get("unit_price").and_then(Value::as_f64).unwrap_or(0.0);
            let paid = row.get("amount_paid").and_then(Value::as_f64).unwrap_or(0.0);
            let total = quantity as f64 * unit_price;
            s.sales_count += 1;
            s.units_sold += quantity;
            s.gross_total += total;
            s.amount_paid += paid;
            if row.get("is_credit").and_then(Value::as_bool).unwrap_or(false) {
                s.credit_outstanding += (total - paid).max(0.0);
            }
        }
        s.gross_total = cents(s.gross_total);
        s.amount_paid = cents(s.amount_paid);
        s.credit_outstanding = cents(s.credit_outstanding);
        s
    }
}

fn cents(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Summarise every sale of the account, optionally for one customer.
pub async fn sales_summary(
    store: &dyn Store,
    catalog: &Catalog,
    scope: AccountRef,
    customer_id: Option<i64>,
) -> Result<SalesSummary, AppError> {
    let sales = catalog.get(EntityKind::Sale)?;
    let filters = customer_id
        .map(|id| vec![("customer_id".to_string(), Value::from(id))])
        .unwrap_or_default();
    let rows = CrudService::new(store, catalog).list_all(scope, sales, filters).await?;
    Ok(SalesSummary::from_rows(&rows))
}
