//! Stock writes with side effects: purchase expense on create, alerts on update.

use crate::account::AccountRef;
use crate::config::{Catalog, EntityKind, NUMERIC_LIMIT};
use crate::error::AppError;
use crate::notify::{Notification, Notifier};
use crate::service::{CrudService, RequestValidator};
use crate::store::{Row, Store};
use serde_json::Value;

pub struct StockService<'a> {
    store: &'a dyn Store,
    catalog: &'a Catalog,
    notifier: &'a dyn Notifier,
}

/// A created stock row and the expense recorded for it, if any.
#[derive(Debug)]
pub struct StockPurchase {
    pub stock: Row,
    pub expense: Option<Row>,
}

impl<'a> StockService<'a> {
    pub fn new(store: &'a dyn Store, catalog: &'a Catalog, notifier: &'a dyn Notifier) -> Self {
        StockService {
            store,
            catalog,
            notifier,
        }
    }

    /// Insert the stock row and, when it cost anything, an `expense` transaction for
    /// `cost_price * quantity`. Both rows are written together or not at all.
    /// `wallet_id` in the body is charged when present.
    pub async fn create_with_expense(&self, scope: AccountRef, body: &Value) -> Result<StockPurchase, AppError> {
        let stocks = self.catalog.get(EntityKind::Stock)?;
        let transactions = self.catalog.get(EntityKind::Transaction)?;
        let values = RequestValidator::for_create(stocks, body)?;

        let quantity = values.get("quantity").and_then(Value::as_f64).unwrap_or(0.0);
        let cost_price = values.get("cost_price").and_then(Value::as_f64).unwrap_or(0.0);
        let amount = round_cents(cost_price * quantity);
        if amount >= NUMERIC_LIMIT {
            return Err(AppError::field(
                "cost_price",
                format!("cost_price * quantity must be less than {}", NUMERIC_LIMIT),
            ));
        }
        if amount <= 0.0 {
            let stock = CrudService::new(self.store, self.catalog).create(scope, stocks, body).await?;
            return Ok(StockPurchase { stock, expense: None });
        }

        let name = values.get("name").and_then(Value::as_str).unwrap_or_default();
        let mut expense_body = serde_json::Map::new();
        expense_body.insert("kind".into(), Value::from("expense"));
        expense_body.insert("amount".into(), Value::from(amount));
        expense_body.insert("description".into(), Value::from(format!("Stock purchase: {}", name)));
        expense_body.insert(
            "occurred_on".into(),
            Value::from(chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()),
        );
        if let Some(wallet_id) = body.get("wallet_id").filter(|v| !v.is_null()) {
            expense_body.insert("wallet_id".into(), wallet_id.clone());
        }
        let expense = RequestValidator::for_create(transactions, &Value::Object(expense_body))?;
        CrudService::new(self.store, self.catalog)
            .check_references(scope, transactions, &expense)
            .await?;

        let mut rows = self
            .store
            .insert_all(scope, &[(stocks.as_ref(), values), (transactions.as_ref(), expense)])
            .await?
            .into_iter();
        let stock = rows
            .next()
            .ok_or_else(|| AppError::Internal("stock insert returned no row".into()))?;
        let expense = rows.next();
        tracing::info!(account = %scope, stock_id = ?stock.get("id"), amount, "stock purchase recorded");
        Ok(StockPurchase { stock, expense })
    }

    /// Update a stock row, then tell the notifier. Notification failures are logged only.
    pub async fn update_and_notify(&self, scope: AccountRef, id: i64, body: &Value) -> Result<Row, AppError> {
        let stocks = self.catalog.get(EntityKind::Stock)?;
        let row = CrudService::new(self.store, self.catalog)
            .update(scope, stocks, id, body)
            .await?;
        let notification = notification_for(scope, id, &row);
        if let Err(e) = self.notifier.notify(&notification).await {
            tracing::warn!(account = %scope, stock_id = id, error = %e, "stock notification failed");
        }
        Ok(row)
    }
}

/// `LowStock` when quantity is at or below the threshold, else `StockUpdated`.
pub fn notification_for(scope: AccountRef, id: i64, row: &Row) -> Notification {
    let name = row.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let quantity = row.get("quantity").and_then(Value::as_i64).unwrap_or(0);
    let threshold = row.get("low_stock_threshold").and_then(Value::as_i64).unwrap_or(0);
    if quantity <= threshold {
        Notification::LowStock {
            account: scope,
            stock_id: id,
            name,
            quantity,
            threshold,
        }
    } else {
        Notification::StockUpdated {
            account: scope,
            stock_id: id,
            name,
            quantity,
        }
    }
}

fn round_cents(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountKind;
    use crate::store::{ListQuery, MemoryStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    #[async_trait]
    impl Notifier for Recorder {
        async fn notify(&self, n: &Notification) -> Result<(), AppError> {
            self.0.lock().unwrap().push(n.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _: &Notification) -> Result<(), AppError> {
            Err(AppError::Internal("dispatcher down".into()))
        }
    }

    fn scope() -> AccountRef {
        AccountRef::new(AccountKind::Retail, Uuid::new_v4())
    }

    async fn expenses(store: &MemoryStore, catalog: &Catalog, scope: AccountRef) -> Vec<Row> {
        let tx = catalog.get(EntityKind::Transaction).unwrap();
        store
            .list(scope, tx, &ListQuery { filters: vec![], limit: 100, offset: 0 })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn purchase_records_expense() {
        let store = MemoryStore::new();
        let catalog = Catalog::standard().unwrap();
        let scope = scope();
        let recorder = Recorder::default();
        let svc = StockService::new(&store, &catalog, &recorder);

        let purchase = svc
            .create_with_expense(scope, &json!({"name": "Rice 5kg", "quantity": 10, "cost_price": 4.25}))
            .await
            .unwrap();
        let expense = purchase.expense.unwrap();
        assert_eq!(expense["kind"], "expense");
        assert_eq!(expense["amount"], 42.5);
        assert_eq!(expense["description"], "Stock purchase: Rice 5kg");
        assert_eq!(purchase.stock["low_stock_threshold"], 0);
        assert_eq!(expenses(&store, &catalog, scope).await.len(), 1);
    }

    #[tokio::test]
    async fn free_stock_has_no_expense() {
        let store = MemoryStore::new();
        let catalog = Catalog::standard().unwrap();
        let scope = scope();
        let recorder = Recorder::default();
        let svc = StockService::new(&store, &catalog, &recorder);

        let purchase = svc
            .create_with_expense(scope, &json!({"name": "Samples", "quantity": 3}))
            .await
            .unwrap();
        assert!(purchase.expense.is_none());
        assert!(expenses(&store, &catalog, scope).await.is_empty());
    }

    #[tokio::test]
    async fn foreign_wallet_rejects_whole_purchase() {
        let store = MemoryStore::new();
        let catalog = Catalog::standard().unwrap();
        let scope = scope();
        let recorder = Recorder::default();
        let svc = StockService::new(&store, &catalog, &recorder);

        let err = svc
            .create_with_expense(scope, &json!({"name": "Oil", "quantity": 2, "cost_price": 3, "wallet_id": 77}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        let stocks = catalog.get(EntityKind::Stock).unwrap();
        let q = ListQuery { filters: vec![], limit: 100, offset: 0 };
        assert!(store.list(scope, stocks, &q).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_purchase_total_is_rejected() {
        let store = MemoryStore::new();
        let catalog = Catalog::standard().unwrap();
        let scope = scope();
        let recorder = Recorder::default();
        let svc = StockService::new(&store, &catalog, &recorder);
        let err = svc
            .create_with_expense(scope, &json!({"name": "Gold", "quantity": 1000000, "cost_price": 2000000}))
            .await
            .unwrap_err();
        match err {
            AppError::Validation { errors, .. } => assert!(errors.contains_key("cost_price")),
            other => panic!("unexpected {other:?}"),
        }
        let stocks = catalog.get(EntityKind::Stock).unwrap();
        let q = ListQuery { filters: vec![], limit: 100, offset: 0 };
        assert!(store.list(scope, stocks, &q).await.unwrap().is_empty());
        assert!(expenses(&store, &catalog, scope).await.is_empty());
    }

    #[tokio::test]
    async fn update_sends_low_stock_alert() {
        let store = MemoryStore::new();
        let catalog = Catalog::standard().unwrap();
        let scope = scope();
        let recorder = Recorder::default();
        let svc = StockService::new(&store, &catalog, &recorder);

        let purchase = svc
            .create_with_expense(scope, &json!({"name": "Milk", "quantity": 20, "low_stock_threshold": 5}))
            .await
            .unwrap();
        let id = purchase.stock["id"].as_i64().unwrap();

        svc.update_and_notify(scope, id, &json!({"quantity": 12})).await.unwrap();
        svc.update_and_notify(scope, id, &json!({"quantity": 5})).await.unwrap();

        let sent = recorder.0.lock().unwrap();
        assert!(matches!(sent[0], Notification::StockUpdated { quantity: 12, .. }));
        assert!(matches!(sent[1], Notification::LowStock { quantity: 5, threshold: 5, .. }));
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_update() {
        let store = MemoryStore::new();
        let catalog = Catalog::standard().unwrap();
        let scope = scope();
        let svc = StockService::new(&store, &catalog, &Failing);

        let purchase = svc
            .create_with_expense(scope, &json!({"name": "Bread", "quantity": 1}))
            .await
            .unwrap();
        let id = purchase.stock["id"].as_i64().unwrap();
        let row = svc.update_and_notify(scope, id, &json!({"quantity": 0})).await.unwrap();
        assert_eq!(row["quantity"], 0);
    }
}
