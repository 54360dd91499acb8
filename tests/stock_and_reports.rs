mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use shopdesk::{app, AppConfig, AppError, AppState, Catalog, MemoryStore, Notification, Notifier};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn stock_purchase_records_expense_against_wallet() {
    let app = TestApp::new();
    app.user("ana@example.com", "tok-ana");
    app.open_account("tok-ana", "retail", "Shop").await;
    let wallet = app.post("/wallets", "tok-ana", json!({"name": "Till"})).await;
    let wallet_id = wallet.body["data"]["id"].as_i64().unwrap();

    let res = app
        .post(
            "/stock",
            "tok-ana",
            json!({"name": "Coffee beans", "quantity": 4, "cost_price": 12.5, "selling_price": 20, "wallet_id": wallet_id}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["message"], "Stock created and purchase expense recorded");
    assert_eq!(res.body["data"]["name"], "Coffee beans");

    let txs = app.get("/transactions?kind=expense", "tok-ana").await;
    let tx = &txs.body["data"][0];
    assert_eq!(tx["amount"], 50.0);
    assert_eq!(tx["wallet_id"], wallet_id);
    assert_eq!(tx["description"], "Stock purchase: Coffee beans");
}

#[tokio::test]
async fn sales_report_sums_account_sales() {
    let app = TestApp::new();
    app.user("ana@example.com", "tok-ana");
    app.open_account("tok-ana", "retail", "Shop").await;
    let stock = app.post("/stock", "tok-ana", json!({"name": "Soap", "quantity": 50})).await;
    let stock_id = stock.body["data"]["id"].as_i64().unwrap();
    let customer = app.post("/customers", "tok-ana", json!({"name": "Mo"})).await;
    let customer_id = customer.body["data"]["id"].as_i64().unwrap();

    for body in [
        json!({"stock_id": stock_id, "quantity": 2, "unit_price": 3.0, "amount_paid": 6.0}),
        json!({"stock_id": stock_id, "customer_id": customer_id, "quantity": 4, "unit_price": 2.5, "is_credit": true, "amount_paid": 4.0}),
    ] {
        let res = app.post("/sales", "tok-ana", body).await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    }

    let all = app.get("/reports/sales", "tok-ana").await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["data"]["sales_count"], 2);
    assert_eq!(all.body["data"]["units_sold"], 6);
    assert_eq!(all.body["data"]["gross_total"], 16.0);
    assert_eq!(all.body["data"]["credit_outstanding"], 6.0);

    let one = app.get(&format!("/reports/sales?customer_id={}", customer_id), "tok-ana").await;
    assert_eq!(one.body["data"]["sales_count"], 1);
    assert_eq!(one.body["data"]["amount_paid"], 4.0);

    let bad = app.get("/reports/sales?customer_id=x", "tok-ana").await;
    assert_eq!(bad.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[derive(Default)]
struct Recorder(Mutex<Vec<Notification>>);

#[async_trait]
impl Notifier for Recorder {
    async fn notify(&self, n: &Notification) -> Result<(), AppError> {
        self.0.lock().unwrap().push(n.clone());
        Ok(())
    }
}

#[tokio::test]
async fn stock_update_notifies_low_stock() {
    let store = Arc::new(MemoryStore::new());
    let recorder = Arc::new(Recorder::default());
    let state = AppState::new(store.clone(), Catalog::standard().unwrap(), AppConfig::default())
        .with_notifier(recorder.clone());
    let app = common::TestApp {
        store,
        router: app(state),
    };
    app.user("ana@example.com", "tok-ana");
    app.open_account("tok-ana", "retail", "Shop").await;
    let stock = app
        .post("/stock", "tok-ana", json!({"name": "Eggs", "quantity": 30, "low_stock_threshold": 6}))
        .await;
    let id = stock.body["data"]["id"].as_i64().unwrap();

    let res = app.put(&format!("/stock/{}", id), "tok-ana", json!({"quantity": 4})).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["quantity"], 4);

    let sent = recorder.0.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(matches!(sent[0], Notification::LowStock { quantity: 4, threshold: 6, .. }));
}
