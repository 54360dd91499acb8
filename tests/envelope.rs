mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{assert_envelope, TestApp};
use serde_json::json;
use shopdesk::AppConfig;

async fn ready_app() -> TestApp {
    let app = TestApp::new();
    app.user("ana@example.com", "tok-ana");
    app.open_account("tok-ana", "retail", "Shop").await;
    app
}

#[tokio::test]
async fn health_routes_need_no_token() {
    let app = TestApp::new();
    let res = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_envelope(&res);
    assert_eq!(res.body["data"]["status"], "ok");
    let res = app.call(Method::GET, "/ready", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["database"], "ok");
    let res = app.call(Method::GET, "/version", None, None).await;
    assert_envelope(&res);
    assert_eq!(res.body["data"]["name"], "shopdesk");
}

#[tokio::test]
async fn wrong_method_is_enveloped_405() {
    let app = ready_app().await;
    for (method, uri) in [
        (Method::PUT, "/customers"),
        (Method::DELETE, "/kanban"),
        (Method::POST, "/health"),
    ] {
        let res = app.call(method, uri, Some("tok-ana"), None).await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
        assert_eq!(res.body["message"], "method not allowed");
        assert_envelope(&res);
    }
}

#[tokio::test]
async fn undecodable_path_id_is_enveloped_400() {
    let app = ready_app().await;
    let res = app.get("/customers/%FF", "tok-ana").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_envelope(&res);
}

#[tokio::test]
async fn unknown_route_is_enveloped_404() {
    let app = ready_app().await;
    let res = app.get("/nope", "tok-ana").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["success"], false);
    assert_envelope(&res);
}

#[tokio::test]
async fn malformed_json_is_enveloped_400() {
    let app = ready_app().await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/customers")
        .header(header::AUTHORIZATION, "Bearer tok-ana")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_envelope(&res);
}

#[tokio::test]
async fn validation_errors_name_each_field() {
    let app = ready_app().await;
    let res = app
        .post("/customers", "tok-ana", json!({"email": "not-an-email", "phone": "??"}))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["message"], "validation failed");
    let errors = res.body["errors"].as_object().unwrap();
    assert_eq!(errors["name"], "is required");
    assert!(errors.contains_key("email"));
    assert!(errors.contains_key("phone"));
}

#[tokio::test]
async fn amounts_beyond_column_precision_are_field_errors() {
    let app = ready_app().await;
    let res = app
        .post("/stock", "tok-ana", json!({"name": "Gold", "quantity": 1, "cost_price": 1e300}))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["errors"]["cost_price"].is_string());
    assert_envelope(&res);
    assert_eq!(app.get("/stock", "tok-ana").await.body["meta"]["count"], 0);
}

#[tokio::test]
async fn crud_round_trip_keeps_envelope() {
    let app = ready_app().await;
    let created = app
        .post("/supplies", "tok-ana", json!({"supplier_name": "Acme", "item_name": "Flour", "quantity": 40}))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_envelope(&created);
    assert_eq!(created.body["data"]["status"], "pending");
    let id = created.body["data"]["id"].as_i64().unwrap();

    let patched = app
        .call(
            Method::PATCH,
            &format!("/supplies/{}", id),
            Some("tok-ana"),
            Some(json!({"status": "received"})),
        )
        .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["data"]["status"], "received");
    assert_eq!(patched.body["data"]["item_name"], "Flour");

    let list = app.get("/supplies?limit=10&status=received", "tok-ana").await;
    assert_envelope(&list);
    assert_eq!(list.body["meta"]["count"], 1);

    let deleted = app.delete(&format!("/supplies/{}", id), "tok-ana").await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["data"], json!({}));
    assert_envelope(&deleted);

    let gone = app.get(&format!("/supplies/{}", id), "tok-ana").await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["message"], "Supply not found");
}

#[tokio::test]
async fn bad_ids_and_paging_are_bad_requests() {
    let app = ready_app().await;
    let res = app.get("/orders/abc", "tok-ana").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_envelope(&res);
    let res = app.get("/orders?limit=-5", "tok-ana").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_envelope(&res);
}

#[tokio::test]
async fn deleting_referenced_row_conflicts() {
    let app = ready_app().await;
    let customer = app.post("/customers", "tok-ana", json!({"name": "Lee"})).await;
    let customer_id = customer.body["data"]["id"].as_i64().unwrap();
    let order = app
        .post("/orders", "tok-ana", json!({"reference": "PO-1", "total": 12, "customer_id": customer_id}))
        .await;
    assert_eq!(order.status, StatusCode::CREATED, "{}", order.body);

    let res = app.delete(&format!("/customers/{}", customer_id), "tok-ana").await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_envelope(&res);
}

#[tokio::test]
async fn oversized_body_is_enveloped_413() {
    let config = AppConfig {
        body_limit_bytes: 256,
        ..AppConfig::default()
    };
    let app = TestApp::with_config(config);
    app.user("ana@example.com", "tok-ana");
    app.open_account("tok-ana", "retail", "Shop").await;
    let res = app
        .post("/customers", "tok-ana", json!({"name": "x", "notes": "y".repeat(500)}))
        .await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_envelope(&res);
}
