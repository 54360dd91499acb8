#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use shopdesk::extractors::hash_token;
use shopdesk::{app, AppConfig, AppState, Catalog, MemoryStore, User};
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), Catalog::standard().unwrap(), config);
        TestApp {
            store,
            router: app(state),
        }
    }

    /// A user with bearer token `token`.
    pub fn user(&self, email: &str, token: &str) -> User {
        let user = self.store.add_user(email, email).unwrap();
        self.store.add_token(&hash_token(token), user.id).unwrap();
        user
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&b).unwrap()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Response { status, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Response {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Response {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// Create an account through the API and select it. Returns the account id.
    pub async fn open_account(&self, token: &str, account_type: &str, name: &str) -> String {
        let created = self
            .post("/accounts", token, serde_json::json!({"account_type": account_type, "name": name}))
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
        let id = created.body["data"]["id"].as_str().unwrap().to_string();
        let selected = self
            .put(
                "/session-accounts",
                token,
                serde_json::json!({"account_type": account_type, "account_id": id}),
            )
            .await;
        assert_eq!(selected.status, StatusCode::OK, "{}", selected.body);
        id
    }
}

/// Every response carries the envelope: success + data, or failure + message.
pub fn assert_envelope(res: &Response) {
    let success = res.body["success"].as_bool().expect("success flag");
    if success {
        assert!(res.status.is_success(), "{} {}", res.status, res.body);
        assert!(res.body.get("data").is_some(), "{}", res.body);
    } else {
        assert!(!res.status.is_success(), "{} {}", res.status, res.body);
        assert!(!res.body["message"].as_str().unwrap_or_default().is_empty(), "{}", res.body);
    }
}
