//! Standard response envelope helpers.
//!
//! Success: `{ "success": true, "data": ..., "message": "..." }`.
//! Error: `{ "success": false, "message": "...", "errors": { field: reason } }`.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaCount>,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

#[derive(Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<crate::error::FieldErrors>,
}

pub type Reply<T> = (StatusCode, Json<Envelope<T>>);

pub fn success_ok<T: Serialize>(data: T, message: impl Into<String>) -> Reply<T> {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            data,
            message: message.into(),
            meta: None,
        }),
    )
}

pub fn success_created<T: Serialize>(data: T, message: impl Into<String>) -> Reply<T> {
    (
        StatusCode::CREATED,
        Json(Envelope {
            success: true,
            data,
            message: message.into(),
            meta: None,
        }),
    )
}

pub fn success_many<T: Serialize>(data: Vec<T>, message: impl Into<String>) -> Reply<Vec<T>> {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            data,
            message: message.into(),
            meta: Some(MetaCount { count }),
        }),
    )
}

/// Success with an empty object payload, e.g. after a delete.
pub fn success_empty(message: impl Into<String>) -> Reply<serde_json::Value> {
    success_ok(serde_json::json!({}), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_always_has_data() {
        let (status, Json(body)) = success_empty("deleted");
        assert_eq!(status, StatusCode::OK);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["success"], true);
        assert!(v["data"].is_object());
        assert_eq!(v["message"], "deleted");
        assert!(v.get("meta").is_none());
    }

    #[test]
    fn many_counts_rows() {
        let (_, Json(body)) = success_many(vec![1, 2, 3], "listed");
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["meta"]["count"], 3);
        assert_eq!(v["data"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn created_uses_201() {
        let (status, _) = success_created(serde_json::json!({"id": 1}), "created");
        assert_eq!(status, StatusCode::CREATED);
    }
}
