//! Unauthenticated routes: health, readiness, version; plus the 404 fallback.

use crate::error::AppError;
use crate::response::{success_ok, Reply};
use crate::state::AppState;
use axum::{extract::State, routing::get, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

#[derive(Serialize)]
struct VersionBody {
    name: &'static str,
    version: &'static str,
}

async fn health() -> Reply<HealthBody> {
    success_ok(HealthBody { status: "ok" }, "Service is up")
}

/// 200 when the store answers, 503 in the error envelope otherwise.
async fn ready(State(state): State<AppState>) -> Result<Reply<ReadyBody>, AppError> {
    if let Err(e) = state.store.ping().await {
        tracing::warn!(error = %e, "readiness check failed");
        return Err(AppError::Unavailable("database unavailable".into()));
    }
    Ok(success_ok(
        ReadyBody {
            status: "ok",
            database: "ok",
        },
        "Service is ready",
    ))
}

async fn version() -> Reply<VersionBody> {
    success_ok(
        VersionBody {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
        "Version retrieved",
    )
}

/// GET /health, GET /ready, GET /version.
pub fn common_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
}

pub(crate) async fn not_found() -> AppError {
    AppError::NotFound("route".into())
}
