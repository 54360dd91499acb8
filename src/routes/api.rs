//! Authenticated API routes. Each catalog entity gets `/{path}` and `/{path}/:id`;
//! the entity rides along as a request extension.

use crate::config::{EntityKind, EntityRef};
use crate::handlers::{entity, kanban, reports, session, stock};
use crate::state::AppState;
use axum::{
    routing::{get, MethodRouter},
    Extension, Router,
};

fn collection(def: &EntityRef) -> MethodRouter<AppState> {
    let router = match def.kind {
        EntityKind::Stock => get(entity::list).post(stock::create),
        _ => get(entity::list).post(entity::create),
    };
    router.layer(Extension(def.clone()))
}

fn member(def: &EntityRef) -> MethodRouter<AppState> {
    let router = match def.kind {
        EntityKind::Stock => get(entity::read)
            .put(stock::update)
            .patch(stock::update)
            .delete(entity::delete),
        _ => get(entity::read)
            .put(entity::update)
            .patch(entity::update)
            .delete(entity::delete),
    };
    router.layer(Extension(def.clone()))
}

pub fn api_routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new()
        .route("/accounts", get(session::list_accounts).post(session::create_account))
        .route(
            "/session-accounts",
            get(session::current)
                .put(session::select)
                .post(session::select)
                .delete(session::clear),
        )
        .route("/kanban", get(kanban::board).put(kanban::update))
        .route("/reports/sales", get(reports::sales));

    for def in state.catalog.entities() {
        router = router
            .route(&format!("/{}", def.path), collection(def))
            .route(&format!("/{}/:id", def.path), member(def));
    }
    router
}
