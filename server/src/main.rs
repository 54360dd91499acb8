//! shopdesk HTTP server: reads settings, prepares the database, serves the API.
//!
//! Run from repo root: `cargo run -p shopdesk-server`

use shopdesk::{app, ensure_database_exists, ensure_tables, AppConfig, AppState, Catalog, PgStore};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("shopdesk=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::load()?;
    let catalog = Catalog::standard()?;

    ensure_database_exists(&config.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    ensure_tables(&pool, &config.schema, &catalog).await?;

    let store = PgStore::new(pool, config.schema.clone());
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(Arc::new(store), catalog, config);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("shopdesk listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
