//! # credo-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Credo commerce gate.
//! Binds to a configurable port (default 8080).

use credo_api::state::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let auth_token = std::env::var("AUTH_TOKEN").ok();
    if auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set — authentication disabled, using development identity");
    }
    let config = AppConfig { port, auth_token };

    // Initialize database pool (optional — absent means in-memory only).
    let db_pool = credo_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = credo_api::AppState::with_config(config, db_pool);

    if state.db_pool.is_some() {
        // Hydrate in-memory store from database.
        state.hydrate_from_db().await.map_err(|e| {
            tracing::error!("Database hydration failed: {e}");
            e
        })?;
    } else {
        // In-memory mode gets the demonstration catalog so the portal
        // has something to sell.
        state.seed_demo_catalog();
        tracing::info!("Seeded demonstration plan catalog");
    }

    let app = credo_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Credo commerce gate listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
