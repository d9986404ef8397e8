//! Server entrypoint: load declarations, pick a store, serve.

use crudkit::{
    api_router, apply_migrations, ensure_database_exists, load_from_path, resolve, AppState,
    MemoryStore, PgStore, Store, TokenSigner,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::EnvFilter;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crudkit=info")),
        )
        .init();

    let resources_path =
        std::env::var("RESOURCES_PATH").unwrap_or_else(|_| "resources.json".to_string());
    let configs = load_from_path(&resources_path).await?;
    let model = Arc::new(resolve(&configs)?);
    tracing::info!(resources = model.resources.len(), path = %resources_path, "model resolved");

    let store: Arc<dyn Store> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            ensure_database_exists(&url).await?;
            let pool = PgPoolOptions::new().max_connections(5).connect(&url).await?;
            apply_migrations(&pool, &model).await?;
            tracing::info!("using postgres store");
            Arc::new(PgStore::new(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, model, TokenSigner::from_env());
    let app = api_router(state).layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "sigterm handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}
