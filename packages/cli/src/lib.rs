// ABOUTME: CTC projects server assembly
// ABOUTME: Wires configuration, storage, and the CSRF gate into one axum application

pub mod api;
pub mod error;


use std::sync::Arc;

use axum::Router;
use ctc_api::{with_csrf_protection, CsrfState};
use ctc_config::Config;
use ctc_security::{CsrfKeyStore, SecretKeyProvider};
use ctc_storage::{open_pool, SecretKeyStorage, SqlitePool, StorageConfig};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::{ServerError, ServerResult};

/// Build the application router on top of an open database pool.
///
/// The CSRF secret key is not touched here; it is loaded on the first request
/// that needs a token.
pub fn build_app(config: &Config, pool: SqlitePool) -> ServerResult<Router> {
    let key_store = CsrfKeyStore::new(SecretKeyStorage::new(pool));
    let provider: Arc<dyn SecretKeyProvider> = Arc::new(key_store);
    let csrf_state = CsrfState::from_settings(provider, &config.csrf)?;

    let app = api::create_router().with_state(csrf_state.clone());

    Ok(with_csrf_protection(app, csrf_state).layer(TraceLayer::new_for_http()))
}

/// Storage settings for the pool that holds the secret key table
pub fn storage_config(config: &Config) -> StorageConfig {
    StorageConfig {
        database_path: config.storage.database_path.clone(),
        max_connections: config.storage.max_connections,
        ..StorageConfig::default()
    }
}

pub async fn run_server(config: Config) -> ServerResult<()> {
    let pool = open_pool(&storage_config(&config)).await?;
    let app = build_app(&config, pool.clone())?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
