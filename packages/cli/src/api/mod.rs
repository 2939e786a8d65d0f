// ABOUTME: Route table for the server
// ABOUTME: Mounts health checks and the CSRF token endpoint under /api

use axum::{routing::get, Router};
use ctc_api::{create_csrf_router, CsrfState};

pub mod health;

pub fn create_router() -> Router<CsrfState> {
    let api = Router::new()
        .route("/health", get(health::health_check))
        .merge(create_csrf_router());

    Router::new().nest("/api", api)
}
