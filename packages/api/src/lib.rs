// ABOUTME: HTTP API layer for CTC projects
// ABOUTME: CSRF request gate, principal resolution, and the token endpoint

use axum::{middleware, routing::get, Router};

pub mod auth;
pub mod csrf;
pub mod error;
pub mod response;
pub mod token_handlers;

pub use auth::{CurrentPrincipal, HeaderPrincipalResolver, PrincipalResolver};
pub use csrf::{csrf_middleware, CsrfState, CsrfToken};
pub use error::{ApiResult, AppError, CSRF_REJECTION_MESSAGE};

/// Creates the CSRF token router
pub fn create_csrf_router() -> Router<CsrfState> {
    Router::new().route("/csrf-token", get(token_handlers::get_csrf_token))
}

/// Wrap every route of `router` in the CSRF gate
pub fn with_csrf_protection<S>(router: Router<S>, state: CsrfState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(state, csrf_middleware))
}
