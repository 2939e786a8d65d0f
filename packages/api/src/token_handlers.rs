// ABOUTME: HTTP handlers for CSRF token issuance
// ABOUTME: Lets script clients fetch a token bound to a path other than the current one

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::CurrentPrincipal;
use crate::csrf::CsrfState;
use crate::error::{ApiResult, AppError};
use crate::response::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// `None` for anonymous callers
    pub token: Option<String>,
    pub path: String,
}

/// Mint a token for the current principal, bound to `?path=` (default `/`)
pub async fn get_csrf_token(
    State(state): State<CsrfState>,
    principal: CurrentPrincipal,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let path = query.path.unwrap_or_else(|| "/".to_string());
    if !path.starts_with('/') {
        return Err(AppError::validation("path must start with '/'"));
    }

    info!(path = %path, anonymous = principal.is_anonymous(), "Issuing CSRF token");

    let token = match principal.id() {
        Some(id) => state.engine().await?.mint_now(Some(id), &path),
        None => None,
    };

    Ok(Json(ApiResponse::success(TokenResponse { token, path })))
}
