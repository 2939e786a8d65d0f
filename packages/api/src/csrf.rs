// ABOUTME: CSRF request gate for every route
// ABOUTME: Mints tokens on safe methods and rejects mutating requests without a valid one

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header::CONTENT_TYPE, request::Parts, HeaderName},
    middleware::Next,
    response::Response,
};
use ctc_config::{CsrfSettings, DEFAULT_MAX_FORM_BYTES};
use ctc_core::{CSRF_TOKEN_HEADER, CSRF_TOKEN_PARAM};
use ctc_security::{CsrfTokenEngine, SecretKeyProvider, DEFAULT_TOKEN_VALIDITY};
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::auth::{CurrentPrincipal, HeaderPrincipalResolver, PrincipalResolver};
use crate::error::AppError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Shared state for the CSRF gate.
///
/// The token engine is built on first use, which is the first time the secret
/// key is read from (or written to) storage.
#[derive(Clone)]
pub struct CsrfState {
    provider: Option<Arc<dyn SecretKeyProvider>>,
    engine: Arc<OnceCell<Arc<CsrfTokenEngine>>>,
    validity: Duration,
    resolver: Arc<dyn PrincipalResolver>,
    max_form_bytes: usize,
}

impl CsrfState {
    pub fn new(
        provider: Arc<dyn SecretKeyProvider>,
        resolver: Arc<dyn PrincipalResolver>,
    ) -> Self {
        Self {
            provider: Some(provider),
            engine: Arc::new(OnceCell::new()),
            validity: DEFAULT_TOKEN_VALIDITY,
            resolver,
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
        }
    }

    /// Build the gate state from runtime settings, resolving principals from
    /// the configured header
    pub fn from_settings(
        provider: Arc<dyn SecretKeyProvider>,
        settings: &CsrfSettings,
    ) -> Result<Self, AppError> {
        let header = HeaderName::try_from(settings.principal_header.as_str()).map_err(|e| {
            AppError::config(format!(
                "invalid principal header '{}': {}",
                settings.principal_header, e
            ))
        })?;

        Ok(Self::new(provider, Arc::new(HeaderPrincipalResolver::new(header)))
            .with_validity(settings.token_ttl)
            .with_max_form_bytes(settings.max_form_bytes))
    }

    /// Use an already constructed engine instead of loading a key from storage
    pub fn with_engine(engine: CsrfTokenEngine, resolver: Arc<dyn PrincipalResolver>) -> Self {
        let validity = engine.validity();
        Self {
            provider: None,
            engine: Arc::new(OnceCell::new_with(Some(Arc::new(engine)))),
            validity,
            resolver,
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
        }
    }

    /// Set the token validity window.
    ///
    /// Also applies to an engine passed to [`CsrfState::with_engine`].
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        if let Some(engine) = self.engine.get() {
            let engine = CsrfTokenEngine::clone(engine).with_validity(validity);
            self.engine = Arc::new(OnceCell::new_with(Some(Arc::new(engine))));
        }
        self
    }

    pub fn with_max_form_bytes(mut self, max_form_bytes: usize) -> Self {
        self.max_form_bytes = max_form_bytes;
        self
    }

    /// The token engine, loading the secret key on first call
    pub async fn engine(&self) -> Result<Arc<CsrfTokenEngine>, AppError> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                let provider = self
                    .provider
                    .as_ref()
                    .ok_or_else(|| AppError::config("no CSRF secret key provider configured"))?;
                let secret = provider.secret_key().await?;
                debug!(
                    validity_secs = self.validity.as_secs(),
                    "CSRF token engine initialized"
                );
                Ok::<_, AppError>(Arc::new(
                    CsrfTokenEngine::new(&secret).with_validity(self.validity),
                ))
            })
            .await?;

        Ok(Arc::clone(engine))
    }

    pub fn resolve_principal(&self, parts: &Parts) -> Option<String> {
        self.resolver.resolve(parts)
    }
}

/// Token minted for the current principal and path, for embedding in forms.
///
/// `None` for anonymous requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrfToken(pub Option<String>);

impl CsrfToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CsrfToken>().cloned().unwrap_or_default())
    }
}

/// CSRF gate middleware.
///
/// Safe methods get a fresh token in the request extensions. Every other
/// method must carry a valid token or the handler never runs.
pub async fn csrf_middleware(
    State(state): State<CsrfState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();
    let method = parts.method.clone();
    let principal = state.resolve_principal(&parts);
    parts.extensions.insert(CurrentPrincipal(principal.clone()));

    if method.is_safe() {
        let token = match principal.as_deref() {
            Some(id) => state.engine().await?.mint_now(Some(id), &path),
            None => None,
        };
        debug!(
            path = %path,
            method = %method,
            issued = token.is_some(),
            "CSRF token issued"
        );
        parts.extensions.insert(CsrfToken(token));
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    let Some(principal) = principal else {
        warn!(
            path = %path,
            method = %method,
            audit = true,
            "CSRF token validation failed: anonymous request"
        );
        return Err(AppError::CsrfRejected);
    };

    let (submitted, body) = submitted_token(&parts, body, state.max_form_bytes).await;
    let engine = state.engine().await?;

    if !engine.is_valid_now(submitted.as_deref(), Some(principal.as_str()), &path) {
        warn!(
            path = %path,
            method = %method,
            token_present = submitted.is_some(),
            audit = true,
            "CSRF token validation failed"
        );
        return Err(AppError::CsrfRejected);
    }

    debug!(path = %path, method = %method, "CSRF token validated successfully");

    // Handlers that re-render a form need a token for the next submission
    parts.extensions.insert(CsrfToken(engine.mint_now(Some(principal.as_str()), &path)));
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Locate the submitted token: header, then query string, then form body.
///
/// Returns the body to hand on to the handler, rebuilt when it was buffered.
async fn submitted_token(parts: &Parts, body: Body, limit: usize) -> (Option<String>, Body) {
    let from_header = parts
        .headers
        .get(CSRF_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|token| !token.is_empty())
        .map(str::to_string);
    if from_header.is_some() {
        return (from_header, body);
    }

    if let Some(token) = parts.uri.query().and_then(|query| form_field(query.as_bytes())) {
        return (Some(token), body);
    }

    if !is_form_request(parts) {
        return (None, body);
    }

    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => (form_field(&bytes), Body::from(bytes)),
        Err(e) => {
            debug!(error = %e, limit, "Could not buffer form body for CSRF token");
            (None, Body::empty())
        }
    }
}

fn form_field(input: &[u8]) -> Option<String> {
    form_urlencoded::parse(input)
        .find(|(name, _)| name == CSRF_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

fn is_form_request(parts: &Parts) -> bool {
    parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
        .unwrap_or(false)
}
