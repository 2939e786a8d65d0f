// ABOUTME: Principal resolution for API requests
// ABOUTME: Maps the authenticated user id set by the fronting auth layer onto requests

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderName},
};

/// Resolves the authenticated principal for a request, or `None` when anonymous
pub trait PrincipalResolver: Send + Sync {
    fn resolve(&self, parts: &Parts) -> Option<String>;
}

/// Reads the principal id from a header set by an upstream authentication proxy
#[derive(Debug, Clone)]
pub struct HeaderPrincipalResolver {
    header: HeaderName,
}

impl HeaderPrincipalResolver {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

impl PrincipalResolver for HeaderPrincipalResolver {
    fn resolve(&self, parts: &Parts) -> Option<String> {
        parts
            .headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// Principal resolved by the CSRF gate for the current request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentPrincipal(pub Option<String>);

impl CurrentPrincipal {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }
}

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentPrincipal>()
            .cloned()
            .unwrap_or_default())
    }
}
