//! Extract the caller's role from the request (`X-Role` header).

use crate::service::Context;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header name for the caller's role.
pub const ROLE_HEADER: &str = "X-Role";

/// Extractor for an optional role from the `X-Role` header.
#[derive(Clone, Debug, Default)]
pub struct RoleHeader(pub Option<String>);

impl RoleHeader {
    pub fn into_context(self) -> Context {
        match self.0 {
            Some(role) => Context::with_role(role),
            None => Context::anonymous(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RoleHeader
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(RoleHeader(value))
    }
}
