//! Request authentication for the HTTP API.
//!
//! The `Authed` extractor resolves the `Authorization: Bearer` header into
//! the signed token's user id and role. Handlers that need a role beyond
//! "any authenticated user" check the [`Role`] enum exhaustively.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use axum::Json;

use vitalink_core::auth::{verify_token, AuthUser, Role};

use crate::http::HttpState;

/// Authenticated caller, extracted from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Authed(pub AuthUser);

fn unauthorized(msg: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": msg, "status": "error" })),
    )
}

#[async_trait]
impl FromRequestParts<Arc<HttpState>> for Authed {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<HttpState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("No token, authorization denied"))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Token is not valid"))?;

        let user = verify_token(&state.config.auth.secret(), token)
            .map_err(|_| unauthorized("Token is not valid"))?;

        Ok(Authed(user))
    }
}

/// Role gate for clinician-only routes.
pub fn require_clinician(user: &AuthUser) -> Result<(), (StatusCode, serde_json::Value)> {
    match user.role {
        Role::Clinician => Ok(()),
        Role::Patient => Err((
            StatusCode::FORBIDDEN,
            serde_json::json!({
                "error": "Forbidden: access is denied for this role",
                "status": "error",
            }),
        )),
    }
}
