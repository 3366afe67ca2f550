use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::service::Identity;
use crate::error::Error;
use crate::server::AppState;

/// Extractor that requires a valid bearer token resolving to a live user.
pub struct RequireAuth(pub Identity);

/// Extractor that additionally requires the resolved user to be an admin.
pub struct RequireAdmin(pub Identity);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    MalformedAuth,
    TokenExpired,
    InvalidSignature,
    UnknownSubject,
    NotAdmin,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::MalformedAuth => (StatusCode::BAD_REQUEST, "Malformed authorization"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InvalidSignature => (StatusCode::FORBIDDEN, "Invalid token signature"),
            AuthError::UnknownSubject => (StatusCode::UNAUTHORIZED, "Unknown token subject"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                "Bearer realm=\"linkden\"".parse().unwrap(),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = extract_identity(parts, state)?;
        Ok(RequireAuth(identity))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = extract_identity(parts, state)?;

        if !state.auth.is_admin(&identity) {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(identity))
    }
}

fn extract_identity(parts: &mut Parts, state: &Arc<AppState>) -> Result<Identity, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(header) = header else {
        return Err(AuthError::MissingAuth);
    };

    // Mutations take bearer tokens only; any other scheme is malformed here.
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedAuth)?;

    let claims = state.auth.signer().verify(token).map_err(|e| match e {
        Error::TokenExpired => AuthError::TokenExpired,
        Error::InvalidSignature => AuthError::InvalidSignature,
        Error::MalformedAuth(_) => AuthError::MalformedAuth,
        _ => AuthError::InternalError,
    })?;

    // A signed token whose subject no longer exists is treated the same as
    // missing credentials.
    let user = state
        .store
        .get_user(&claims.sub)
        .map_err(|_| AuthError::InternalError)?
        .ok_or(AuthError::UnknownSubject)?;

    Ok(Identity { user })
}
