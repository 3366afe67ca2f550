use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::Duration;

use crate::auth::parse_basic_credentials;
use crate::server::AppState;
use crate::server::dto::{RegisterRequest, TokenParams, TokenResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::UnitOfWork;
use crate::types::User;
use crate::validation;

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    if !validation::is_email_valid(&req.email) {
        return Err(ApiError::validation("email", "is not a valid email address"));
    }
    if !validation::is_email_available(store, &req.email).api_err("Failed to check email")? {
        return Err(ApiError::conflict("Email already registered"));
    }
    if !validation::is_username_valid(&req.username) {
        return Err(ApiError::validation(
            "username",
            "must contain only lowercase letters, numbers, and underscores",
        ));
    }
    if !validation::is_username_available(store, &req.username)
        .api_err("Failed to check username")?
    {
        return Err(ApiError::conflict("Username already taken"));
    }

    let mut user = User::new(&req.username, &req.email, &req.password)?;
    if let Some(bio) = req.bio {
        user.bio = (!bio.is_empty()).then_some(bio);
    }

    let mut work = UnitOfWork::new();
    work.create(user.clone());
    store.commit(work)?;

    let location = format!("/api/v1/users/{}", user.username);
    Ok::<_, ApiError>((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ApiResponse::success(user)),
    ))
}

/// Exchanges Basic credentials for a signed bearer token. The optional
/// `expires_in` query parameter shortens or extends the default lifetime.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TokenParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let Some(auth_header) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return Err(ApiError::unauthorized("Authentication required").basic_challenge());
    };

    let Some((username, password)) = parse_basic_credentials(auth_header) else {
        return Err(ApiError::bad_request("Malformed authorization"));
    };

    let user = state
        .auth
        .verify_credentials(store, &username, &password)
        .api_err("Failed to verify credentials")?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials").basic_challenge())?;

    let token = match params.expires_in {
        Some(seconds) if seconds <= 0 => {
            return Err(ApiError::validation(
                "expires_in",
                "must be a positive number of seconds",
            ));
        }
        Some(seconds) => state
            .auth
            .signer()
            .issue_with_ttl(&user.meta.id, Duration::seconds(seconds))?,
        None => state.auth.signer().issue(&user.meta.id)?,
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(TokenResponse { token })))
}
