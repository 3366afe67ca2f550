use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::caching;
use crate::server::dto::UserDetail;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::{EntityKind, UnitOfWork};
use crate::types::UserUpdate;
use crate::validation;

use super::access::{require_authorized, resolve_user};

pub async fn list_users(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let users = state.store.list_users().api_err("Failed to list users")?;
    Ok::<_, ApiError>(Json(ApiResponse::success(users)))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let user = resolve_user(store, &username)?;
    let repositories = store
        .list_owner_repositories(&user.meta.id)
        .api_err("Failed to list repositories")?;

    let last_modified = caching::last_modified(&user.meta.updated_at);
    let detail = UserDetail { user, repositories };

    Ok::<_, ApiError>((
        [(header::LAST_MODIFIED, last_modified)],
        Json(ApiResponse::success(detail)),
    ))
}

pub async fn update_user(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Json(req): Json<UserUpdate>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut user = resolve_user(store, &username)?;
    require_authorized(&state, &auth.0, &user.meta.id)?;

    // Availability only matters when the value actually changes. Stored
    // values are always well-formed, so a malformed request never reads as
    // taken; apply_update rejects it below.
    if let Some(new_username) = &req.username {
        if new_username != &user.username
            && !validation::is_username_available(store, new_username)
                .api_err("Failed to check username")?
        {
            return Err(ApiError::conflict("Username already taken"));
        }
    }
    if let Some(new_email) = &req.email {
        if new_email != &user.email
            && !validation::is_email_available(store, new_email).api_err("Failed to check email")?
        {
            return Err(ApiError::conflict("Email already registered"));
        }
    }

    user.apply_update(req)?;
    user.meta.touch();

    let mut work = UnitOfWork::new();
    work.update(user.clone());
    store.commit(work)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn delete_user(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let user = resolve_user(store, &username)?;
    require_authorized(&state, &auth.0, &user.meta.id)?;

    let mut work = UnitOfWork::new();
    work.delete(EntityKind::User, &user.meta.id);
    store.commit(work)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
