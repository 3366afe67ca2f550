use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::TagRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::tags;

use super::access::{require_authorized, resolve_repo};

pub async fn list_repo_tags(
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (_, repository) = resolve_repo(store, &owner, &name)?;
    let tags = store
        .list_repository_tags(&repository.meta.id)
        .api_err("Failed to list tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}

pub async fn add_repo_tag(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
    Json(req): Json<TagRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (_, repository) = resolve_repo(store, &owner, &name)?;
    require_authorized(&state, &auth.0, &repository.owner_id)?;

    let tag = tags::attach_repository_tag(store, &repository.meta.id, &req.name)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(tag))))
}

pub async fn remove_repo_tag(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((owner, name, tag)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (_, repository) = resolve_repo(store, &owner, &name)?;
    require_authorized(&state, &auth.0, &repository.owner_id)?;

    tags::detach_repository_tag(store, &repository.meta.id, &tag)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
