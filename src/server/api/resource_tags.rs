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
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::tags;
use crate::types::{Repository, Resource};

use super::access::require_authorized;

fn resolve_resource_by_id(
    store: &dyn Store,
    id: &str,
) -> Result<(Resource, Repository), ApiError> {
    let resource = store
        .find_resource(id)
        .api_err("Failed to get resource")?
        .or_not_found("Resource not found")?;
    let repository = store
        .get_repository(&resource.repository_id)
        .api_err("Failed to get repository")?
        .or_not_found("Repository not found")?;
    Ok((resource, repository))
}

pub async fn list_resource_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (resource, _) = resolve_resource_by_id(store, &id)?;
    let tags = store
        .list_resource_tags(&resource.meta.id)
        .api_err("Failed to list tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}

pub async fn add_resource_tag(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TagRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (resource, repository) = resolve_resource_by_id(store, &id)?;
    require_authorized(&state, &auth.0, &repository.owner_id)?;

    let tag = tags::attach_resource_tag(store, &resource.meta.id, &req.name)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(tag))))
}

pub async fn remove_resource_tag(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, tag)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (resource, repository) = resolve_resource_by_id(store, &id)?;
    require_authorized(&state, &auth.0, &repository.owner_id)?;

    tags::detach_resource_tag(store, &resource.meta.id, &tag)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
